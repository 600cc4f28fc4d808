//! Queue abstractions and the `JobQueue` facade.

use std::sync::Arc;

use rowmark_core::{DomainError, JobId, JobState};
use tracing::{debug, warn};

/// Queue / state register error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum QueueError {
    /// No state register exists for the job (never enqueued, or the backing
    /// store was reset).
    #[error("job not found: {0}")]
    NotFound(JobId),

    /// The backing store failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// A value read back from the store could not be decoded.
    #[error("corrupt entry: {0}")]
    Corrupt(String),
}

impl From<DomainError> for QueueError {
    fn from(err: DomainError) -> Self {
        QueueError::Corrupt(err.to_string())
    }
}

/// FIFO of pending job identifiers.
///
/// `push` inserts at the head and `pop` removes from the tail, so a single
/// producer sees strict FIFO order. `pop` is destructive: an identifier is
/// handed out at most once.
pub trait PendingQueue: Send + Sync {
    fn push(&self, id: JobId) -> Result<(), QueueError>;

    /// Remove and return the oldest identifier, or `None` when empty.
    /// Never blocks waiting for work.
    fn pop(&self) -> Result<Option<JobId>, QueueError>;

    fn len(&self) -> Result<usize, QueueError>;
}

/// Per-job mutable state register.
pub trait StateRegister: Send + Sync {
    /// Overwrite the state for `id`. Idempotent.
    fn set(&self, id: JobId, state: JobState) -> Result<(), QueueError>;

    /// Current state, or `None` if no register exists.
    fn get(&self, id: JobId) -> Result<Option<JobState>, QueueError>;
}

impl<T: PendingQueue + ?Sized> PendingQueue for Arc<T> {
    fn push(&self, id: JobId) -> Result<(), QueueError> {
        (**self).push(id)
    }

    fn pop(&self) -> Result<Option<JobId>, QueueError> {
        (**self).pop()
    }

    fn len(&self) -> Result<usize, QueueError> {
        (**self).len()
    }
}

impl<T: StateRegister + ?Sized> StateRegister for Arc<T> {
    fn set(&self, id: JobId, state: JobState) -> Result<(), QueueError> {
        (**self).set(id, state)
    }

    fn get(&self, id: JobId) -> Result<Option<JobState>, QueueError> {
        (**self).get(id)
    }
}

/// The job queue seen by the API and the worker.
///
/// Cloning is cheap when `P` and `S` are `Arc`s; clones share the same
/// underlying structures.
#[derive(Debug, Clone)]
pub struct JobQueue<P, S> {
    pending: P,
    states: S,
}

impl<P: PendingQueue, S: StateRegister> JobQueue<P, S> {
    pub fn new(pending: P, states: S) -> Self {
        Self { pending, states }
    }

    /// Mark `id` as `processing`, then make it visible to consumers.
    ///
    /// The state write must land first: a consumer may pop the identifier the
    /// instant it is pushed. If the push fails the job is marked `failed` so
    /// it does not sit in `processing` forever.
    pub fn enqueue(&self, id: JobId) -> Result<(), QueueError> {
        self.states.set(id, JobState::Processing)?;

        if let Err(err) = self.pending.push(id) {
            warn!(job_id = %id, error = %err, "push failed after state write; marking job failed");
            if let Err(mark_err) = self.states.set(id, JobState::Failed) {
                warn!(job_id = %id, error = %mark_err, "could not mark unqueued job failed");
            }
            return Err(err);
        }

        debug!(job_id = %id, "job enqueued");
        Ok(())
    }

    pub fn dequeue(&self) -> Result<Option<JobId>, QueueError> {
        self.pending.pop()
    }

    pub fn set_state(&self, id: JobId, state: JobState) -> Result<(), QueueError> {
        self.states.set(id, state)
    }

    /// State of `id`; [`QueueError::NotFound`] when there is no register,
    /// which callers must keep distinct from `processing`.
    pub fn get_state(&self, id: JobId) -> Result<JobState, QueueError> {
        self.states.get(id)?.ok_or(QueueError::NotFound(id))
    }

    pub fn pending_len(&self) -> Result<usize, QueueError> {
        self.pending.len()
    }
}
