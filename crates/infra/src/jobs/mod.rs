//! Asynchronous job pipeline: pending queue, state register, worker loop.
//!
//! ## Design
//!
//! - The queue is two independent structures keyed by [`JobId`]: a FIFO of
//!   pending identifiers ([`PendingQueue`]) and a per-job state register
//!   ([`StateRegister`]). Readers inspect state without touching the FIFO.
//! - [`JobQueue`] composes both and owns the one ordering rule that spans
//!   them: state is written before the identifier becomes poppable.
//! - [`JobWorker`] is the single consumer: it pops, loads the raw blob, runs
//!   the row transformer, stores the result and records a terminal state.
//!   Failures are terminal for that job and never stop the loop.
//!
//! [`JobId`]: rowmark_core::JobId

pub mod in_memory;
pub mod queue;
#[cfg(feature = "redis")]
pub mod redis;
pub mod worker;

pub use in_memory::{InMemoryJobQueue, InMemoryPendingQueue, InMemoryStateRegister};
pub use queue::{JobQueue, PendingQueue, QueueError, StateRegister};
#[cfg(feature = "redis")]
pub use redis::{RedisPendingQueue, RedisStateRegister};
pub use worker::{
    FailureStage, JobOutcome, JobWorker, JobWorkerConfig, JobWorkerHandle, WorkerStats,
};
