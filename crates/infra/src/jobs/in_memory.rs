//! In-memory queue back-ends (tests/dev).

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};

use rowmark_core::{JobId, JobState};

use super::queue::{JobQueue, PendingQueue, QueueError, StateRegister};

/// Job queue wired to in-memory back-ends.
pub type InMemoryJobQueue = JobQueue<Arc<InMemoryPendingQueue>, Arc<InMemoryStateRegister>>;

impl InMemoryJobQueue {
    pub fn in_memory() -> Self {
        JobQueue::new(
            Arc::new(InMemoryPendingQueue::new()),
            Arc::new(InMemoryStateRegister::new()),
        )
    }
}

#[derive(Debug, Default)]
pub struct InMemoryPendingQueue {
    items: Mutex<VecDeque<JobId>>,
}

impl InMemoryPendingQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PendingQueue for InMemoryPendingQueue {
    fn push(&self, id: JobId) -> Result<(), QueueError> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| QueueError::Storage("lock poisoned".to_string()))?;
        items.push_front(id);
        Ok(())
    }

    fn pop(&self) -> Result<Option<JobId>, QueueError> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| QueueError::Storage("lock poisoned".to_string()))?;
        Ok(items.pop_back())
    }

    fn len(&self) -> Result<usize, QueueError> {
        let items = self
            .items
            .lock()
            .map_err(|_| QueueError::Storage("lock poisoned".to_string()))?;
        Ok(items.len())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStateRegister {
    states: RwLock<HashMap<JobId, JobState>>,
}

impl InMemoryStateRegister {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateRegister for InMemoryStateRegister {
    fn set(&self, id: JobId, state: JobState) -> Result<(), QueueError> {
        let mut states = self
            .states
            .write()
            .map_err(|_| QueueError::Storage("lock poisoned".to_string()))?;
        states.insert(id, state);
        Ok(())
    }

    fn get(&self, id: JobId) -> Result<Option<JobState>, QueueError> {
        let states = self
            .states
            .read()
            .map_err(|_| QueueError::Storage("lock poisoned".to_string()))?;
        Ok(states.get(&id).copied())
    }
}
