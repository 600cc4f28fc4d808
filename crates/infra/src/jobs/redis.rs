//! Redis-backed queue back-ends.
//!
//! - **Pending list**: `LPUSH <key> <id>` to enqueue, `RPOP <key>` to dequeue.
//!   `RPOP` is atomic on the server, so any number of consumers can share one
//!   list without receiving the same identifier twice.
//! - **State register**: one string key per job, `<id>:state`, holding
//!   `processing` / `done` / `failed`. No TTL.

use std::sync::Arc;

use rowmark_core::{JobId, JobState};
use tracing::instrument;

use super::queue::{PendingQueue, QueueError, StateRegister};

/// Default list key for pending job identifiers.
pub const DEFAULT_QUEUE_KEY: &str = "jobs";

fn connection(client: &redis::Client) -> Result<redis::Connection, QueueError> {
    client
        .get_connection()
        .map_err(|e| QueueError::Storage(format!("redis connection error: {e}")))
}

/// Open a client for `redis_url`. Does not connect until first use.
pub fn open_client(redis_url: impl AsRef<str>) -> Result<Arc<redis::Client>, QueueError> {
    redis::Client::open(redis_url.as_ref())
        .map(Arc::new)
        .map_err(|e| QueueError::Storage(format!("invalid redis url: {e}")))
}

#[derive(Debug, Clone)]
pub struct RedisPendingQueue {
    client: Arc<redis::Client>,
    key: String,
}

impl RedisPendingQueue {
    /// Create a pending queue on `key` (default: [`DEFAULT_QUEUE_KEY`]).
    pub fn new(client: Arc<redis::Client>, key: Option<String>) -> Self {
        Self {
            client,
            key: key.unwrap_or_else(|| DEFAULT_QUEUE_KEY.to_string()),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl PendingQueue for RedisPendingQueue {
    #[instrument(skip(self), fields(key = %self.key), err)]
    fn push(&self, id: JobId) -> Result<(), QueueError> {
        let mut conn = connection(&self.client)?;
        let _: i64 = redis::cmd("LPUSH")
            .arg(&self.key)
            .arg(id.to_string())
            .query(&mut conn)
            .map_err(|e| QueueError::Storage(format!("LPUSH failed: {e}")))?;
        Ok(())
    }

    fn pop(&self) -> Result<Option<JobId>, QueueError> {
        let mut conn = connection(&self.client)?;
        let raw: Option<String> = redis::cmd("RPOP")
            .arg(&self.key)
            .query(&mut conn)
            .map_err(|e| QueueError::Storage(format!("RPOP failed: {e}")))?;
        raw.map(|s| s.parse::<JobId>())
            .transpose()
            .map_err(QueueError::from)
    }

    fn len(&self) -> Result<usize, QueueError> {
        let mut conn = connection(&self.client)?;
        redis::cmd("LLEN")
            .arg(&self.key)
            .query(&mut conn)
            .map_err(|e| QueueError::Storage(format!("LLEN failed: {e}")))
    }
}

#[derive(Debug, Clone)]
pub struct RedisStateRegister {
    client: Arc<redis::Client>,
}

impl RedisStateRegister {
    pub fn new(client: Arc<redis::Client>) -> Self {
        Self { client }
    }

    pub fn state_key(id: JobId) -> String {
        format!("{id}:state")
    }
}

impl StateRegister for RedisStateRegister {
    #[instrument(skip(self), err)]
    fn set(&self, id: JobId, state: JobState) -> Result<(), QueueError> {
        let mut conn = connection(&self.client)?;
        let _: () = redis::cmd("SET")
            .arg(Self::state_key(id))
            .arg(state.as_str())
            .query(&mut conn)
            .map_err(|e| QueueError::Storage(format!("SET failed: {e}")))?;
        Ok(())
    }

    fn get(&self, id: JobId) -> Result<Option<JobState>, QueueError> {
        let mut conn = connection(&self.client)?;
        let raw: Option<String> = redis::cmd("GET")
            .arg(Self::state_key(id))
            .query(&mut conn)
            .map_err(|e| QueueError::Storage(format!("GET failed: {e}")))?;
        raw.map(|s| s.parse::<JobState>())
            .transpose()
            .map_err(QueueError::from)
    }
}
