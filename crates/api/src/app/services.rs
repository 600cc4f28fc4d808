use std::sync::Arc;

use anyhow::Context;
use rowmark_annotate::EmailFlagTransformer;
use rowmark_infra::blob_store::{BlobStore, FsBlobStore, InMemoryBlobStore};
use rowmark_infra::jobs::{
    InMemoryPendingQueue, InMemoryStateRegister, JobQueue, JobWorker, JobWorkerConfig,
    JobWorkerHandle, PendingQueue, StateRegister,
};

use crate::config::{ApiConfig, QueueBackend};

#[cfg(feature = "redis")]
use rowmark_infra::jobs::{redis::open_client, RedisPendingQueue, RedisStateRegister};

/// Job queue with the back-end chosen at startup.
pub type DynJobQueue = JobQueue<Arc<dyn PendingQueue>, Arc<dyn StateRegister>>;

/// Shared handles used by the HTTP handlers and the worker.
#[derive(Clone)]
pub struct AppServices {
    pub blobs: Arc<dyn BlobStore>,
    pub queue: DynJobQueue,
}

impl AppServices {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        pending: Arc<dyn PendingQueue>,
        states: Arc<dyn StateRegister>,
    ) -> Self {
        Self {
            blobs,
            queue: JobQueue::new(pending, states),
        }
    }

    /// Everything in memory (dev/test).
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryBlobStore::new()),
            Arc::new(InMemoryPendingQueue::new()),
            Arc::new(InMemoryStateRegister::new()),
        )
    }

    /// Start the worker loop against these stores on its own thread.
    pub fn spawn_worker(&self, config: JobWorkerConfig) -> std::io::Result<JobWorkerHandle> {
        JobWorker::new(self.blobs.clone(), self.queue.clone(), EmailFlagTransformer).spawn(config)
    }
}

/// Wire the filesystem blob store and the configured queue back-end.
pub fn build_services(config: &ApiConfig) -> anyhow::Result<AppServices> {
    let blobs = FsBlobStore::open(&config.data_dir)
        .with_context(|| format!("failed to open blob store at {}", config.data_dir.display()))?;
    let blobs: Arc<dyn BlobStore> = Arc::new(blobs);

    match config.queue_backend {
        QueueBackend::Memory => Ok(with_in_memory_queue(blobs)),
        QueueBackend::Redis => build_redis_queue(blobs, config),
    }
}

fn with_in_memory_queue(blobs: Arc<dyn BlobStore>) -> AppServices {
    AppServices::new(
        blobs,
        Arc::new(InMemoryPendingQueue::new()),
        Arc::new(InMemoryStateRegister::new()),
    )
}

#[cfg(feature = "redis")]
fn build_redis_queue(blobs: Arc<dyn BlobStore>, config: &ApiConfig) -> anyhow::Result<AppServices> {
    let client = open_client(&config.redis_url)
        .with_context(|| format!("failed to open redis client for {}", config.redis_url))?;
    tracing::info!(queue_key = %config.queue_key, "using redis job queue");

    Ok(AppServices::new(
        blobs,
        Arc::new(RedisPendingQueue::new(client.clone(), Some(config.queue_key.clone()))),
        Arc::new(RedisStateRegister::new(client)),
    ))
}

#[cfg(not(feature = "redis"))]
fn build_redis_queue(blobs: Arc<dyn BlobStore>, _config: &ApiConfig) -> anyhow::Result<AppServices> {
    tracing::warn!("QUEUE_BACKEND=redis but redis feature not enabled, falling back to in-memory");
    Ok(with_in_memory_queue(blobs))
}
