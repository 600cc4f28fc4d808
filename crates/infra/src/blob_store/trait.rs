use std::path::PathBuf;
use std::sync::Arc;

use rowmark_core::{BlobClass, JobId};
use thiserror::Error;

/// Blob store error.
#[derive(Debug, Error)]
pub enum BlobStoreError {
    /// No blob of this class exists for the job.
    #[error("{class} blob not found for job {id}")]
    NotFound { class: BlobClass, id: JobId },

    /// The backing filesystem failed.
    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Any other backing-store failure.
    #[error("storage error: {0}")]
    Storage(String),
}

impl BlobStoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, BlobStoreError::NotFound { .. })
    }
}

/// Whole-blob storage keyed by (class, job id).
///
/// Writes are all-or-nothing from a reader's point of view: a concurrent
/// `load` sees either the previous state (usually "not found") or the full
/// new blob, never a truncated one.
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `(class, id)`, replacing any previous blob.
    fn save(&self, class: BlobClass, id: JobId, bytes: &[u8]) -> Result<(), BlobStoreError>;

    /// Load the full blob stored under `(class, id)`.
    fn load(&self, class: BlobClass, id: JobId) -> Result<Vec<u8>, BlobStoreError>;

    fn exists(&self, class: BlobClass, id: JobId) -> Result<bool, BlobStoreError>;

    /// Delete the blob under `(class, id)`. Removing a missing blob is not an
    /// error.
    fn remove(&self, class: BlobClass, id: JobId) -> Result<(), BlobStoreError>;

    fn save_raw(&self, id: JobId, bytes: &[u8]) -> Result<(), BlobStoreError> {
        self.save(BlobClass::Raw, id, bytes)
    }

    fn save_processed(&self, id: JobId, bytes: &[u8]) -> Result<(), BlobStoreError> {
        self.save(BlobClass::Processed, id, bytes)
    }

    fn load_raw(&self, id: JobId) -> Result<Vec<u8>, BlobStoreError> {
        self.load(BlobClass::Raw, id)
    }

    fn load_processed(&self, id: JobId) -> Result<Vec<u8>, BlobStoreError> {
        self.load(BlobClass::Processed, id)
    }
}

impl<T: BlobStore + ?Sized> BlobStore for Arc<T> {
    fn save(&self, class: BlobClass, id: JobId, bytes: &[u8]) -> Result<(), BlobStoreError> {
        (**self).save(class, id, bytes)
    }

    fn load(&self, class: BlobClass, id: JobId) -> Result<Vec<u8>, BlobStoreError> {
        (**self).load(class, id)
    }

    fn exists(&self, class: BlobClass, id: JobId) -> Result<bool, BlobStoreError> {
        (**self).exists(class, id)
    }

    fn remove(&self, class: BlobClass, id: JobId) -> Result<(), BlobStoreError> {
        (**self).remove(class, id)
    }
}
