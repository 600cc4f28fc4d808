use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use rowmark_core::{BlobClass, JobId};

use super::r#trait::{BlobStore, BlobStoreError};

/// In-memory blob store.
///
/// Intended for tests/dev. Contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<(BlobClass, JobId), Arc<[u8]>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Number of stored blobs across both classes.
    pub fn len(&self) -> usize {
        self.blobs.read().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlobStore for InMemoryBlobStore {
    fn save(&self, class: BlobClass, id: JobId, bytes: &[u8]) -> Result<(), BlobStoreError> {
        let mut blobs = self
            .blobs
            .write()
            .map_err(|_| BlobStoreError::Storage("lock poisoned".to_string()))?;
        blobs.insert((class, id), Arc::from(bytes));
        Ok(())
    }

    fn load(&self, class: BlobClass, id: JobId) -> Result<Vec<u8>, BlobStoreError> {
        let blobs = self
            .blobs
            .read()
            .map_err(|_| BlobStoreError::Storage("lock poisoned".to_string()))?;
        blobs
            .get(&(class, id))
            .map(|b| b.to_vec())
            .ok_or(BlobStoreError::NotFound { class, id })
    }

    fn exists(&self, class: BlobClass, id: JobId) -> Result<bool, BlobStoreError> {
        let blobs = self
            .blobs
            .read()
            .map_err(|_| BlobStoreError::Storage("lock poisoned".to_string()))?;
        Ok(blobs.contains_key(&(class, id)))
    }

    fn remove(&self, class: BlobClass, id: JobId) -> Result<(), BlobStoreError> {
        let mut blobs = self
            .blobs
            .write()
            .map_err(|_| BlobStoreError::Storage("lock poisoned".to_string()))?;
        blobs.remove(&(class, id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_and_load_per_class() {
        let store = InMemoryBlobStore::new();
        let id = JobId::new();

        store.save_raw(id, b"in").unwrap();
        assert!(store.exists(BlobClass::Raw, id).unwrap());
        assert!(!store.exists(BlobClass::Processed, id).unwrap());

        store.save_processed(id, b"out").unwrap();
        assert_eq!(store.load_raw(id).unwrap(), b"in");
        assert_eq!(store.load_processed(id).unwrap(), b"out");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn unknown_job_is_not_found() {
        let store = InMemoryBlobStore::new();
        let err = store.load_raw(JobId::new()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn remove_is_idempotent() {
        let store = InMemoryBlobStore::new();
        let id = JobId::new();
        store.save_processed(id, b"out").unwrap();

        store.remove(BlobClass::Processed, id).unwrap();
        store.remove(BlobClass::Processed, id).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn usable_through_arc_dyn() {
        let store: Arc<dyn BlobStore> = InMemoryBlobStore::arc();
        let id = JobId::new();
        store.save_raw(id, b"shared").unwrap();
        assert_eq!(store.load_raw(id).unwrap(), b"shared");
    }
}
