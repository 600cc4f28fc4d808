//! Filesystem-backed blob store.
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/upload/<job-id>.input      raw blobs
//! <root>/processed/<job-id>.output  processed blobs
//! ```

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use rowmark_core::{BlobClass, JobId};
use tracing::debug;

use super::r#trait::{BlobStore, BlobStoreError};

#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Open a store rooted at `root`, creating the per-class directories if
    /// they are missing. Safe to call repeatedly on the same root.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, BlobStoreError> {
        let root = root.into();
        for class in [BlobClass::Raw, BlobClass::Processed] {
            let dir = root.join(class.namespace());
            fs::create_dir_all(&dir).map_err(|source| BlobStoreError::Io { path: dir, source })?;
        }
        debug!(root = %root.display(), "blob store ready");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, class: BlobClass, id: JobId) -> PathBuf {
        self.root
            .join(class.namespace())
            .join(format!("{id}.{}", class.extension()))
    }
}

impl BlobStore for FsBlobStore {
    fn save(&self, class: BlobClass, id: JobId, bytes: &[u8]) -> Result<(), BlobStoreError> {
        let path = self.path_for(class, id);
        let tmp_path = path.with_extension(format!("{}.tmp", class.extension()));

        // Write the sibling first, then swap it in: readers only ever see the
        // final name once the bytes are complete.
        let mut file = File::create(&tmp_path).map_err(io_err(&tmp_path))?;
        file.write_all(bytes).map_err(io_err(&tmp_path))?;
        file.sync_all().map_err(io_err(&tmp_path))?;
        drop(file);

        if let Err(source) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(BlobStoreError::Io { path, source });
        }
        Ok(())
    }

    fn load(&self, class: BlobClass, id: JobId) -> Result<Vec<u8>, BlobStoreError> {
        let path = self.path_for(class, id);
        fs::read(&path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => BlobStoreError::NotFound { class, id },
            _ => BlobStoreError::Io { path, source },
        })
    }

    fn exists(&self, class: BlobClass, id: JobId) -> Result<bool, BlobStoreError> {
        let path = self.path_for(class, id);
        path.try_exists()
            .map_err(|source| BlobStoreError::Io { path, source })
    }

    fn remove(&self, class: BlobClass, id: JobId) -> Result<(), BlobStoreError> {
        let path = self.path_for(class, id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(source) if source.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(BlobStoreError::Io { path, source }),
        }
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> BlobStoreError {
    let path = path.to_path_buf();
    move |source| BlobStoreError::Io { path, source }
}
