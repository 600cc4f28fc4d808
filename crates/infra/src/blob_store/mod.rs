//! Key-addressed blob storage shared by the API and the worker.
//!
//! Two blob classes live side by side per job (see [`BlobClass`]); each class
//! has its own namespace, so a raw and a processed blob for the same job never
//! collide.
//!
//! [`BlobClass`]: rowmark_core::BlobClass

pub mod fs;
pub mod in_memory;
pub mod r#trait;

pub use fs::FsBlobStore;
pub use in_memory::InMemoryBlobStore;
pub use r#trait::{BlobStore, BlobStoreError};
