//! Infrastructure layer: blob storage, job queue back-ends, worker loop.

pub mod blob_store;
pub mod jobs;
