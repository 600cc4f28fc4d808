//! `rowmark-core`: shared primitives for the annotation pipeline.
//!
//! This crate contains **pure** types (no IO): job identifiers, the job state
//! register values, and blob classes. Every other crate speaks these types.

pub mod blob;
pub mod error;
pub mod id;
pub mod state;

pub use blob::BlobClass;
pub use error::DomainError;
pub use id::JobId;
pub use state::JobState;
