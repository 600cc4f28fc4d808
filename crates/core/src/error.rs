//! Domain error model.

use thiserror::Error;

/// Domain-level error.
///
/// Only covers parsing of the values this crate owns. Storage and transform
/// failures have their own error types in the crates that produce them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A job identifier failed to parse.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A stored or submitted state string is not one of the known states.
    #[error("invalid job state: {0}")]
    InvalidState(String),
}

impl DomainError {
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }
}
