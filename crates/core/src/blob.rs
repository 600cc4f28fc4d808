//! Blob classes stored per job.

use serde::{Deserialize, Serialize};

/// The two blob classes kept for each job. Keys in different classes never
/// collide because each class has its own namespace.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlobClass {
    /// Bytes exactly as submitted by the client.
    Raw,
    /// Output of the row transformer.
    Processed,
}

impl BlobClass {
    /// Namespace (directory / key prefix) for this class.
    pub fn namespace(&self) -> &'static str {
        match self {
            BlobClass::Raw => "upload",
            BlobClass::Processed => "processed",
        }
    }

    /// File suffix appended to the job id inside the namespace.
    pub fn extension(&self) -> &'static str {
        match self {
            BlobClass::Raw => "input",
            BlobClass::Processed => "output",
        }
    }
}

impl core::fmt::Display for BlobClass {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BlobClass::Raw => f.write_str("raw"),
            BlobClass::Processed => f.write_str("processed"),
        }
    }
}
