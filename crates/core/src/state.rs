//! Job state register values.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Lifecycle phase of a job.
///
/// There is deliberately no "unknown" variant: a job nobody enqueued has no
/// register at all, and callers model that as `None` / not-found.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Set at enqueue time; the worker has not finished with the job yet.
    Processing,
    /// Transform succeeded and the processed blob is persisted.
    Done,
    /// Some step failed. Permanent for this identifier.
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Processing => "processing",
            JobState::Done => "done",
            JobState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Failed)
    }

    /// Whether moving the register from `self` to `next` keeps it monotonic.
    ///
    /// Rewriting the same state is allowed (writes are idempotent); leaving a
    /// terminal state is not.
    pub fn can_transition_to(&self, next: JobState) -> bool {
        *self == next || *self == JobState::Processing
    }
}

impl core::fmt::Display for JobState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(JobState::Processing),
            "done" => Ok(JobState::Done),
            "failed" => Ok(JobState::Failed),
            other => Err(DomainError::invalid_state(other)),
        }
    }
}
