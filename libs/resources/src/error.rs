//! Validation errors for training job specs.

use thiserror::Error;

use crate::workload::Role;

/// A training job's role sub-specs are missing required fields or carry
/// invalid values. Translation aborts without producing any workload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidSpec {
    /// A replica, parallelism, or completion count is negative.
    #[error("{role}: {field} must be non-negative, got {value}")]
    NegativeCount {
        role: Role,
        field: &'static str,
        value: i32,
    },

    /// A role sub-spec has no container image.
    #[error("{role}: image must not be empty")]
    MissingImage { role: Role },
}
