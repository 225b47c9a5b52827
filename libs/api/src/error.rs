//! Error types for orchestration API calls.

use thiserror::Error;

use traind_resources::WorkloadKind;

/// Errors surfaced by the orchestration API client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A workload with the same name already exists (HTTP 409). Expected
    /// outcome of at-least-once event delivery; callers treat it as benign.
    #[error("{kind} workload {namespace}/{name} already exists")]
    Conflict {
        kind: WorkloadKind,
        namespace: String,
        name: String,
    },

    /// Any other non-success response from the orchestration API.
    #[error("orchestration API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Transport-level failure (connection, timeout, body read).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A delivered object does not match the expected resource shape.
    #[error("shape violation: {0}")]
    ShapeViolation(String),
}

impl ApiError {
    /// Returns true for the benign duplicate-create outcome.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ApiError::Conflict { .. })
    }
}
