//! # traind-api
//!
//! Typed REST client for the traind orchestration API.
//!
//! The controller consumes three surfaces:
//!
//! - `list` + `watch` over training job resources, namespace-scoped or
//!   all-namespaces. Watch responses are chunked JSON-lines streams; each
//!   line carries one add/modify/delete event.
//! - `create` for the two derived workload kinds, keyed by the deterministic
//!   derived name. A name collision surfaces as [`ApiError::Conflict`].
//! - node capacity reads used for cluster load accounting.
//!
//! Delivered objects are decoded at this boundary: anything that does not
//! match the expected resource shape yields [`ApiError::ShapeViolation`]
//! instead of an unchecked cast.

mod client;
mod error;
mod types;

pub use client::OrchestrationClient;
pub use error::ApiError;
pub use types::*;
