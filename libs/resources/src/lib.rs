//! # traind-resources
//!
//! Resource model for the traind platform.
//!
//! A `TrainingJob` is the user-submitted declaration of a distributed
//! training workload. It is composed of three role sub-specs:
//!
//! - **Coordinator**: orchestrates the overall training job.
//! - **Aggregator**: holds and combines model state contributed by workers.
//! - **Worker**: performs the bounded-completion computation steps.
//!
//! The [`translate`] function expands one valid `TrainingJob` into the three
//! [`DerivedWorkload`] objects the orchestration platform can run. Translation
//! is pure and deterministic: derived names are a stable function of the job
//! name, so re-submitting the same creation is idempotent (the platform
//! rejects the duplicate by name).

mod error;
mod job;
mod translate;
mod workload;

pub use error::InvalidSpec;
pub use job::*;
pub use translate::{derived_name, translate, TranslatedWorkloads};
pub use workload::*;
