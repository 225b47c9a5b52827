//! traind reconciliation controller.
//!
//! Watches training job resources and expands each new job into the three
//! workloads the orchestration platform runs for it: a coordinator, a
//! parameter aggregator, and a bounded-completion worker set.
//!
//! ## Architecture
//!
//! - **EventWatcher**: list+watch subscription over training jobs, delivering
//!   add/update/delete callbacks one at a time.
//! - **ReconciliationDispatcher**: the callback set; creates derived
//!   workloads on add and forwards lifecycle events to the autoscaler.
//! - **Autoscaler**: tracks live jobs and samples cluster load on its own
//!   loop; the scaling decisions themselves live behind its hook boundary.
//! - **Controller**: supervises the watch loop and the autoscaler loop as two
//!   tasks under a shared shutdown signal.

pub mod autoscaler;
pub mod cluster;
pub mod config;
pub mod controller;
pub mod dispatcher;
pub mod watcher;
