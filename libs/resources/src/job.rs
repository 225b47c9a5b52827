//! Training job resource types.

use serde::{Deserialize, Serialize};

/// Identity metadata assigned by the orchestration platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    /// Resource name, unique within the namespace.
    pub name: String,

    /// Namespace the resource lives in.
    pub namespace: String,

    /// Platform-assigned unique identifier, stable across renames.
    #[serde(default)]
    pub uid: String,

    /// Opaque version, bumped by the platform on every mutation.
    #[serde(default)]
    pub resource_version: String,
}

/// Per-pod resource requests for one role.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceRequests {
    /// Requested CPU cores.
    pub cpu: f64,

    /// Requested memory in bytes.
    pub memory_bytes: i64,
}

/// Spec for the coordinator role (long-running).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatorSpec {
    pub replicas: i32,
    pub image: String,
    pub resources: ResourceRequests,
}

/// Spec for the parameter-aggregation role (long-running).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatorSpec {
    pub replicas: i32,
    pub image: String,
    pub resources: ResourceRequests,
}

/// Spec for the worker role. Workers run to completion rather than
/// indefinitely, so the spec carries a completion target alongside the
/// parallelism count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerSpec {
    pub parallelism: i32,
    pub completions: i32,
    pub image: String,
    pub resources: ResourceRequests,
}

/// The three role sub-specs of a training job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingJobSpec {
    pub coordinator: CoordinatorSpec,
    pub aggregator: AggregatorSpec,
    pub worker: WorkerSpec,
}

/// A user-submitted distributed training job declaration.
///
/// Created, updated, and deleted entirely through the orchestration API by
/// external actors; the controller only reacts to observed changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingJob {
    pub metadata: ObjectMeta,
    pub spec: TrainingJobSpec,
}
