//! Derived workload objects submitted to the orchestration platform.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::job::ResourceRequests;

/// The two workload kinds the platform can run for a training job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadKind {
    /// Long-running replicated workload (coordinator and aggregator roles).
    Replicated,

    /// Bounded-completion workload (worker role).
    Batch,
}

impl std::fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkloadKind::Replicated => write!(f, "replicated"),
            WorkloadKind::Batch => write!(f, "batch"),
        }
    }
}

/// The role a derived workload was translated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Coordinator,
    Aggregator,
    Worker,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Coordinator => "coordinator",
            Role::Aggregator => "aggregator",
            Role::Worker => "worker",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identity of a derived workload.
///
/// Labels use a `BTreeMap` so serialized output is byte-identical across
/// repeated translations of the same job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadMeta {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// Pod template shared by all replicas of a workload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodTemplate {
    pub image: String,
    pub resources: ResourceRequests,
}

/// A concrete, platform-native workload produced by translating one role
/// sub-spec of a training job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedWorkload {
    pub kind: WorkloadKind,
    pub metadata: WorkloadMeta,

    /// Replica count for replicated workloads, parallelism for batch ones.
    pub replicas: i32,

    /// Completion target; present only for batch workloads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completions: Option<i32>,

    pub template: PodTemplate,
}

/// Label keys stamped onto every derived workload so the platform can tie it
/// back to the owning training job.
pub mod labels {
    pub const JOB_NAME: &str = "traind.io/training-job";
    pub const JOB_UID: &str = "traind.io/training-job-uid";
    pub const ROLE: &str = "traind.io/role";
}
