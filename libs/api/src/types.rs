//! Wire types for the orchestration API.

use serde::{Deserialize, Serialize};

use traind_resources::TrainingJob;

/// Event classes delivered by a watch subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchEventType {
    Added,
    Modified,
    Deleted,
}

/// One decoded event from a watch stream.
#[derive(Debug, Clone)]
pub struct WatchEvent {
    pub event_type: WatchEventType,
    pub object: TrainingJob,
}

/// Response of a training job list call.
#[derive(Debug, Clone, Deserialize)]
pub struct TrainingJobList {
    /// Version the list was served at; watches resume from here.
    #[serde(default)]
    pub resource_version: String,

    pub items: Vec<TrainingJob>,
}

/// Capacity accounting for one cluster node.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeCapacity {
    pub name: String,
    pub allocatable_cpu: f64,
    pub allocatable_memory_bytes: i64,
    #[serde(default)]
    pub requested_cpu: f64,
    #[serde(default)]
    pub requested_memory_bytes: i64,
}

/// Response of a node list call.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeList {
    pub items: Vec<NodeCapacity>,
}
