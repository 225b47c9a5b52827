//! Cluster capacity accounting backed by the orchestration API.

use std::sync::Arc;

use traind_api::{ApiError, OrchestrationClient};

/// Aggregate capacity snapshot across all nodes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClusterUtilization {
    pub allocatable_cpu: f64,
    pub allocatable_memory_bytes: i64,
    pub requested_cpu: f64,
    pub requested_memory_bytes: i64,
}

impl ClusterUtilization {
    /// Fraction of allocatable capacity currently requested, taking the more
    /// loaded of the CPU and memory dimensions.
    pub fn load(&self) -> f64 {
        let cpu = if self.allocatable_cpu > 0.0 {
            self.requested_cpu / self.allocatable_cpu
        } else {
            0.0
        };
        let memory = if self.allocatable_memory_bytes > 0 {
            self.requested_memory_bytes as f64 / self.allocatable_memory_bytes as f64
        } else {
            0.0
        };
        cpu.max(memory)
    }
}

/// Read-only view of cluster capacity, consumed by the autoscaler.
pub struct Cluster {
    client: Arc<OrchestrationClient>,
}

impl Cluster {
    pub fn new(client: Arc<OrchestrationClient>) -> Self {
        Self { client }
    }

    /// Snapshot aggregate utilization across all nodes.
    pub async fn utilization(&self) -> Result<ClusterUtilization, ApiError> {
        let nodes = self.client.list_nodes().await?;

        let mut total = ClusterUtilization::default();
        for node in nodes {
            total.allocatable_cpu += node.allocatable_cpu;
            total.allocatable_memory_bytes += node.allocatable_memory_bytes;
            total.requested_cpu += node.requested_cpu;
            total.requested_memory_bytes += node.requested_memory_bytes;
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_takes_the_tighter_dimension() {
        let utilization = ClusterUtilization {
            allocatable_cpu: 10.0,
            allocatable_memory_bytes: 100,
            requested_cpu: 2.0,
            requested_memory_bytes: 90,
        };
        assert!((utilization.load() - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_empty_cluster_has_zero_load() {
        assert_eq!(ClusterUtilization::default().load(), 0.0);
    }
}
