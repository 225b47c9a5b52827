//! Reconciliation callbacks bound to the event watcher.
//!
//! On add, a training job is expanded into its three derived workloads and
//! each is created independently against the orchestration API. Updates and
//! deletes only adjust what the autoscaler tracks; existing workloads are
//! never patched or deleted here. The platform garbage-collects them through
//! the owner labels stamped at creation.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use traind_api::{ApiError, OrchestrationClient};
use traind_resources::{translate, TrainingJob};

use crate::autoscaler::Autoscaler;
use crate::watcher::EventHandler;

/// Dispatcher for training job events.
pub struct ReconciliationDispatcher {
    client: Arc<OrchestrationClient>,
    autoscaler: Arc<Autoscaler>,
}

impl ReconciliationDispatcher {
    pub fn new(client: Arc<OrchestrationClient>, autoscaler: Arc<Autoscaler>) -> Self {
        Self { client, autoscaler }
    }
}

#[async_trait]
impl EventHandler for ReconciliationDispatcher {
    async fn on_add(&self, job: &TrainingJob) {
        debug!(
            name = %job.metadata.name,
            namespace = %job.metadata.namespace,
            "Training job added"
        );

        // The autoscaler tracks the job regardless of whether creation
        // succeeds below.
        self.autoscaler.on_add(job);

        let workloads = match translate(job) {
            Ok(workloads) => workloads,
            Err(e) => {
                warn!(
                    name = %job.metadata.name,
                    error = %e,
                    "Invalid training job spec, no workloads created"
                );
                return;
            }
        };

        // Each create stands on its own: a failed coordinator create must not
        // keep the aggregator or worker from being attempted.
        for workload in workloads.as_array() {
            match self.client.create_workload(workload).await {
                Ok(()) => info!(
                    name = %workload.metadata.name,
                    namespace = %workload.metadata.namespace,
                    kind = %workload.kind,
                    replicas = workload.replicas,
                    "Created derived workload"
                ),
                Err(ApiError::Conflict { .. }) => debug!(
                    name = %workload.metadata.name,
                    "Derived workload already exists"
                ),
                Err(e) => error!(
                    name = %workload.metadata.name,
                    error = %e,
                    "Failed to create derived workload"
                ),
            }
        }
    }

    async fn on_update(&self, old: &TrainingJob, new: &TrainingJob) {
        debug!(
            name = %new.metadata.name,
            old_version = %old.metadata.resource_version,
            new_version = %new.metadata.resource_version,
            "Training job updated"
        );

        // Spec changes are visible to the autoscaler only; running workloads
        // are not resized or re-translated.
        self.autoscaler.on_update(new);
    }

    async fn on_delete(&self, job: &TrainingJob) {
        debug!(name = %job.metadata.name, "Training job deleted");
        self.autoscaler.on_delete(job);
    }
}
