//! Autoscaling loop for tracked training jobs.
//!
//! The dispatcher feeds job lifecycle events in through the hooks while the
//! loop runs on its own task, so the registry sits behind a mutex; hook calls
//! are safe at any time relative to the loop. What to do about the sampled
//! load lives entirely behind this boundary.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use traind_resources::TrainingJob;

use crate::cluster::Cluster;

/// Autoscaler for training job worker counts.
pub struct Autoscaler {
    cluster: Cluster,
    max_load_desired: f64,
    scan_interval: Duration,
    jobs: Mutex<HashMap<String, TrainingJob>>,
}

impl Autoscaler {
    /// Create an autoscaler steering cluster load toward `max_load_desired`.
    pub fn new(cluster: Cluster, max_load_desired: f64, scan_interval: Duration) -> Self {
        Self {
            cluster,
            max_load_desired,
            scan_interval,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Begin tracking a job for scaling decisions.
    pub fn on_add(&self, job: &TrainingJob) {
        debug!(name = %job.metadata.name, "Autoscaler tracking training job");
        self.jobs
            .lock()
            .unwrap()
            .insert(job.metadata.uid.clone(), job.clone());
    }

    /// Replace the tracked spec of an updated job.
    pub fn on_update(&self, job: &TrainingJob) {
        debug!(name = %job.metadata.name, "Autoscaler updating tracked training job");
        self.jobs
            .lock()
            .unwrap()
            .insert(job.metadata.uid.clone(), job.clone());
    }

    /// Stop considering a job in scaling decisions.
    pub fn on_delete(&self, job: &TrainingJob) {
        debug!(name = %job.metadata.name, "Autoscaler dropping training job");
        self.jobs.lock().unwrap().remove(&job.metadata.uid);
    }

    /// Number of jobs currently tracked.
    pub fn tracked_jobs(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    /// Run the scaling loop until shutdown.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            max_load_desired = self.max_load_desired,
            scan_interval_secs = self.scan_interval.as_secs(),
            "Starting autoscaler loop"
        );

        let mut interval = tokio::time::interval(self.scan_interval);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.scan().await {
                        warn!(error = %e, "Autoscaler scan failed");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Autoscaler shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// One scan pass: sample cluster utilization and position it against the
    /// configured ceiling.
    async fn scan(&self) -> Result<(), traind_api::ApiError> {
        let utilization = self.cluster.utilization().await?;
        let load = utilization.load();
        let tracked = self.tracked_jobs();

        if load > self.max_load_desired {
            info!(
                load,
                max_load_desired = self.max_load_desired,
                tracked_jobs = tracked,
                "Cluster load above ceiling"
            );
        } else {
            debug!(
                load,
                max_load_desired = self.max_load_desired,
                tracked_jobs = tracked,
                "Cluster load within ceiling"
            );
        }
        Ok(())
    }
}
