//! List+watch subscription over training job resources.
//!
//! The watcher keeps an in-memory view of observed jobs keyed by uid and
//! dispatches per-object callbacks: at-least-once delivery, events for the
//! same object in order, no ordering across objects. Periodic resync is
//! deliberately disabled; callbacks fire only when the orchestration API
//! reports a genuine change, never as a re-validation sweep.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use traind_api::{ApiError, OrchestrationClient, WatchEvent, WatchEventType};
use traind_resources::TrainingJob;

/// Callbacks bound to the watcher. Invocations are serialized: the watcher
/// never re-enters a handler concurrently with itself.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn on_add(&self, job: &TrainingJob);
    async fn on_update(&self, old: &TrainingJob, new: &TrainingJob);
    async fn on_delete(&self, job: &TrainingJob);
}

/// Errors that terminate the watch loop.
///
/// Transport failures are retried internally; only a malformed delivered
/// object ends the loop, with a typed error instead of an aborted process.
#[derive(Debug, Error)]
pub enum WatchError {
    /// A delivered object did not decode as a training job.
    #[error("shape violation in watch stream: {0}")]
    ShapeViolation(String),
}

/// List+watch subscription over training jobs.
pub struct EventWatcher {
    client: Arc<OrchestrationClient>,
    namespace: Option<String>,
    retry_backoff: Duration,
    cache: HashMap<String, TrainingJob>,
}

impl EventWatcher {
    /// Create a watcher scoped to `namespace`, or unscoped when `None`.
    pub fn new(client: Arc<OrchestrationClient>, namespace: Option<String>) -> Self {
        Self {
            client,
            namespace,
            retry_backoff: Duration::from_secs(5),
            cache: HashMap::new(),
        }
    }

    /// Run the subscription until shutdown is signaled or a delivered object
    /// fails to decode.
    ///
    /// Each pass lists the current state, reconciles the in-memory view
    /// against it, then consumes the watch stream from the list's resource
    /// version. Transport errors fall back to a fresh list after a backoff.
    pub async fn run<H: EventHandler>(
        mut self,
        handler: &H,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), WatchError> {
        info!(
            namespace = self.namespace.as_deref().unwrap_or("<all>"),
            "Starting training job watch"
        );

        loop {
            let list = match self.client.list_training_jobs(self.namespace.as_deref()).await {
                Ok(list) => list,
                Err(ApiError::ShapeViolation(msg)) => {
                    return Err(WatchError::ShapeViolation(msg));
                }
                Err(e) => {
                    warn!(error = %e, "Failed to list training jobs, will retry");
                    if self.pause(&mut shutdown).await {
                        return Ok(());
                    }
                    continue;
                }
            };

            let resource_version = list.resource_version.clone();
            self.sync(handler, list.items).await;

            let stream = match self
                .client
                .watch_training_jobs(self.namespace.as_deref(), &resource_version)
                .await
            {
                Ok(stream) => stream,
                Err(ApiError::ShapeViolation(msg)) => {
                    return Err(WatchError::ShapeViolation(msg));
                }
                Err(e) => {
                    warn!(error = %e, "Failed to open watch, will retry");
                    if self.pause(&mut shutdown).await {
                        return Ok(());
                    }
                    continue;
                }
            };
            tokio::pin!(stream);

            loop {
                tokio::select! {
                    item = stream.next() => match item {
                        Some(Ok(event)) => self.dispatch(handler, event).await,
                        Some(Err(ApiError::ShapeViolation(msg))) => {
                            return Err(WatchError::ShapeViolation(msg));
                        }
                        Some(Err(e)) => {
                            warn!(error = %e, "Watch stream failed, reconnecting");
                            break;
                        }
                        None => {
                            debug!("Watch stream ended, relisting");
                            break;
                        }
                    },
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            info!("Event watcher shutting down");
                            return Ok(());
                        }
                    }
                }
            }

            if self.pause(&mut shutdown).await {
                return Ok(());
            }
        }
    }

    /// Sleep through the retry backoff. Returns true if shutdown was
    /// signaled while waiting.
    async fn pause(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(self.retry_backoff) => false,
            _ = shutdown.changed() => *shutdown.borrow(),
        }
    }

    /// Reconcile the in-memory view against a freshly listed state, firing
    /// callbacks only for observed differences.
    async fn sync<H: EventHandler>(&mut self, handler: &H, items: Vec<TrainingJob>) {
        let mut next = HashMap::with_capacity(items.len());
        for job in items {
            let key = job.metadata.uid.clone();
            match self.cache.remove(&key) {
                None => handler.on_add(&job).await,
                Some(old) if old.metadata.resource_version != job.metadata.resource_version => {
                    handler.on_update(&old, &job).await;
                }
                Some(_) => {}
            }
            next.insert(key, job);
        }

        // Anything left in the old view disappeared while we were not
        // watching.
        for (_, old) in std::mem::take(&mut self.cache) {
            handler.on_delete(&old).await;
        }
        self.cache = next;
    }

    async fn dispatch<H: EventHandler>(&mut self, handler: &H, event: WatchEvent) {
        let job = event.object;
        let key = job.metadata.uid.clone();

        match event.event_type {
            WatchEventType::Added => {
                handler.on_add(&job).await;
                self.cache.insert(key, job);
            }
            WatchEventType::Modified => match self.cache.insert(key, job.clone()) {
                Some(old) => handler.on_update(&old, &job).await,
                // Modified for an object we never saw added; treat as an add.
                None => handler.on_add(&job).await,
            },
            WatchEventType::Deleted => {
                self.cache.remove(&key);
                handler.on_delete(&job).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use traind_resources::{
        AggregatorSpec, CoordinatorSpec, ObjectMeta, ResourceRequests, TrainingJobSpec, WorkerSpec,
    };

    fn job(name: &str, uid: &str, version: &str) -> TrainingJob {
        let resources = ResourceRequests {
            cpu: 1.0,
            memory_bytes: 1 << 30,
        };
        TrainingJob {
            metadata: ObjectMeta {
                name: name.to_string(),
                namespace: "ml".to_string(),
                uid: uid.to_string(),
                resource_version: version.to_string(),
            },
            spec: TrainingJobSpec {
                coordinator: CoordinatorSpec {
                    replicas: 1,
                    image: "img".to_string(),
                    resources,
                },
                aggregator: AggregatorSpec {
                    replicas: 1,
                    image: "img".to_string(),
                    resources,
                },
                worker: WorkerSpec {
                    parallelism: 1,
                    completions: 1,
                    image: "img".to_string(),
                    resources,
                },
            },
        }
    }

    #[derive(Default)]
    struct RecordingHandler {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EventHandler for RecordingHandler {
        async fn on_add(&self, job: &TrainingJob) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("add:{}", job.metadata.name));
        }

        async fn on_update(&self, old: &TrainingJob, new: &TrainingJob) {
            self.calls.lock().unwrap().push(format!(
                "update:{}:{}->{}",
                new.metadata.name, old.metadata.resource_version, new.metadata.resource_version
            ));
        }

        async fn on_delete(&self, job: &TrainingJob) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("delete:{}", job.metadata.name));
        }
    }

    fn watcher() -> EventWatcher {
        EventWatcher::new(
            Arc::new(OrchestrationClient::new("http://127.0.0.1:1")),
            None,
        )
    }

    #[tokio::test]
    async fn test_sync_fires_only_observed_changes() {
        let handler = RecordingHandler::default();
        let mut watcher = watcher();

        watcher
            .sync(&handler, vec![job("bert", "u1", "1"), job("gpt", "u2", "1")])
            .await;

        // Unchanged bert, bumped gpt, vanished nothing.
        watcher
            .sync(&handler, vec![job("bert", "u1", "1"), job("gpt", "u2", "2")])
            .await;

        // gpt disappeared between watches.
        watcher.sync(&handler, vec![job("bert", "u1", "1")]).await;

        let calls = handler.calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![
                "add:bert".to_string(),
                "add:gpt".to_string(),
                "update:gpt:1->2".to_string(),
                "delete:gpt".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_dispatch_pairs_old_and_new_on_modify() {
        let handler = RecordingHandler::default();
        let mut watcher = watcher();

        watcher
            .dispatch(
                &handler,
                WatchEvent {
                    event_type: WatchEventType::Added,
                    object: job("bert", "u1", "1"),
                },
            )
            .await;
        watcher
            .dispatch(
                &handler,
                WatchEvent {
                    event_type: WatchEventType::Modified,
                    object: job("bert", "u1", "2"),
                },
            )
            .await;
        watcher
            .dispatch(
                &handler,
                WatchEvent {
                    event_type: WatchEventType::Deleted,
                    object: job("bert", "u1", "2"),
                },
            )
            .await;

        let calls = handler.calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![
                "add:bert".to_string(),
                "update:bert:1->2".to_string(),
                "delete:bert".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_modify_without_prior_add_is_treated_as_add() {
        let handler = RecordingHandler::default();
        let mut watcher = watcher();

        watcher
            .dispatch(
                &handler,
                WatchEvent {
                    event_type: WatchEventType::Modified,
                    object: job("bert", "u1", "2"),
                },
            )
            .await;

        assert_eq!(*handler.calls.lock().unwrap(), vec!["add:bert".to_string()]);
    }
}
