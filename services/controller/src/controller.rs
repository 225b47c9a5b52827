//! Controller wiring: the watch loop and the autoscaler loop under one
//! supervisor.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::error;

use traind_api::OrchestrationClient;

use crate::autoscaler::Autoscaler;
use crate::cluster::Cluster;
use crate::config::Config;
use crate::dispatcher::ReconciliationDispatcher;
use crate::watcher::{EventWatcher, WatchError};

/// Why [`Controller::run`] returned.
#[derive(Debug)]
pub enum TerminationReason {
    /// An external shutdown was requested; both loops drained cleanly.
    ShutdownRequested,

    /// The watch loop failed; the autoscaler was cancelled in response.
    WatcherFailed(WatchError),

    /// The watch loop returned without a shutdown request.
    WatcherExited,

    /// The autoscaler loop stopped without a shutdown request.
    AutoscalerExited,
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminationReason::ShutdownRequested => write!(f, "shutdown requested"),
            TerminationReason::WatcherFailed(e) => write!(f, "watch loop failed: {e}"),
            TerminationReason::WatcherExited => write!(f, "watch loop exited unexpectedly"),
            TerminationReason::AutoscalerExited => write!(f, "autoscaler exited unexpectedly"),
        }
    }
}

/// Reconciliation controller for training job resources.
pub struct Controller {
    watcher: EventWatcher,
    dispatcher: Arc<ReconciliationDispatcher>,
    autoscaler: Arc<Autoscaler>,
}

impl Controller {
    /// Wire the watcher, dispatcher, and autoscaler against one API client.
    pub fn new(client: Arc<OrchestrationClient>, config: &Config) -> Self {
        let cluster = Cluster::new(Arc::clone(&client));
        let autoscaler = Arc::new(Autoscaler::new(
            cluster,
            config.max_load_desired,
            Duration::from_secs(config.scan_interval_secs),
        ));
        let dispatcher = Arc::new(ReconciliationDispatcher::new(
            Arc::clone(&client),
            Arc::clone(&autoscaler),
        ));
        let watcher = EventWatcher::new(client, config.namespace.clone());

        Self {
            watcher,
            dispatcher,
            autoscaler,
        }
    }

    /// Run both loops until an external shutdown or the first unrecovered
    /// failure.
    ///
    /// The loops run as two independent tasks sharing a cancellation signal.
    /// Whichever stops first cancels the other, and both are joined before
    /// the termination reason is reported. Any signal on `shutdown` is
    /// treated as a stop request.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> TerminationReason {
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let mut watcher_handle = tokio::spawn({
            let dispatcher = Arc::clone(&self.dispatcher);
            let cancel_rx = cancel_rx.clone();
            let watcher = self.watcher;
            async move { watcher.run(dispatcher.as_ref(), cancel_rx).await }
        });

        let mut autoscaler_handle = tokio::spawn({
            let autoscaler = Arc::clone(&self.autoscaler);
            let cancel_rx = cancel_rx.clone();
            async move { autoscaler.run(cancel_rx).await }
        });

        tokio::select! {
            res = &mut watcher_handle => {
                let _ = cancel_tx.send(true);
                let _ = autoscaler_handle.await;
                match res {
                    Ok(Ok(())) => TerminationReason::WatcherExited,
                    Ok(Err(e)) => TerminationReason::WatcherFailed(e),
                    Err(e) => {
                        error!(error = %e, "Watch task panicked");
                        TerminationReason::WatcherExited
                    }
                }
            }
            res = &mut autoscaler_handle => {
                let _ = cancel_tx.send(true);
                if let Err(e) = res {
                    error!(error = %e, "Autoscaler task panicked");
                }
                if let Ok(Err(e)) = watcher_handle.await {
                    // The watcher may fail while draining; prefer reporting
                    // that over the autoscaler exit.
                    return TerminationReason::WatcherFailed(e);
                }
                TerminationReason::AutoscalerExited
            }
            _ = shutdown.changed() => {
                let _ = cancel_tx.send(true);
                let watcher_res = watcher_handle.await;
                let _ = autoscaler_handle.await;
                match watcher_res {
                    Ok(Err(e)) => TerminationReason::WatcherFailed(e),
                    _ => TerminationReason::ShutdownRequested,
                }
            }
        }
    }
}
