//! traind controller entry point.
//!
//! Watches training job resources and expands each new job into the
//! coordinator, aggregator, and worker workloads the orchestration platform
//! runs for it, while the autoscaler loop samples cluster load alongside.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use traind_api::OrchestrationClient;
use traind_controller::config::Config;
use traind_controller::controller::{Controller, TerminationReason};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting traind controller");

    let config = Config::from_env()?;
    info!(
        api_url = %config.api_url,
        namespace = config.namespace.as_deref().unwrap_or("<all>"),
        max_load_desired = config.max_load_desired,
        "Configuration loaded"
    );

    let client = Arc::new(OrchestrationClient::new(&config.api_url));
    let controller = Controller::new(client, &config);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut run = tokio::spawn(controller.run(shutdown_rx));

    let result = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            let _ = shutdown_tx.send(true);
            run.await
        }
        res = &mut run => res,
    };

    match result {
        Ok(TerminationReason::ShutdownRequested) => {
            info!("Controller shutdown complete");
            Ok(())
        }
        Ok(reason) => {
            error!(reason = %reason, "Controller stopped unexpectedly");
            anyhow::bail!("controller stopped: {reason}")
        }
        Err(e) => {
            error!(error = %e, "Controller task panicked");
            Err(e.into())
        }
    }
}
