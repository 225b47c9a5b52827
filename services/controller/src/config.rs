//! Configuration for the controller.

use anyhow::Result;

/// Controller configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Orchestration API base URL.
    pub api_url: String,

    /// Namespace to watch; `None` watches all namespaces.
    pub namespace: Option<String>,

    /// Maximum desired cluster load the autoscaler steers toward.
    pub max_load_desired: f64,

    /// Interval between autoscaler scans in seconds.
    pub scan_interval_secs: u64,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let api_url = std::env::var("TRAIND_API_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8080".to_string());

        let namespace = std::env::var("TRAIND_NAMESPACE")
            .ok()
            .filter(|s| !s.is_empty());

        let max_load_desired = std::env::var("TRAIND_MAX_LOAD_DESIRED")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.97);
        if !(0.0..=1.0).contains(&max_load_desired) {
            anyhow::bail!(
                "TRAIND_MAX_LOAD_DESIRED must be within [0.0, 1.0], got {max_load_desired}"
            );
        }

        let scan_interval_secs = std::env::var("TRAIND_SCAN_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        let log_level = std::env::var("TRAIND_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            api_url,
            namespace,
            max_load_desired,
            scan_interval_secs,
            log_level,
        })
    }
}
