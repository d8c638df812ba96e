//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for logging and metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name attached to log lines
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error)
    pub log_level: String,

    /// Whether to enable JSON formatted logs
    pub json_logs: bool,

    /// Whether to include file and line in log lines
    pub source_locations: bool,

    /// Whether to register Prometheus collectors at startup
    pub metrics_enabled: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "qc-18-bridge".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            source_locations: false,
            metrics_enabled: true,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `QC_SERVICE_NAME`: Service name (default: qc-18-bridge)
    /// - `QC_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `QC_JSON_LOGS`: Enable JSON logs (default: false, true in containers)
    /// - `QC_LOG_SOURCE`: Include file/line (default: false)
    /// - `QC_METRICS`: Register metrics (default: true)
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("QC_SERVICE_NAME")
                .unwrap_or_else(|_| "qc-18-bridge".to_string()),

            log_level: env::var("QC_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            json_logs: env::var("QC_JSON_LOGS")
                .map(|v| parse_flag(&v))
                .unwrap_or(is_container),

            source_locations: env::var("QC_LOG_SOURCE")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),

            metrics_enabled: env::var("QC_METRICS")
                .map(|v| parse_flag(&v))
                .unwrap_or(true),
        }
    }

    /// Override the level, e.g. from a `--verbose` flag.
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}
