//! Structured logging.
//!
//! Lines go to stderr. Pretty output for terminals, JSON lines when
//! `json_logs` is set:
//! - `timestamp`: ISO 8601 timestamp
//! - `level`: Log level
//! - `target`: Emitting module
//! - `fields.message`: Log message, prefixed with the subsystem tag
//! - Additional structured fields (`address`, `server`, `attempt`, `tx_hash`)

use crate::{TelemetryConfig, TelemetryError};
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber.
///
/// Fails if the filter does not parse or a subscriber is already installed.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(&config.log_level)
        .map_err(|e| TelemetryError::Config(format!("log filter '{}': {}", config.log_level, e)))?;

    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(config.source_locations)
        .with_line_number(config.source_locations);

    let result = if config.json_logs {
        builder.json().with_current_span(true).try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;

    tracing::debug!(
        service = %config.service_name,
        json_logs = config.json_logs,
        "Logging initialised"
    );
    Ok(())
}

/// Log a transaction-related event with standard fields.
#[macro_export]
macro_rules! log_tx_event {
    ($level:ident, $msg:expr, $tx_hash:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            subsystem = "qc-18",
            tx_hash = %$tx_hash,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a witness-related event with standard fields.
#[macro_export]
macro_rules! log_witness_event {
    ($level:ident, $msg:expr, $server:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            subsystem = "qc-18",
            server = %$server,
            $($($field)*,)?
            $msg
        )
    };
}
