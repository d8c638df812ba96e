//! Prometheus metrics for the bridge withdrawal subsystem.
//!
//! All metrics follow the naming convention: `qc_bridge_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., auth_round_trips_total)
//! - **CounterVec**: Counter split by an outcome label
//! - **Histogram**: Distribution of values (e.g., confirmation_duration_seconds)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Histogram, HistogramOpts, Opts, Registry,
    TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Bridge metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // AUTHENTICATION
    // =========================================================================

    /// Challenge/redeem round-trips actually performed (coalesced calls excluded)
    pub static ref AUTH_ROUND_TRIPS: Counter = Counter::new(
        "qc_bridge_auth_round_trips_total",
        "Challenge/sign/redeem round-trips performed"
    ).expect("metric creation failed");

    // =========================================================================
    // WITNESS QUORUM
    // =========================================================================

    /// Witness request outcomes per attempt
    pub static ref WITNESS_REQUESTS: CounterVec = CounterVec::new(
        Opts::new("qc_bridge_witness_requests_total", "Witness signing attempts by outcome"),
        &["outcome"]  // ok, busy, unauthenticated, server_error, network, rejected
    ).expect("metric creation failed");

    /// Quorum collections by result
    pub static ref QUORUM_COLLECTIONS: CounterVec = CounterVec::new(
        Opts::new("qc_bridge_quorum_collections_total", "Quorum collections by result"),
        &["result"]  // met, insufficient
    ).expect("metric creation failed");

    // =========================================================================
    // TRANSACTIONS
    // =========================================================================

    /// Transactions by terminal state
    pub static ref TRANSACTIONS: CounterVec = CounterVec::new(
        Opts::new("qc_bridge_transactions_total", "Transactions by terminal state"),
        &["state"]  // success, reverted, timeout, rejected
    ).expect("metric creation failed");

    /// Time from submission to a terminal receipt
    pub static ref CONFIRMATION_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "qc_bridge_confirmation_duration_seconds",
            "Time from submission to confirmation"
        ).buckets(exponential_buckets(0.5, 2.0, 10).expect("static buckets"))
    ).expect("metric creation failed");
}

/// Register all metrics with the bridge registry.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(AUTH_ROUND_TRIPS.clone()),
        Box::new(WITNESS_REQUESTS.clone()),
        Box::new(QUORUM_COLLECTIONS.clone()),
        Box::new(TRANSACTIONS.clone()),
        Box::new(CONFIRMATION_DURATION.clone()),
    ];

    for metric in metrics {
        REGISTRY
            .register(metric)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }
    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
