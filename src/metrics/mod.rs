//! Prometheus metrics for the chargehub gateway
//!
//! Tracks HTTP requests per route and status, and document store failures
//! per operation.
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! If initialization fails, metrics operations become no-ops.

use prometheus::{register_counter_vec, CounterVec, Encoder, TextEncoder};
use std::sync::OnceLock;

// ============================================================================
// Metrics Storage
// ============================================================================

/// Container for all gateway metrics
struct GatewayMetrics {
    http_requests: CounterVec,
    store_errors: CounterVec,
}

/// Global storage for gateway metrics; `None` if registration failed
static GATEWAY_METRICS: OnceLock<Option<GatewayMetrics>> = OnceLock::new();

// ============================================================================
// Initialization
// ============================================================================

fn register_metrics() -> Result<GatewayMetrics, prometheus::Error> {
    Ok(GatewayMetrics {
        http_requests: register_counter_vec!(
            "chargehub_http_requests_total",
            "Total HTTP requests by route and status",
            &["route", "status"]
        )?,
        store_errors: register_counter_vec!(
            "chargehub_store_errors_total",
            "Total document store failures by operation",
            &["operation"]
        )?,
    })
}

/// Initialize all Prometheus metrics
///
/// Safe to call more than once and from several threads; only the first
/// call registers anything, later calls report its outcome.
///
/// # Example
///
/// ```ignore
/// if let Err(e) = chargehub::metrics::init_metrics() {
///     tracing::warn!("Metrics initialization failed: {}", e);
///     // The gateway keeps serving without metrics
/// }
/// ```
pub fn init_metrics() -> Result<(), String> {
    let mut failure = None;
    let metrics = GATEWAY_METRICS.get_or_init(|| match register_metrics() {
        Ok(metrics) => {
            tracing::info!("Prometheus metrics initialized successfully");
            Some(metrics)
        }
        Err(e) => {
            failure = Some(e.to_string());
            None
        }
    });

    match (metrics, failure) {
        (Some(_), _) => Ok(()),
        (None, Some(e)) => Err(e),
        (None, None) => Err("metrics registration failed earlier".to_string()),
    }
}

/// Check if metrics have been initialized
pub fn metrics_initialized() -> bool {
    matches!(GATEWAY_METRICS.get(), Some(Some(_)))
}

fn metrics() -> Option<&'static GatewayMetrics> {
    GATEWAY_METRICS.get().and_then(Option::as_ref)
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Record a handled HTTP request
pub fn record_request(route: &str, status: u16) {
    let Some(m) = metrics() else {
        return;
    };

    let status_str = status.to_string();
    m.http_requests
        .with_label_values(&[route, status_str.as_str()])
        .inc();
}

/// Record a failed store operation
pub fn record_store_error(operation: &str) {
    if let Some(m) = metrics() {
        m.store_errors.with_label_values(&[operation]).inc();
    }
}
