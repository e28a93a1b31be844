//! Prometheus metrics for query accounting
//!
//! Call `init_metrics()` once at application startup to register all
//! metrics. If initialization fails, metrics operations become no-ops.

use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, CounterVec, Encoder, Gauge,
    HistogramVec, TextEncoder,
};
use std::sync::OnceLock;

/// Container for all engine metrics
struct EngineMetrics {
    queries: CounterVec,
    query_duration: HistogramVec,
    cache_hits: Gauge,
    cache_misses: Gauge,
}

static ENGINE_METRICS: OnceLock<EngineMetrics> = OnceLock::new();

/// Flag to track if initialization was attempted
static METRICS_INIT_ATTEMPTED: OnceLock<bool> = OnceLock::new();

/// Initialize all Prometheus metrics
///
/// Safe to call more than once; only the first call registers.
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    if METRICS_INIT_ATTEMPTED.get().is_some() {
        return Ok(());
    }
    METRICS_INIT_ATTEMPTED.set(true).ok();

    let metrics = EngineMetrics {
        queries: register_counter_vec!(
            "trendlens_queries_total",
            "Total queries by operation and status",
            &["operation", "status"]
        )?,
        query_duration: register_histogram_vec!(
            "trendlens_query_duration_seconds",
            "Query duration by operation",
            &["operation"]
        )?,
        cache_hits: register_gauge!(
            "trendlens_series_cache_hits",
            "Series cache hits since startup"
        )?,
        cache_misses: register_gauge!(
            "trendlens_series_cache_misses",
            "Series cache misses since startup"
        )?,
    };

    ENGINE_METRICS.set(metrics).ok();
    Ok(())
}

/// Record a completed query
pub fn record_query(operation: &str, status: &str, duration_secs: f64) {
    if let Some(metrics) = ENGINE_METRICS.get() {
        metrics
            .queries
            .with_label_values(&[operation, status])
            .inc();
        metrics
            .query_duration
            .with_label_values(&[operation])
            .observe(duration_secs);
    }
}

/// Mirror the series-cache counters into gauges
pub fn record_cache_stats(hits: u64, misses: u64) {
    if let Some(metrics) = ENGINE_METRICS.get() {
        metrics.cache_hits.set(hits as f64);
        metrics.cache_misses.set(misses as f64);
    }
}

/// Encode the current metric families as Prometheus text format
pub fn encode_text() -> String {
    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    let mut buffer = Vec::new();
    if encoder.encode(&families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
