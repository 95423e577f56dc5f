//! Metrics module
//!
//! Prometheus counters and histograms for the upload protocol. Recording is
//! on by default and can be switched off at runtime with [`set_enabled`].

use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_histogram, register_histogram_vec, Counter,
    CounterVec, Encoder, Histogram, HistogramVec, TextEncoder,
};
use std::sync::atomic::{AtomicBool, Ordering};

static ENABLED: AtomicBool = AtomicBool::new(true);

lazy_static! {
    // Upload metrics
    pub static ref UPLOADS_TOTAL: CounterVec = register_counter_vec!(
        "asset_uploads_total",
        "Total number of uploads",
        &["target", "status"]
    ).unwrap();

    pub static ref UPLOAD_BYTES_TOTAL: Counter = register_counter!(
        "asset_upload_bytes_total",
        "Total bytes sent in acknowledged chunks"
    ).unwrap();

    pub static ref CHUNKS_TOTAL: Counter = register_counter!(
        "asset_upload_chunks_total",
        "Total chunks acknowledged"
    ).unwrap();

    pub static ref CHUNKS_PER_UPLOAD: Histogram = register_histogram!(
        "asset_upload_chunks",
        "Number of chunks per finalized upload",
        vec![0.0, 1.0, 2.0, 5.0, 10.0, 50.0, 100.0, 500.0, 1000.0]
    ).unwrap();

    pub static ref STEP_DURATION: HistogramVec = register_histogram_vec!(
        "asset_upload_step_duration_seconds",
        "Protocol step duration in seconds",
        &["step"],
        vec![0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0]
    ).unwrap();

    // Error metrics
    pub static ref ERRORS_TOTAL: CounterVec = register_counter_vec!(
        "asset_upload_errors_total",
        "Total errors",
        &["type"]
    ).unwrap();
}

/// Turn metric recording on or off
pub fn set_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
}

pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

/// Record a committed upload
pub fn record_upload_success(target: &str) {
    if !is_enabled() {
        return;
    }
    UPLOADS_TOTAL.with_label_values(&[target, "success"]).inc();
}

/// Record a failed upload
pub fn record_upload_failure(target: &str) {
    if !is_enabled() {
        return;
    }
    UPLOADS_TOTAL.with_label_values(&[target, "failure"]).inc();
}

/// Record an acknowledged chunk
pub fn record_chunk(bytes: u64) {
    if !is_enabled() {
        return;
    }
    CHUNKS_TOTAL.inc();
    UPLOAD_BYTES_TOTAL.inc_by(bytes as f64);
}

/// Record the chunk count of a finalized upload
pub fn record_finalized(chunk_count: u64) {
    if !is_enabled() {
        return;
    }
    CHUNKS_PER_UPLOAD.observe(chunk_count as f64);
}

/// Record protocol step duration
pub fn record_step_duration(step: &str, duration_secs: f64) {
    if !is_enabled() {
        return;
    }
    STEP_DURATION.with_label_values(&[step]).observe(duration_secs);
}

/// Record an error
pub fn record_error(error_type: &str) {
    if !is_enabled() {
        return;
    }
    ERRORS_TOTAL.with_label_values(&[error_type]).inc();
}

/// Render all registered metrics in the Prometheus text format
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&families, &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
