use std::net::SocketAddr;

use crate::engine::AdmissionError;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: bookings admitted.
pub const BOOKINGS_ADMITTED_TOTAL: &str = "kennel_bookings_admitted_total";

/// Counter: bookings rejected. Labels: reason.
pub const BOOKINGS_REJECTED_TOTAL: &str = "kennel_bookings_rejected_total";

/// Histogram: admission latency in seconds.
pub const ADMISSION_DURATION_SECONDS: &str = "kennel_admission_duration_seconds";

/// Counter: availability reads that degraded to an empty answer.
pub const DEGRADED_READS_TOTAL: &str = "kennel_degraded_reads_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Counter: sweep runs completed.
pub const SWEEP_RUNS_TOTAL: &str = "kennel_sweep_runs_total";

/// Histogram: sweep duration in seconds.
pub const SWEEP_DURATION_SECONDS: &str = "kennel_sweep_duration_seconds";

/// Gauge: rooms found free by the latest sweep.
pub const SWEEP_FREE_ROOMS: &str = "kennel_sweep_free_rooms";

/// Histogram: ledger group-commit flush duration in seconds.
pub const LEDGER_FLUSH_DURATION_SECONDS: &str = "kennel_ledger_flush_duration_seconds";

/// Histogram: ledger group-commit batch size (events per flush).
pub const LEDGER_FLUSH_BATCH_SIZE: &str = "kennel_ledger_flush_batch_size";

/// Install the Prometheus metrics exporter on the given port. No-op if
/// `port` is `None`.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}

/// Plain stderr tracing for embedders that have no subscriber of their own.
pub fn init_tracing() {
    tracing_subscriber::fmt::init();
}

/// Map a rejection to a short label for metrics.
pub fn rejection_label(err: &AdmissionError) -> &'static str {
    match err {
        AdmissionError::InvalidRequest(_) => "invalid_request",
        AdmissionError::RoomNotFound(_) => "room_not_found",
        AdmissionError::RoomUnavailable(_) => "room_unavailable",
        AdmissionError::CapacityExceeded { .. } => "capacity_exceeded",
        AdmissionError::DateConflict(_) => "date_conflict",
        AdmissionError::StoreUnavailable(_) => "store_unavailable",
    }
}
