//! Prometheus counters for the payment path.

use lazy_static::lazy_static;
use prometheus::{register_int_counter, Encoder, IntCounter, TextEncoder};

lazy_static! {
    pub static ref SESSIONS_CREATED: IntCounter = register_int_counter!(
        "payment_sessions_created_total",
        "Total number of payment sessions created"
    )
    .unwrap();
    pub static ref PAYMENT_ATTEMPTS: IntCounter = register_int_counter!(
        "payment_attempts_total",
        "Total number of settlement attempts started"
    )
    .unwrap();
    pub static ref PAYMENTS_COMPLETED: IntCounter = register_int_counter!(
        "payments_completed_total",
        "Total number of payments settled successfully"
    )
    .unwrap();
    pub static ref PAYMENTS_FAILED: IntCounter = register_int_counter!(
        "payments_failed_total",
        "Total number of payments that ended in failure"
    )
    .unwrap();
    pub static ref SESSIONS_CANCELLED: IntCounter = register_int_counter!(
        "payment_sessions_cancelled_total",
        "Total number of payment sessions cancelled"
    )
    .unwrap();
    pub static ref VALIDATION_FAILURES: IntCounter = register_int_counter!(
        "validation_failures_total",
        "Total number of requests rejected by validation"
    )
    .unwrap();
    pub static ref SESSIONS_SWEPT: IntCounter = register_int_counter!(
        "payment_sessions_swept_total",
        "Total number of expired payment sessions removed by the sweeper"
    )
    .unwrap();
}

/// Renders the registry in the Prometheus text format.
pub async fn metrics_handler() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
