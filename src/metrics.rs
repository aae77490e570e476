//! OpenTelemetry metrics for the fleet controller
//!
//! Instruments are no-ops until a meter provider is installed by
//! [`crate::telemetry::init_telemetry`].

use once_cell::sync::Lazy;
use opentelemetry::global;
use opentelemetry::metrics::{Counter, Histogram, Meter};
use opentelemetry::KeyValue;

/// Global meter for redis-fleet metrics
static METER: Lazy<Meter> = Lazy::new(|| global::meter("redis-fleet"));

/// Histogram of fleet reconciliation duration
///
/// Labels:
/// - `result`: success, error
pub static RECONCILE_DURATION: Lazy<Histogram<f64>> = Lazy::new(|| {
    METER
        .f64_histogram("redis_fleet_reconcile_duration_seconds")
        .with_description("Duration of RedisFleet reconciliation in seconds")
        .with_unit("s")
        .build()
});

/// Counter of fleet reconciliation errors
///
/// Labels:
/// - `error_type`: transient, permanent
pub static RECONCILE_ERRORS: Lazy<Counter<u64>> = Lazy::new(|| {
    METER
        .u64_counter("redis_fleet_reconcile_errors_total")
        .with_description("Total number of RedisFleet reconciliation errors")
        .with_unit("{errors}")
        .build()
});

/// Counter of child pod operations
///
/// Labels:
/// - `operation`: create, delete
pub static CHILD_OPERATIONS: Lazy<Counter<u64>> = Lazy::new(|| {
    METER
        .u64_counter("redis_fleet_child_operations_total")
        .with_description("Total number of child pod creates and deletes")
        .with_unit("{operations}")
        .build()
});

/// Record the outcome of one reconcile pass
pub fn record_reconcile(duration_secs: f64, error_type: Option<&'static str>) {
    let result = if error_type.is_some() { "error" } else { "success" };
    RECONCILE_DURATION.record(duration_secs, &[KeyValue::new("result", result)]);
    if let Some(error_type) = error_type {
        RECONCILE_ERRORS.add(1, &[KeyValue::new("error_type", error_type)]);
    }
}

/// Record a child pod create or delete
pub fn record_child_operation(operation: &'static str) {
    CHILD_OPERATIONS.add(1, &[KeyValue::new("operation", operation)]);
}
