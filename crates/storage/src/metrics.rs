// Path: crates/storage/src/metrics.rs
use strata_telemetry::sinks::StorageMetricsSink;

pub fn metrics() -> &'static dyn StorageMetricsSink {
    strata_telemetry::storage_metrics()
}
