// Path: crates/telemetry/src/sinks.rs
//! Defines abstract traits for metrics reporting, decoupling core logic from the backend.

use once_cell::sync::OnceCell;

// --- Static Sink Access ---

/// A no-op sink for use in tests or when telemetry is disabled.
#[derive(Debug, Clone, Copy)]
pub struct NopSink;

/// A lazily-initialized static reference to the global `MetricsSink` implementation.
pub static SINK: OnceCell<&'static dyn MetricsSink> = OnceCell::new();
static NOP_SINK: NopSink = NopSink;

/// Returns the configured error metrics sink, or a no-op sink.
pub fn error_metrics() -> &'static dyn ErrorMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns the configured mempool metrics sink, or a no-op sink.
pub fn mempool_metrics() -> &'static dyn MempoolMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns the configured execution metrics sink, or a no-op sink.
pub fn execution_metrics() -> &'static dyn ExecutionMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns the configured storage metrics sink, or a no-op sink.
pub fn storage_metrics() -> &'static dyn StorageMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

// --- Trait Definitions ---

/// A sink for metrics related to the persistent storage layer.
pub trait StorageMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments the number of atomic batches committed.
    fn inc_batches_committed(&self);
    /// Increments the total number of bytes written to the backend.
    fn inc_bytes_written_total(&self, bytes: u64);
    /// Increments the number of snapshots created.
    fn inc_snapshots_created(&self);
    /// Increments the number of snapshot chunks applied during state sync.
    fn inc_snapshot_chunks_applied(&self);
}
impl StorageMetricsSink for NopSink {
    fn inc_batches_committed(&self) {}
    fn inc_bytes_written_total(&self, _bytes: u64) {}
    fn inc_snapshots_created(&self) {}
    fn inc_snapshot_chunks_applied(&self) {}
}

/// A sink for mempool admission.
pub trait MempoolMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments the counter of admitted transactions.
    fn inc_admitted(&self);
    /// Increments the counter of rejected transactions, labeled by result code.
    fn inc_rejected(&self, code: &'static str);
    /// Sets the number of cached shadow accounts.
    fn set_shadow_accounts(&self, count: f64);
}
impl MempoolMetricsSink for NopSink {
    fn inc_admitted(&self) {}
    fn inc_rejected(&self, _code: &'static str) {}
    fn set_shadow_accounts(&self, _count: f64) {}
}

/// A sink for block execution.
pub trait ExecutionMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments the counter of finalized blocks.
    fn inc_blocks_finalized(&self);
    /// Increments the counter of executed transactions, labeled by result code.
    fn inc_tx_result(&self, code: &'static str);
    /// Observes the duration of a FinalizeBlock call.
    fn observe_block_duration(&self, duration_secs: f64);
    /// Increments the counter of confirmed resolutions, labeled by type.
    fn inc_resolutions_confirmed(&self, resolution_type: &str);
    /// Increments the counter of expired resolutions, labeled by type.
    fn inc_resolutions_expired(&self, resolution_type: &str);
    /// Sets the last committed height.
    fn set_committed_height(&self, height: u64);
}
impl ExecutionMetricsSink for NopSink {
    fn inc_blocks_finalized(&self) {}
    fn inc_tx_result(&self, _code: &'static str) {}
    fn observe_block_duration(&self, _duration_secs: f64) {}
    fn inc_resolutions_confirmed(&self, _resolution_type: &str) {}
    fn inc_resolutions_expired(&self, _resolution_type: &str) {}
    fn set_committed_height(&self, _height: u64) {}
}

/// A sink for recording structured error metrics.
pub trait ErrorMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments a counter for a specific error, categorized by its kind and variant.
    fn inc_error(&self, kind: &'static str, variant: &'static str);
}
impl ErrorMetricsSink for NopSink {
    fn inc_error(&self, _kind: &'static str, _variant: &'static str) {}
}

/// A unified sink that implements all domain-specific traits, providing a single
/// point of implementation for metrics backends like Prometheus.
pub trait MetricsSink:
    StorageMetricsSink + MempoolMetricsSink + ExecutionMetricsSink + ErrorMetricsSink
{
}

impl<T> MetricsSink for T where
    T: StorageMetricsSink + MempoolMetricsSink + ExecutionMetricsSink + ErrorMetricsSink
{
}
