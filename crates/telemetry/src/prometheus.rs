// Path: crates/telemetry/src/prometheus.rs
//! A concrete implementation of the metrics sinks using the Prometheus crate.

use crate::sinks::*;
use once_cell::sync::OnceCell;
use prometheus::{
    exponential_buckets, register_gauge, register_histogram, register_int_counter,
    register_int_counter_vec, register_int_gauge, Gauge, Histogram, IntCounter, IntCounterVec,
    IntGauge,
};

// Collectors are set exactly once by `install`.

static STORAGE_BATCHES_COMMITTED_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static STORAGE_BYTES_WRITTEN_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static SNAPSHOTS_CREATED_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static SNAPSHOT_CHUNKS_APPLIED_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static MEMPOOL_ADMITTED_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static MEMPOOL_REJECTED_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static MEMPOOL_SHADOW_ACCOUNTS: OnceCell<Gauge> = OnceCell::new();
static BLOCKS_FINALIZED_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static TX_RESULTS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static BLOCK_DURATION_SECONDS: OnceCell<Histogram> = OnceCell::new();
static RESOLUTIONS_CONFIRMED_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static RESOLUTIONS_EXPIRED_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static COMMITTED_HEIGHT: OnceCell<IntGauge> = OnceCell::new();
static ERRORS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();

/// The Prometheus-backed sink. Calls before [`install`] are dropped.
#[derive(Debug, Clone, Copy)]
pub struct PrometheusSink;

macro_rules! with_metric {
    ($metric:ident, |$m:ident| $body:expr) => {
        if let Some($m) = $metric.get() {
            $body;
        }
    };
}

impl StorageMetricsSink for PrometheusSink {
    fn inc_batches_committed(&self) {
        with_metric!(STORAGE_BATCHES_COMMITTED_TOTAL, |m| m.inc());
    }
    fn inc_bytes_written_total(&self, bytes: u64) {
        with_metric!(STORAGE_BYTES_WRITTEN_TOTAL, |m| m.inc_by(bytes));
    }
    fn inc_snapshots_created(&self) {
        with_metric!(SNAPSHOTS_CREATED_TOTAL, |m| m.inc());
    }
    fn inc_snapshot_chunks_applied(&self) {
        with_metric!(SNAPSHOT_CHUNKS_APPLIED_TOTAL, |m| m.inc());
    }
}

impl MempoolMetricsSink for PrometheusSink {
    fn inc_admitted(&self) {
        with_metric!(MEMPOOL_ADMITTED_TOTAL, |m| m.inc());
    }
    fn inc_rejected(&self, code: &'static str) {
        with_metric!(MEMPOOL_REJECTED_TOTAL, |m| m.with_label_values(&[code]).inc());
    }
    fn set_shadow_accounts(&self, count: f64) {
        with_metric!(MEMPOOL_SHADOW_ACCOUNTS, |m| m.set(count));
    }
}

impl ExecutionMetricsSink for PrometheusSink {
    fn inc_blocks_finalized(&self) {
        with_metric!(BLOCKS_FINALIZED_TOTAL, |m| m.inc());
    }
    fn inc_tx_result(&self, code: &'static str) {
        with_metric!(TX_RESULTS_TOTAL, |m| m.with_label_values(&[code]).inc());
    }
    fn observe_block_duration(&self, duration_secs: f64) {
        with_metric!(BLOCK_DURATION_SECONDS, |m| m.observe(duration_secs));
    }
    fn inc_resolutions_confirmed(&self, resolution_type: &str) {
        with_metric!(RESOLUTIONS_CONFIRMED_TOTAL, |m| m
            .with_label_values(&[resolution_type])
            .inc());
    }
    fn inc_resolutions_expired(&self, resolution_type: &str) {
        with_metric!(RESOLUTIONS_EXPIRED_TOTAL, |m| m
            .with_label_values(&[resolution_type])
            .inc());
    }
    fn set_committed_height(&self, height: u64) {
        with_metric!(COMMITTED_HEIGHT, |m| m.set(i64::try_from(height).unwrap_or(i64::MAX)));
    }
}

impl ErrorMetricsSink for PrometheusSink {
    fn inc_error(&self, kind: &'static str, variant: &'static str) {
        with_metric!(ERRORS_TOTAL, |m| m.with_label_values(&[kind, variant]).inc());
    }
}

fn set_once<T>(cell: &OnceCell<T>, value: T) -> Result<(), prometheus::Error> {
    cell.set(value)
        .map_err(|_| prometheus::Error::Msg("prometheus sink already installed".into()))
}

/// Registers every collector with the default registry and returns the sink.
///
/// Must be called at most once per process.
pub fn install() -> Result<&'static dyn MetricsSink, prometheus::Error> {
    set_once(
        &STORAGE_BATCHES_COMMITTED_TOTAL,
        register_int_counter!(
            "strata_storage_batches_committed_total",
            "Atomic write batches committed to the backend."
        )?,
    )?;
    set_once(
        &STORAGE_BYTES_WRITTEN_TOTAL,
        register_int_counter!(
            "strata_storage_bytes_written_total",
            "Key and value bytes written to the backend."
        )?,
    )?;
    set_once(
        &SNAPSHOTS_CREATED_TOTAL,
        register_int_counter!("strata_snapshots_created_total", "Snapshots created.")?,
    )?;
    set_once(
        &SNAPSHOT_CHUNKS_APPLIED_TOTAL,
        register_int_counter!(
            "strata_snapshot_chunks_applied_total",
            "Snapshot chunks applied during state sync."
        )?,
    )?;
    set_once(
        &MEMPOOL_ADMITTED_TOTAL,
        register_int_counter!(
            "strata_mempool_admitted_total",
            "Transactions admitted by CheckTx."
        )?,
    )?;
    set_once(
        &MEMPOOL_REJECTED_TOTAL,
        register_int_counter_vec!(
            "strata_mempool_rejected_total",
            "Transactions rejected by CheckTx, by result code.",
            &["code"]
        )?,
    )?;
    set_once(
        &MEMPOOL_SHADOW_ACCOUNTS,
        register_gauge!(
            "strata_mempool_shadow_accounts",
            "Accounts cached by the mempool since the last commit."
        )?,
    )?;
    set_once(
        &BLOCKS_FINALIZED_TOTAL,
        register_int_counter!("strata_blocks_finalized_total", "Blocks executed.")?,
    )?;
    set_once(
        &TX_RESULTS_TOTAL,
        register_int_counter_vec!(
            "strata_tx_results_total",
            "Executed transactions, by result code.",
            &["code"]
        )?,
    )?;
    set_once(
        &BLOCK_DURATION_SECONDS,
        register_histogram!(
            "strata_block_duration_seconds",
            "Wall time of FinalizeBlock.",
            exponential_buckets(0.001, 2.0, 16)?
        )?,
    )?;
    set_once(
        &RESOLUTIONS_CONFIRMED_TOTAL,
        register_int_counter_vec!(
            "strata_resolutions_confirmed_total",
            "Resolutions that reached their confirmation threshold, by type.",
            &["type"]
        )?,
    )?;
    set_once(
        &RESOLUTIONS_EXPIRED_TOTAL,
        register_int_counter_vec!(
            "strata_resolutions_expired_total",
            "Resolutions that expired unconfirmed, by type.",
            &["type"]
        )?,
    )?;
    set_once(
        &COMMITTED_HEIGHT,
        register_int_gauge!("strata_committed_height", "Last committed block height.")?,
    )?;
    set_once(
        &ERRORS_TOTAL,
        register_int_counter_vec!(
            "strata_errors_total",
            "Errors by kind and variant.",
            &["kind", "variant"]
        )?,
    )?;

    static SINK_INSTANCE: PrometheusSink = PrometheusSink;
    Ok(&SINK_INSTANCE)
}
