//! # Prometheus Metrics
//!
//! Operational metrics for the ledger node, scraped by Prometheus at the
//! `/metrics` HTTP endpoint on the configured metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so they
//! do not collide with any default global registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::core::Collector;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;
use std::time::Duration;

use ngu_ledger::{TransferEngine, TransferSummary};

/// Holds all Prometheus metric handles for the node.
///
/// Clone-friendly (prometheus handles are `Arc` internally) so it can be
/// shared across request handlers.
#[derive(Clone)]
pub struct LedgerMetrics {
    registry: Registry,
    /// Operations that applied successfully.
    pub operations_applied_total: IntCounter,
    /// Operations the ledger or the contract rejected.
    pub operations_rejected_total: IntCounter,
    pub erc721_mints_total: IntCounter,
    pub erc721_burns_total: IntCounter,
    /// Tokens handed between holders with identity intact.
    pub erc721_reassignments_total: IntCounter,
    pub erc721_total_supply: IntGauge,
    /// Burned ids waiting for reuse.
    pub erc721_queue_length: IntGauge,
    /// Time spent holding the write lock per operation, in seconds.
    pub operation_latency_seconds: Histogram,
}

impl LedgerMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("ngu".into()), None)?;

        let operations_applied_total = register(
            &registry,
            IntCounter::new("operations_applied_total", "Total number of operations applied")?,
        )?;
        let operations_rejected_total = register(
            &registry,
            IntCounter::new("operations_rejected_total", "Total number of operations rejected")?,
        )?;
        let erc721_mints_total = register(
            &registry,
            IntCounter::new("erc721_mints_total", "Total number of non-fungible tokens minted")?,
        )?;
        let erc721_burns_total = register(
            &registry,
            IntCounter::new("erc721_burns_total", "Total number of non-fungible tokens burned")?,
        )?;
        let erc721_reassignments_total = register(
            &registry,
            IntCounter::new(
                "erc721_reassignments_total",
                "Total number of tokens moved between holders by fungible transfers",
            )?,
        )?;
        let erc721_total_supply = register(
            &registry,
            IntGauge::new("erc721_total_supply", "Non-fungible tokens currently in existence")?,
        )?;
        let erc721_queue_length = register(
            &registry,
            IntGauge::new("erc721_queue_length", "Burned token ids waiting for reuse")?,
        )?;
        let operation_latency_seconds = register(
            &registry,
            Histogram::with_opts(
                HistogramOpts::new(
                    "operation_latency_seconds",
                    "Time to apply one operation under the ledger lock, in seconds",
                )
                .buckets(vec![
                    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1,
                ]),
            )?,
        )?;

        Ok(Self {
            registry,
            operations_applied_total,
            operations_rejected_total,
            erc721_mints_total,
            erc721_burns_total,
            erc721_reassignments_total,
            erc721_total_supply,
            erc721_queue_length,
            operation_latency_seconds,
        })
    }

    /// Records a successful operation.
    pub fn record_applied(&self, summary: &TransferSummary, elapsed: Duration) {
        self.operations_applied_total.inc();
        self.erc721_mints_total.inc_by(summary.minted as u64);
        self.erc721_burns_total.inc_by(summary.burned as u64);
        self.erc721_reassignments_total.inc_by(summary.reassigned as u64);
        self.operation_latency_seconds.observe(elapsed.as_secs_f64());
    }

    pub fn record_rejected(&self, elapsed: Duration) {
        self.operations_rejected_total.inc();
        self.operation_latency_seconds.observe(elapsed.as_secs_f64());
    }

    /// Refreshes the gauges from the ledger's current state.
    pub fn observe(&self, ledger: &TransferEngine) {
        self.erc721_total_supply
            .set(i64::try_from(ledger.erc721_total_supply()).unwrap_or(i64::MAX));
        self.erc721_queue_length
            .set(i64::try_from(ledger.erc721_queue_length()).unwrap_or(i64::MAX));
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

fn register<C: Collector + Clone + 'static>(registry: &Registry, metric: C) -> Result<C, prometheus::Error> {
    registry.register(Box::new(metric.clone()))?;
    Ok(metric)
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<LedgerMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
///
/// Returns HTTP 500 if encoding fails.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
