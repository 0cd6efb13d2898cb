//! Metrics collection and exposition.
//!
//! # Metrics
//! - `chain_client_rpc_requests_total` (counter): RPC calls by method, outcome
//! - `chain_client_rpc_duration_seconds` (histogram): RPC latency by method
//! - `chain_client_tx_submitted_total` (counter): submissions by kind, mode, outcome
//! - `chain_client_tx_outcomes_total` (counter): settled transactions by outcome
//! - `chain_client_retries_total` (counter): retries by operation
//! - `chain_client_blocks_received_total` (counter): subscription notifications
//! - `chain_client_subscription_reconnects_total` (counter)
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::blockchain::types::BroadcastMode;

/// Serve metrics on `addr` for Prometheus to scrape. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_rpc_call(method: &'static str, elapsed: Duration, ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    counter!("chain_client_rpc_requests_total", "method" => method, "outcome" => outcome).increment(1);
    histogram!("chain_client_rpc_duration_seconds", "method" => method).record(elapsed.as_secs_f64());
}

pub fn record_tx_submitted(kind: &'static str, mode: BroadcastMode, ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    counter!(
        "chain_client_tx_submitted_total",
        "kind" => kind,
        "mode" => mode.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_tx_outcome(outcome: &'static str) {
    counter!("chain_client_tx_outcomes_total", "outcome" => outcome).increment(1);
}

pub fn record_retry(operation: &str) {
    counter!("chain_client_retries_total", "operation" => operation.to_string()).increment(1);
}

pub fn record_block_received() {
    counter!("chain_client_blocks_received_total").increment(1);
}

pub fn record_subscription_reconnect() {
    counter!("chain_client_subscription_reconnects_total").increment(1);
}
