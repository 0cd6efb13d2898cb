//! Ordered queue of submitted transaction hashes.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::TxHash;
use futures_util::future::join_all;
use tokio::time::sleep;

use crate::blockchain::rpc::ChainRpc;
use crate::blockchain::transaction::{query_tx, wait_for_confirmation};
use crate::blockchain::types::ConfirmationStatus;
use crate::config::ConfirmationConfig;
use crate::observability::metrics;
use crate::tracker::types::{TxOutcome, TxReport};

/// Collects hashes of submitted transactions and resolves them in one pass.
pub struct TxTracker {
    rpc: Arc<dyn ChainRpc>,
    config: ConfirmationConfig,
    pending: Vec<TxHash>,
}

impl TxTracker {
    pub fn new(rpc: Arc<dyn ChainRpc>, config: ConfirmationConfig) -> Self {
        Self {
            rpc,
            config,
            pending: Vec::new(),
        }
    }

    /// Queue a hash. Duplicates are ignored.
    pub fn track(&mut self, hash: TxHash) {
        if !self.pending.contains(&hash) {
            self.pending.push(hash);
        }
    }

    pub fn pending(&self) -> &[TxHash] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Wait `query_delay_secs`, query every queued hash once, and drain the queue.
    pub async fn settle(&mut self) -> Vec<TxReport> {
        if self.pending.is_empty() {
            return Vec::new();
        }

        let delay = Duration::from_secs(self.config.query_delay_secs);
        tracing::info!(count = self.pending.len(), delay_secs = delay.as_secs(), "Settling tracked transactions");
        sleep(delay).await;

        let mut reports = Vec::with_capacity(self.pending.len());
        for hash in self.pending.drain(..) {
            let outcome = match query_tx(self.rpc.as_ref(), hash).await {
                Ok(result) if result.result.is_ok() => TxOutcome::Success {
                    height: result.height,
                    gas_used: result.result.gas_used,
                },
                Ok(result) => TxOutcome::Failed {
                    code: result.result.code,
                    log: result.result.log,
                },
                Err(e) => TxOutcome::Unknown { reason: e.to_string() },
            };
            reports.push(report(hash, outcome));
        }
        reports
    }

    /// Poll every queued hash until confirmed, failed, or timed out, and drain the queue.
    pub async fn wait_all(&mut self) -> Vec<TxReport> {
        let hashes: Vec<TxHash> = self.pending.drain(..).collect();
        let rpc = self.rpc.as_ref();
        let config = &self.config;

        let waits = hashes.iter().map(|hash| async move {
            let outcome = match wait_for_confirmation(rpc, *hash, config).await {
                Ok(ConfirmationStatus::Confirmed { block_number, gas_used }) => TxOutcome::Success {
                    height: block_number,
                    gas_used,
                },
                Ok(ConfirmationStatus::Failed(log)) => TxOutcome::Failed {
                    code: crate::blockchain::types::CODE_REVERTED,
                    log,
                },
                Ok(other) => TxOutcome::Unknown {
                    reason: format!("unexpected status {:?}", other),
                },
                Err(e) => TxOutcome::Unknown { reason: e.to_string() },
            };
            report(*hash, outcome)
        });

        join_all(waits).await
    }
}

fn report(hash: TxHash, outcome: TxOutcome) -> TxReport {
    metrics::record_tx_outcome(outcome.label());
    match &outcome {
        TxOutcome::Success { height, .. } => {
            tracing::info!(tx_hash = %hash, height = height, "Transaction succeeded");
        }
        TxOutcome::Failed { code, log } => {
            tracing::warn!(tx_hash = %hash, code = code, log = %log, "Transaction failed");
        }
        TxOutcome::Unknown { reason } => {
            tracing::warn!(tx_hash = %hash, reason = %reason, "Transaction query failed");
        }
    }
    TxReport { hash, outcome }
}
