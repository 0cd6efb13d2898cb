//! Tracker report types.

use std::fmt;

use alloy::primitives::TxHash;
use serde::Serialize;

/// Final state of a tracked transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TxOutcome {
    /// Executed with result code OK.
    Success { height: u64, gas_used: u64 },
    /// Included but execution failed.
    Failed { code: u32, log: String },
    /// The query itself failed (not found, pending, node unreachable, timeout).
    Unknown { reason: String },
}

impl TxOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TxOutcome::Success { .. })
    }

    pub(crate) fn label(&self) -> &'static str {
        match self {
            TxOutcome::Success { .. } => "success",
            TxOutcome::Failed { .. } => "failed",
            TxOutcome::Unknown { .. } => "unknown",
        }
    }
}

/// Outcome of one tracked hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxReport {
    pub hash: TxHash,
    pub outcome: TxOutcome,
}

impl fmt::Display for TxReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            TxOutcome::Success { height, .. } => {
                write!(f, "Tx success, hash: {}, height: {}", self.hash, height)
            }
            TxOutcome::Failed { code, log } => {
                write!(f, "Tx failed, hash: {}, code: {}, log: {}", self.hash, code, log)
            }
            TxOutcome::Unknown { reason } => {
                write!(f, "Tx query failed, hash: {}, reason: {}", self.hash, reason)
            }
        }
    }
}
