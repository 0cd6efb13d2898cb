//! Block event types and their JSON-RPC wire forms.

use alloy::primitives::{Address, B256, U64};
use serde::{Deserialize, Serialize};

/// A new block header delivered by a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewBlockEvent {
    pub number: u64,
    pub hash: B256,
    pub parent_hash: B256,
    pub timestamp: u64,
    pub gas_used: u64,
    pub gas_limit: u64,
    pub miner: Address,
}

impl std::fmt::Display for NewBlockEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "block #{} {} (gas used {}/{}, time {})",
            self.number, self.hash, self.gas_used, self.gas_limit, self.timestamp
        )
    }
}

/// `newHeads` payload as sent by the node; quantities are hex strings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireHeader {
    number: U64,
    hash: B256,
    parent_hash: B256,
    timestamp: U64,
    gas_used: U64,
    gas_limit: U64,
    #[serde(default)]
    miner: Address,
}

impl From<WireHeader> for NewBlockEvent {
    fn from(h: WireHeader) -> Self {
        Self {
            number: h.number.to(),
            hash: h.hash,
            parent_hash: h.parent_hash,
            timestamp: h.timestamp.to(),
            gas_used: h.gas_used.to(),
            gas_limit: h.gas_limit.to(),
            miner: h.miner,
        }
    }
}

/// Any JSON-RPC message arriving on the socket: a response or a notification.
#[derive(Debug, Deserialize)]
pub(crate) struct WireMessage {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<WireError>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Option<WireParams>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireParams {
    pub subscription: String,
    pub result: serde_json::Value,
}
