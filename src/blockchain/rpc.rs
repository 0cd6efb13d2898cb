//! The node interface the rest of the client is written against.

use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;

use crate::blockchain::types::{SdkResult, TxReceipt};

/// Read and broadcast operations against a chain node.
///
/// `RpcClient` is the JSON-RPC implementation; tests substitute their own.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    async fn chain_id(&self) -> SdkResult<u64>;

    /// Latest block height.
    async fn block_number(&self) -> SdkResult<u64>;

    async fn balance(&self, address: Address) -> SdkResult<U256>;

    /// Next nonce of an account, as seen by the node.
    async fn nonce(&self, address: Address) -> SdkResult<u64>;

    /// Current gas price in wei.
    async fn gas_price(&self) -> SdkResult<u128>;

    /// Submit a signed, EIP-2718 encoded transaction. Returns the hash the node reports.
    async fn send_raw_transaction(&self, raw: &[u8]) -> SdkResult<TxHash>;

    /// Receipt of a mined transaction, `None` while pending or unknown.
    async fn transaction_receipt(&self, hash: TxHash) -> SdkResult<Option<TxReceipt>>;

    /// Whether the node knows the transaction at all (pool or chain).
    async fn has_transaction(&self, hash: TxHash) -> SdkResult<bool>;
}
