//! Chain access subsystem.
//!
//! # Data Flow
//! ```text
//! ChainConfig
//!     → client.rs (RpcClient: JSON-RPC with timeouts and failover)
//!     → rpc.rs (ChainRpc seam used by everything below)
//!     → account.rs (account queries, nonce cache)
//!     → transaction.rs (build, sign, broadcast, confirm)
//! ```
//!
//! # Security Constraints
//! - Signing happens locally; only signed bytes leave the process
//! - All RPC calls have configurable timeouts

pub mod account;
pub mod client;
pub mod rpc;
pub mod transaction;
pub mod types;

#[cfg(test)]
pub(crate) mod mock;

pub use account::{query_account, AccountCache};
pub use client::RpcClient;
pub use rpc::ChainRpc;
pub use transaction::{query_tx, wait_for_confirmation, TxSubmitter};
pub use types::{
    Account, BaseTx, BroadcastMode, Coin, ConfirmationStatus, ResultQueryTx, SdkError,
    SdkResult, TxMsg, TxReceipt, TxResult,
};
