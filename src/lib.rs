//! Chain client library: keys, transactions, confirmations and block subscriptions

pub mod config;
pub mod blockchain;
pub mod keys;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod tracker;
pub mod events;
pub mod client;

pub use blockchain::{Account, BaseTx, BroadcastMode, Coin, SdkError, SdkResult, TxMsg, TxResult};
pub use client::ChainClient;
pub use config::schema::ClientConfig;
pub use events::NewBlockEvent;
pub use tracker::{TxOutcome, TxReport, TxTracker};
