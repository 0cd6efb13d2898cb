//! Confirmation tracking for submitted transactions.
//!
//! # Data Flow
//! ```text
//! TxResult.hash
//!     → queue.rs (TxTracker: ordered queue of hashes)
//!     → settle(): one delayed query per hash
//!     → wait_all(): concurrent confirmation polling
//!     → types.rs (TxReport per hash, in submission order)
//! ```

pub mod queue;
pub mod types;

pub use queue::TxTracker;
pub use types::{TxOutcome, TxReport};
