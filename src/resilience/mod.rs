//! Resilience helpers.
//!
//! # Data Flow
//! ```text
//! RPC call / broadcast / websocket reconnect
//!     → retries.rs (retryable? attempt budget left?)
//!     → backoff.rs (exponential delay with jitter)
//! ```

pub mod backoff;
pub mod retries;

pub use backoff::calculate_backoff;
pub use retries::retry_with_backoff;
