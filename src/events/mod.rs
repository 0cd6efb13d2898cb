//! New-block subscription subsystem.
//!
//! # Data Flow
//! ```text
//! ws_url
//!     → subscriber.rs (eth_subscribe "newHeads", reader task, reconnects)
//!     → bounded channel
//!     → dispatcher task → user handler(NewBlockEvent)
//!
//! manager.rs keeps every live Subscription by its local id.
//! ```

pub mod manager;
pub mod subscriber;
pub mod types;

pub use manager::SubscriptionManager;
pub use subscriber::{BlockSubscriber, Subscription};
pub use types::NewBlockEvent;
