//! Lifecycle management.
//!
//! Background tasks (block subscriptions) hold a `ShutdownListener`; the
//! owner triggers the matching `Shutdown` to stop them.

pub mod shutdown;

pub use shutdown::{Shutdown, ShutdownListener};
