//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) or ClientConfig::new(..).with_*(..)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated, immutable)
//!     → shared via Arc by the client subsystems
//! ```

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    ChainConfig, ClientConfig, ConfirmationConfig, KeysConfig, ObservabilityConfig, RetryConfig,
    SubscriptionConfig, TxConfig,
};
pub use validation::{validate_config, ValidationError};
