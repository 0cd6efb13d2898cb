//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::blockchain::types::BroadcastMode;

/// Root configuration for the chain client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Node endpoints and chain identity.
    pub chain: ChainConfig,

    /// Key management settings.
    pub keys: KeysConfig,

    /// Transaction defaults (fee, gas, broadcast mode).
    pub tx: TxConfig,

    /// Confirmation polling settings.
    pub confirmation: ConfirmationConfig,

    /// Block subscription settings.
    pub subscription: SubscriptionConfig,

    /// Retry configuration for RPC calls and broadcasts.
    pub retries: RetryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl ClientConfig {
    /// Build a configuration for the given endpoints, leaving everything else at defaults.
    pub fn new(rpc_url: impl Into<String>, ws_url: impl Into<String>, chain_id: u64) -> Self {
        let mut config = Self::default();
        config.chain.rpc_url = rpc_url.into();
        config.chain.ws_url = ws_url.into();
        config.chain.chain_id = chain_id;
        config
    }

    /// Set the signing algorithm.
    pub fn with_algo(mut self, algo: impl Into<String>) -> Self {
        self.keys.algo = algo.into();
        self
    }

    /// Set the default fee (e.g. `"420000wei"`).
    pub fn with_fee(mut self, fee: impl Into<String>) -> Self {
        self.tx.fee = Some(fee.into());
        self
    }

    /// Set the confirmation timeout in seconds.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.confirmation.timeout_secs = secs;
        self
    }

    /// Enable or disable the local nonce cache.
    pub fn with_cached(mut self, cached: bool) -> Self {
        self.tx.cached = cached;
        self
    }

    /// Set the default broadcast mode.
    pub fn with_broadcast_mode(mut self, mode: BroadcastMode) -> Self {
        self.tx.broadcast_mode = mode;
        self
    }
}

/// Node endpoints and chain identity.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// WebSocket endpoint used for subscriptions.
    pub ws_url: String,

    /// Failover JSON-RPC endpoint URLs.
    pub failover_urls: Vec<String>,

    /// Chain ID (e.g., 1 for Ethereum mainnet, 31337 for local Anvil).
    pub chain_id: u64,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Check the node's chain ID on startup.
    pub verify_chain_id: bool,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            ws_url: "ws://localhost:8546".to_string(),
            failover_urls: Vec::new(),
            chain_id: 1,
            rpc_timeout_secs: 10,
            verify_chain_id: true,
        }
    }
}

/// Key management configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct KeysConfig {
    /// Signing algorithm. Only `eth_secp256k1` is supported.
    pub algo: String,

    /// Minimum accepted password length.
    pub min_password_len: usize,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            algo: "eth_secp256k1".to_string(),
            min_password_len: 8,
        }
    }
}

/// Transaction defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TxConfig {
    /// Denomination of the native token.
    pub denom: String,

    /// Default fee budget per transaction (e.g. `"420000wei"`).
    /// When unset, the node's gas price is used.
    pub fee: Option<String>,

    /// Gas limit used when a transaction does not set one.
    pub default_gas: u64,

    /// Gas price multiplier (1.0 = estimated, 1.2 = 20% buffer).
    pub gas_price_multiplier: f64,

    /// Maximum gas price in gwei (protection against spikes).
    pub max_gas_price_gwei: u64,

    /// Broadcast mode used when a transaction does not set one.
    pub broadcast_mode: BroadcastMode,

    /// Maximum memo length in bytes.
    pub max_memo_bytes: usize,

    /// Track nonces locally instead of querying the chain for every transaction.
    pub cached: bool,
}

impl Default for TxConfig {
    fn default() -> Self {
        Self {
            denom: "wei".to_string(),
            fee: None,
            default_gas: 200_000,
            gas_price_multiplier: 1.2,
            max_gas_price_gwei: 500,
            broadcast_mode: BroadcastMode::Sync,
            max_memo_bytes: 256,
            cached: true,
        }
    }
}

/// Confirmation polling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    /// Number of block confirmations required for finality.
    pub confirmation_blocks: u32,

    /// Receipt polling interval in milliseconds.
    pub poll_interval_ms: u64,

    /// Maximum time to wait for a confirmation in seconds.
    pub timeout_secs: u64,

    /// Delay before a batch of tracked hashes is queried.
    pub query_delay_secs: u64,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            confirmation_blocks: 1,
            poll_interval_ms: 2000,
            timeout_secs: 10,
            query_delay_secs: 10,
        }
    }
}

/// Block subscription configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SubscriptionConfig {
    /// Reconnect and re-subscribe when the socket drops.
    pub reconnect: bool,

    /// Maximum consecutive reconnect attempts.
    pub max_reconnects: u32,

    /// Buffer between the socket reader and the handler.
    pub channel_capacity: usize,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            reconnect: true,
            max_reconnects: 5,
            channel_capacity: 64,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Enable retries.
    pub enabled: bool,

    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9184".to_string(),
        }
    }
}
