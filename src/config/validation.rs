//! Configuration validation.
//!
//! Serde handles syntax; this pass checks values that only make sense
//! together (schemes, ranges, fee denomination). All errors are collected
//! so a bad file can be fixed in one go.

use std::net::SocketAddr;

use thiserror::Error;

use crate::blockchain::types::Coin;
use crate::config::schema::ClientConfig;
use crate::keys::SigningAlgo;

/// Intrinsic gas of a plain value transfer.
pub const MIN_GAS: u64 = 21_000;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid URL '{value}': {reason}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("tx.default_gas {0} is below the intrinsic minimum of {MIN_GAS}")]
    GasTooLow(u64),

    #[error("tx.gas_price_multiplier must be positive")]
    BadMultiplier,

    #[error("keys.algo '{0}' is not supported")]
    UnsupportedAlgo(String),

    #[error("tx.fee: {0}")]
    InvalidFee(String),

    #[error("observability.metrics_address '{0}' is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Validate a configuration, returning every problem found.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_url(&mut errors, "chain.rpc_url", &config.chain.rpc_url, &["http", "https"]);
    check_url(&mut errors, "chain.ws_url", &config.chain.ws_url, &["ws", "wss"]);
    for url in &config.chain.failover_urls {
        check_url(&mut errors, "chain.failover_urls", url, &["http", "https"]);
    }

    if config.chain.rpc_timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "chain.rpc_timeout_secs" });
    }
    if config.confirmation.timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "confirmation.timeout_secs" });
    }
    if config.confirmation.poll_interval_ms == 0 {
        errors.push(ValidationError::Zero { field: "confirmation.poll_interval_ms" });
    }
    if config.subscription.channel_capacity == 0 {
        errors.push(ValidationError::Zero { field: "subscription.channel_capacity" });
    }
    if config.retries.enabled && config.retries.max_attempts == 0 {
        errors.push(ValidationError::Zero { field: "retries.max_attempts" });
    }

    if config.tx.default_gas < MIN_GAS {
        errors.push(ValidationError::GasTooLow(config.tx.default_gas));
    }
    if !(config.tx.gas_price_multiplier > 0.0) {
        errors.push(ValidationError::BadMultiplier);
    }

    if config.keys.algo.parse::<SigningAlgo>().is_err() {
        errors.push(ValidationError::UnsupportedAlgo(config.keys.algo.clone()));
    }

    if let Some(fee) = &config.tx.fee {
        match fee.parse::<Coin>() {
            Ok(coin) if coin.denom != config.tx.denom => {
                errors.push(ValidationError::InvalidFee(format!(
                    "denom '{}' does not match tx.denom '{}'",
                    coin.denom, config.tx.denom
                )));
            }
            Ok(_) => {}
            Err(e) => errors.push(ValidationError::InvalidFee(e.to_string())),
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &'static str, value: &str, schemes: &[&str]) {
    match url::Url::parse(value) {
        Ok(url) if schemes.contains(&url.scheme()) => {}
        Ok(url) => errors.push(ValidationError::InvalidUrl {
            field,
            value: value.to_string(),
            reason: format!("scheme '{}' not one of {:?}", url.scheme(), schemes),
        }),
        Err(e) => errors.push(ValidationError::InvalidUrl {
            field,
            value: value.to_string(),
            reason: e.to_string(),
        }),
    }
}
