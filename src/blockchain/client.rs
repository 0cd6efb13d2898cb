//! JSON-RPC client with timeout and failover.
//!
//! # Responsibilities
//! - Connect to the primary endpoint plus failovers
//! - Query chain state (block number, balances, nonces, receipts)
//! - Broadcast signed transactions
//! - Handle timeouts and network errors gracefully

use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;

use crate::blockchain::rpc::ChainRpc;
use crate::blockchain::types::{SdkError, SdkResult, TxReceipt};
use crate::config::ChainConfig;
use crate::observability::metrics;

/// Try each provider in order until one answers within the timeout.
macro_rules! with_failover {
    ($self:ident, $method:literal, |$provider:ident| $call:expr) => {{
        let started = Instant::now();
        let mut answer = None;
        for (i, $provider) in $self.providers.iter().enumerate() {
            match timeout($self.timeout_duration, $call).await {
                Ok(Ok(result)) => {
                    answer = Some(result);
                    break;
                }
                Ok(Err(e)) => {
                    tracing::warn!(provider_idx = i, method = $method, error = %e, "RPC error, trying next provider");
                }
                Err(_) => {
                    tracing::warn!(provider_idx = i, method = $method, "RPC timeout, trying next provider");
                }
            }
        }
        metrics::record_rpc_call($method, started.elapsed(), answer.is_some());
        answer.ok_or_else(|| SdkError::Rpc(format!("All RPC providers failed: {}", $method)))
    }};
}

/// JSON-RPC client wrapper with failover support.
#[derive(Clone)]
pub struct RpcClient {
    /// List of providers (primary + failovers).
    providers: Vec<Arc<dyn Provider + Send + Sync>>,
    config: ChainConfig,
    /// Per-attempt timeout.
    timeout_duration: Duration,
}

impl RpcClient {
    /// Create a new client. No network traffic happens here.
    pub fn new(config: ChainConfig) -> SdkResult<Self> {
        let timeout_duration = Duration::from_secs(config.rpc_timeout_secs);
        let mut providers = Vec::new();

        let primary_url: url::Url = config.rpc_url.parse().map_err(|e| {
            SdkError::Config(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        providers.push(Arc::new(ProviderBuilder::new().connect_http(primary_url)) as Arc<dyn Provider + Send + Sync>);

        for url_str in &config.failover_urls {
            if let Ok(url) = url_str.parse() {
                providers.push(Arc::new(ProviderBuilder::new().connect_http(url)) as Arc<dyn Provider + Send + Sync>);
            } else {
                tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL");
            }
        }

        tracing::debug!(
            rpc_url = %config.rpc_url,
            failovers = providers.len() - 1,
            "RPC client created"
        );

        Ok(Self {
            providers,
            config,
            timeout_duration,
        })
    }

    /// Verify the connected chain ID matches configuration.
    pub async fn verify_chain_id(&self) -> SdkResult<u64> {
        let chain_id = self.chain_id().await?;
        if chain_id != self.config.chain_id {
            return Err(SdkError::ChainMismatch {
                expected: self.config.chain_id,
                actual: chain_id,
            });
        }
        Ok(chain_id)
    }

    /// Check if the node is reachable.
    pub async fn is_healthy(&self) -> bool {
        self.block_number().await.is_ok()
    }
}

#[async_trait]
impl ChainRpc for RpcClient {
    async fn chain_id(&self) -> SdkResult<u64> {
        with_failover!(self, "eth_chainId", |provider| provider.get_chain_id())
    }

    async fn block_number(&self) -> SdkResult<u64> {
        with_failover!(self, "eth_blockNumber", |provider| provider.get_block_number())
    }

    async fn balance(&self, address: Address) -> SdkResult<U256> {
        with_failover!(self, "eth_getBalance", |provider| provider.get_balance(address))
    }

    async fn nonce(&self, address: Address) -> SdkResult<u64> {
        with_failover!(self, "eth_getTransactionCount", |provider| provider
            .get_transaction_count(address)
            .pending())
    }

    async fn gas_price(&self) -> SdkResult<u128> {
        with_failover!(self, "eth_gasPrice", |provider| provider.get_gas_price())
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> SdkResult<TxHash> {
        let started = Instant::now();
        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, provider.send_raw_transaction(raw)).await {
                Ok(Ok(pending)) => {
                    metrics::record_rpc_call("eth_sendRawTransaction", started.elapsed(), true);
                    return Ok(*pending.tx_hash());
                }
                // The node looked at the transaction and refused it; another node will too.
                Ok(Err(e)) if e.as_error_resp().is_some() => {
                    metrics::record_rpc_call("eth_sendRawTransaction", started.elapsed(), false);
                    return Err(SdkError::Broadcast(e.to_string()));
                }
                Ok(Err(e)) => {
                    tracing::warn!(provider_idx = i, error = %e, "Broadcast transport error, trying next provider");
                }
                Err(_) => {
                    tracing::warn!(provider_idx = i, "Broadcast timeout, trying next provider");
                }
            }
        }
        metrics::record_rpc_call("eth_sendRawTransaction", started.elapsed(), false);
        Err(SdkError::Rpc("All RPC providers failed: eth_sendRawTransaction".to_string()))
    }

    async fn transaction_receipt(&self, hash: TxHash) -> SdkResult<Option<TxReceipt>> {
        let receipt = with_failover!(self, "eth_getTransactionReceipt", |provider| provider
            .get_transaction_receipt(hash))?;

        Ok(receipt.map(|r| TxReceipt {
            hash: r.transaction_hash,
            block_number: r.block_number,
            success: r.status(),
            gas_used: r.gas_used,
            contract_address: r.contract_address,
        }))
    }

    async fn has_transaction(&self, hash: TxHash) -> SdkResult<bool> {
        let tx = with_failover!(self, "eth_getTransactionByHash", |provider| provider
            .get_transaction_by_hash(hash))?;
        Ok(tx.is_some())
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("rpc_url", &self.config.rpc_url)
            .field("chain_id", &self.config.chain_id)
            .field("timeout_secs", &self.config.rpc_timeout_secs)
            .finish()
    }
}
