//! `ChainClient`: one handle over keys, accounts, transactions and block
//! subscriptions.

use std::sync::Arc;

use alloy::primitives::{Address, TxHash};
use uuid::Uuid;

use crate::blockchain::account::{query_account, AccountCache};
use crate::blockchain::client::RpcClient;
use crate::blockchain::rpc::ChainRpc;
use crate::blockchain::transaction::{query_tx, wait_for_confirmation, TxSubmitter};
use crate::blockchain::types::{
    Account, BaseTx, ConfirmationStatus, ResultQueryTx, SdkError, SdkResult, TxMsg, TxResult,
};
use crate::config::{validate_config, ClientConfig};
use crate::events::{BlockSubscriber, NewBlockEvent, SubscriptionManager};
use crate::keys::{KeyManager, MemoryKeyStore};
use crate::tracker::TxTracker;

pub struct ChainClient {
    config: ClientConfig,
    rpc: Arc<dyn ChainRpc>,
    keys: KeyManager,
    submitter: TxSubmitter,
    subscriptions: SubscriptionManager,
}

impl ChainClient {
    /// Validate `config` and connect over JSON-RPC.
    ///
    /// A chain ID mismatch is logged, not returned.
    pub async fn new(config: ClientConfig) -> SdkResult<Self> {
        check_config(&config)?;

        let rpc = RpcClient::new(config.chain.clone())?;
        if config.chain.verify_chain_id {
            match rpc.verify_chain_id().await {
                Ok(chain_id) => tracing::info!(chain_id = chain_id, "Chain ID verified"),
                Err(e) => tracing::warn!(error = %e, "Could not verify chain ID"),
            }
        }

        Self::build(config, Arc::new(rpc))
    }

    /// Build a client over any `ChainRpc` implementation.
    pub fn with_rpc(config: ClientConfig, rpc: Arc<dyn ChainRpc>) -> SdkResult<Self> {
        check_config(&config)?;
        Self::build(config, rpc)
    }

    fn build(config: ClientConfig, rpc: Arc<dyn ChainRpc>) -> SdkResult<Self> {
        let keys = KeyManager::new(Arc::new(MemoryKeyStore::new()), &config.keys)?;
        let accounts = Arc::new(AccountCache::new(config.tx.cached));
        let submitter = TxSubmitter::new(rpc.clone(), keys.clone(), accounts.clone(), &config)?;
        let subscriptions = SubscriptionManager::new(BlockSubscriber::new(
            config.chain.ws_url.clone(),
            config.subscription.clone(),
            config.retries.clone(),
        ));

        tracing::info!(
            chain_id = config.chain.chain_id,
            rpc_url = %config.chain.rpc_url,
            broadcast_mode = %config.tx.broadcast_mode,
            "Chain client ready"
        );

        Ok(Self {
            config,
            rpc,
            keys,
            submitter,
            subscriptions,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn keys(&self) -> &KeyManager {
        &self.keys
    }

    /// Balance and nonce of `address`, in the configured denom.
    pub async fn query_account(&self, address: Address) -> SdkResult<Account> {
        query_account(self.rpc.as_ref(), address, &self.config.tx.denom).await
    }

    pub async fn send_tx(&self, msg: TxMsg, base: &BaseTx) -> SdkResult<TxResult> {
        self.submitter.send(msg, base).await
    }

    pub async fn query_tx(&self, hash: TxHash) -> SdkResult<ResultQueryTx> {
        query_tx(self.rpc.as_ref(), hash).await
    }

    /// Poll until `hash` reaches the configured confirmation depth.
    pub async fn wait_for_tx(&self, hash: TxHash) -> SdkResult<ConfirmationStatus> {
        wait_for_confirmation(self.rpc.as_ref(), hash, &self.config.confirmation).await
    }

    /// A fresh tracker bound to this client's node.
    pub fn tracker(&self) -> TxTracker {
        TxTracker::new(self.rpc.clone(), self.config.confirmation.clone())
    }

    /// Subscribe to new blocks on `chain.ws_url`.
    pub async fn subscribe_new_block<F>(&self, handler: F) -> SdkResult<Uuid>
    where
        F: Fn(NewBlockEvent) + Send + Sync + 'static,
    {
        self.subscriptions.subscribe(handler).await
    }

    pub async fn unsubscribe(&self, id: Uuid) -> SdkResult<()> {
        self.subscriptions.unsubscribe(id).await
    }

    pub fn subscriptions(&self) -> &SubscriptionManager {
        &self.subscriptions
    }

    /// Close every subscription.
    pub async fn shutdown(&self) {
        let count = self.subscriptions.len();
        self.subscriptions.unsubscribe_all().await;
        tracing::info!(subscriptions = count, "Chain client shut down");
    }
}

impl std::fmt::Debug for ChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainClient")
            .field("chain_id", &self.config.chain.chain_id)
            .field("rpc_url", &self.config.chain.rpc_url)
            .field("keys", &self.keys)
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

fn check_config(config: &ClientConfig) -> SdkResult<()> {
    validate_config(config).map_err(|errors| {
        let joined = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        SdkError::Config(joined)
    })
}
