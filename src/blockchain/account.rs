//! Account queries and the local nonce cache.

use alloy::primitives::Address;
use dashmap::DashMap;

use crate::blockchain::rpc::ChainRpc;
use crate::blockchain::types::{Account, Coin, SdkResult};

/// Query balance and nonce of an account.
pub async fn query_account(rpc: &dyn ChainRpc, address: Address, denom: &str) -> SdkResult<Account> {
    let (balance, nonce) = tokio::try_join!(rpc.balance(address), rpc.nonce(address))?;
    Ok(Account {
        address,
        balance: Coin::new(balance, denom),
        nonce,
    })
}

/// Next-nonce cache for accounts this client signs for.
///
/// With caching enabled the chain is asked once per account and later
/// nonces are handed out locally, so back-to-back submissions do not wait
/// for the previous one to reach the node's view.
#[derive(Debug, Default)]
pub struct AccountCache {
    enabled: bool,
    next_nonce: DashMap<Address, u64>,
}

impl AccountCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            next_nonce: DashMap::new(),
        }
    }

    /// Reserve the nonce for the next transaction from `address`.
    pub async fn next_nonce(&self, address: Address, rpc: &dyn ChainRpc) -> SdkResult<u64> {
        if self.enabled {
            if let Some(mut entry) = self.next_nonce.get_mut(&address) {
                let nonce = *entry;
                *entry += 1;
                return Ok(nonce);
            }
        }

        let nonce = rpc.nonce(address).await?;
        if self.enabled {
            self.next_nonce.insert(address, nonce + 1);
        }
        tracing::debug!(address = %address, nonce = nonce, "Nonce loaded from chain");
        Ok(nonce)
    }

    /// Forget the cached nonce so the next transaction re-reads it from chain.
    pub fn invalidate(&self, address: &Address) {
        if self.next_nonce.remove(address).is_some() {
            tracing::debug!(address = %address, "Nonce cache invalidated");
        }
    }

    /// Peek at the cached next nonce.
    pub fn cached(&self, address: &Address) -> Option<u64> {
        self.next_nonce.get(address).map(|r| *r.value())
    }
}
