//! Transaction building, signing, broadcast and confirmation monitoring.
//!
//! # Responsibilities
//! - Resolve gas limit, gas price and nonce for a submission
//! - Sign locally and compute the hash before broadcasting
//! - Broadcast with retries according to the broadcast mode
//! - Query and wait for transaction results by hash

use std::sync::Arc;
use std::time::Duration;

use alloy::eips::eip2718::Encodable2718;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Bytes, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use tokio::sync::Mutex;
use tokio::time::{interval, timeout};

use crate::blockchain::account::AccountCache;
use crate::blockchain::rpc::ChainRpc;
use crate::blockchain::types::{
    BaseTx, BroadcastMode, Coin, ConfirmationStatus, ResultQueryTx, SdkError, SdkResult, TxMsg,
    TxResult,
};
use crate::config::{ClientConfig, ConfirmationConfig, RetryConfig, TxConfig};
use crate::keys::KeyManager;
use crate::observability::metrics;
use crate::resilience::retry_with_backoff;

/// Intrinsic gas of every transaction.
pub const TX_BASE_GAS: u64 = 21_000;
/// Extra intrinsic gas of a contract creation.
pub const TX_CREATE_GAS: u64 = 32_000;
/// Gas per byte of call data (non-zero byte price, used for all bytes).
pub const TX_DATA_GAS_PER_BYTE: u64 = 16;

/// Minimum gas a transaction with this payload can be included with.
pub fn intrinsic_gas(msg: &TxMsg, payload: &[u8]) -> u64 {
    let create = if matches!(msg, TxMsg::Deploy { .. }) { TX_CREATE_GAS } else { 0 };
    TX_BASE_GAS + create + payload.len() as u64 * TX_DATA_GAS_PER_BYTE
}

/// Signs and broadcasts transactions for keys held by a `KeyManager`.
pub struct TxSubmitter {
    rpc: Arc<dyn ChainRpc>,
    keys: KeyManager,
    accounts: Arc<AccountCache>,
    chain_id: u64,
    tx: TxConfig,
    default_fee: Option<Coin>,
    confirmation: ConfirmationConfig,
    retries: RetryConfig,
    /// Serialises nonce reservation and broadcast.
    submit_lock: Mutex<()>,
}

impl TxSubmitter {
    pub fn new(
        rpc: Arc<dyn ChainRpc>,
        keys: KeyManager,
        accounts: Arc<AccountCache>,
        config: &ClientConfig,
    ) -> SdkResult<Self> {
        let default_fee = config.tx.fee.as_deref().map(str::parse).transpose()?;
        Ok(Self {
            rpc,
            keys,
            accounts,
            chain_id: config.chain.chain_id,
            tx: config.tx.clone(),
            default_fee,
            confirmation: config.confirmation.clone(),
            retries: config.retries.clone(),
            submit_lock: Mutex::new(()),
        })
    }

    /// Sign `msg` with the key named in `base` and broadcast it.
    pub async fn send(&self, msg: TxMsg, base: &BaseTx) -> SdkResult<TxResult> {
        let mode = base.mode.unwrap_or(self.tx.broadcast_mode);
        let result = self.send_inner(&msg, base, mode).await;
        metrics::record_tx_submitted(msg.kind(), mode, result.is_ok());
        result
    }

    async fn send_inner(&self, msg: &TxMsg, base: &BaseTx, mode: BroadcastMode) -> SdkResult<TxResult> {
        let payload = self.payload(msg, &base.memo)?;

        let gas_limit = base.gas.unwrap_or(self.tx.default_gas);
        let required = intrinsic_gas(msg, &payload);
        if gas_limit < required {
            return Err(SdkError::GasTooLow {
                required,
                provided: gas_limit,
            });
        }

        let signer = self.keys.signer(&base.from, &base.password)?;
        let from = signer.address();

        let hash = {
            let _guard = self.submit_lock.lock().await;

            let gas_price = self.gas_price(base.fee.as_ref(), gas_limit).await?;
            let nonce = self.accounts.next_nonce(from, self.rpc.as_ref()).await?;

            let submitted = async {
                let (raw, hash) = self.sign(signer, msg, payload, nonce, gas_limit, gas_price).await?;
                self.broadcast(&raw, hash, mode).await?;
                Ok::<_, SdkError>(hash)
            }
            .await;

            match submitted {
                Ok(hash) => {
                    tracing::info!(
                        tx_hash = %hash,
                        from = %from,
                        kind = msg.kind(),
                        nonce = nonce,
                        gas_limit = gas_limit,
                        gas_price = gas_price,
                        mode = %mode,
                        "Transaction broadcast"
                    );
                    hash
                }
                Err(e) => {
                    self.accounts.invalidate(&from);
                    tracing::warn!(from = %from, nonce = nonce, error = %e, "Transaction submission failed");
                    return Err(e);
                }
            }
        };

        let mut result = TxResult {
            hash,
            mode,
            gas_wanted: gas_limit,
            height: None,
            gas_used: None,
        };

        if mode == BroadcastMode::Commit {
            match wait_for_confirmation(self.rpc.as_ref(), hash, &self.confirmation).await? {
                ConfirmationStatus::Confirmed { block_number, gas_used } => {
                    result.height = Some(block_number);
                    result.gas_used = Some(gas_used);
                }
                ConfirmationStatus::Failed(log) => return Err(SdkError::Reverted { hash, log }),
                ConfirmationStatus::Pending | ConfirmationStatus::Confirming { .. } => {
                    return Err(SdkError::ConfirmationTimeout(self.confirmation.timeout_secs));
                }
            }
        }

        Ok(result)
    }

    /// Call data for `msg`. The memo travels as call data on transfers.
    fn payload(&self, msg: &TxMsg, memo: &str) -> SdkResult<Bytes> {
        if memo.len() > self.tx.max_memo_bytes {
            return Err(SdkError::MemoTooLong {
                len: memo.len(),
                max: self.tx.max_memo_bytes,
            });
        }

        match msg {
            TxMsg::Transfer { .. } => Ok(Bytes::copy_from_slice(memo.as_bytes())),
            TxMsg::Call { input, .. } | TxMsg::Deploy { code: input, .. } => {
                if !memo.is_empty() {
                    return Err(SdkError::InvalidRequest(
                        "memo is only supported on transfers".to_string(),
                    ));
                }
                if matches!(msg, TxMsg::Deploy { .. }) && input.is_empty() {
                    return Err(SdkError::InvalidRequest("deploy without code".to_string()));
                }
                Ok(input.clone())
            }
        }
    }

    /// Gas price in wei, from the fee budget when one is set, else from the node.
    async fn gas_price(&self, fee: Option<&Coin>, gas_limit: u64) -> SdkResult<u128> {
        let network_price = self.rpc.gas_price().await?;

        if let Some(fee) = fee.or(self.default_fee.as_ref()) {
            if fee.denom != self.tx.denom {
                return Err(SdkError::InvalidRequest(format!(
                    "fee denom '{}' does not match '{}'",
                    fee.denom, self.tx.denom
                )));
            }
            let offered = u128::try_from(fee.amount / U256::from(gas_limit))
                .map_err(|_| SdkError::InvalidCoin(fee.to_string()))?;
            if offered == 0 || offered < network_price {
                return Err(SdkError::InsufficientFee {
                    required: network_price,
                    offered,
                });
            }
            return Ok(offered);
        }

        let adjusted = (network_price as f64 * self.tx.gas_price_multiplier) as u128;
        let adjusted_gwei = adjusted / 1_000_000_000;
        if adjusted_gwei > self.tx.max_gas_price_gwei as u128 {
            return Err(SdkError::GasPriceTooHigh {
                current_gwei: adjusted_gwei as u64,
                max_gwei: self.tx.max_gas_price_gwei,
            });
        }
        Ok(adjusted.max(1))
    }

    /// Build and sign a legacy EIP-155 transaction. Returns the raw bytes and hash.
    async fn sign(
        &self,
        signer: PrivateKeySigner,
        msg: &TxMsg,
        payload: Bytes,
        nonce: u64,
        gas_limit: u64,
        gas_price: u128,
    ) -> SdkResult<(Vec<u8>, TxHash)> {
        let request = TransactionRequest::default()
            .with_from(signer.address())
            .with_nonce(nonce)
            .with_chain_id(self.chain_id)
            .with_gas_limit(gas_limit)
            .with_gas_price(gas_price)
            .with_value(msg.value());
        let request = match msg.to() {
            Some(to) => request.with_to(to).with_input(payload),
            None => request.with_deploy_code(payload),
        };

        let wallet = EthereumWallet::from(signer);
        let envelope = request
            .build(&wallet)
            .await
            .map_err(|e| SdkError::Signing(e.to_string()))?;

        let hash = *envelope.tx_hash();
        Ok((envelope.encoded_2718(), hash))
    }

    async fn broadcast(&self, raw: &[u8], hash: TxHash, mode: BroadcastMode) -> SdkResult<()> {
        let sent = retry_with_backoff(&self.retries, "broadcast", || {
            self.rpc.send_raw_transaction(raw)
        })
        .await;

        let returned = match sent {
            Ok(returned) => returned,
            // The pool already holds these exact signed bytes.
            Err(SdkError::Broadcast(reason)) if reason.contains("already known") => hash,
            Err(e) => return Err(e),
        };

        if mode != BroadcastMode::Async && returned != hash {
            return Err(SdkError::HashMismatch {
                expected: hash,
                returned,
            });
        }
        Ok(())
    }
}

/// Look up the result of a transaction by hash.
pub async fn query_tx(rpc: &dyn ChainRpc, hash: TxHash) -> SdkResult<ResultQueryTx> {
    match rpc.transaction_receipt(hash).await? {
        Some(receipt) => Ok(receipt.into()),
        None if rpc.has_transaction(hash).await? => Err(SdkError::TxPending(hash)),
        None => Err(SdkError::TxNotFound(hash)),
    }
}

/// Wait for a transaction to be confirmed.
///
/// A transaction in the latest block has one confirmation. Returns
/// `Confirmed` once `confirmation_blocks` is reached or `Failed` as soon as
/// a reverted receipt is seen.
pub async fn wait_for_confirmation(
    rpc: &dyn ChainRpc,
    hash: TxHash,
    policy: &ConfirmationConfig,
) -> SdkResult<ConfirmationStatus> {
    let required = policy.confirmation_blocks.max(1);
    let poll_interval = Duration::from_millis(policy.poll_interval_ms);

    let result = timeout(Duration::from_secs(policy.timeout_secs), async {
        let mut ticker = interval(poll_interval);

        loop {
            ticker.tick().await;

            let receipt = match rpc.transaction_receipt(hash).await {
                Ok(Some(r)) => r,
                Ok(None) => {
                    tracing::debug!(tx_hash = %hash, "Transaction pending");
                    continue;
                }
                Err(e) if e.is_retryable() => {
                    tracing::warn!(tx_hash = %hash, error = %e, "Receipt query failed, polling again");
                    continue;
                }
                Err(e) => return Err(e),
            };

            if !receipt.success {
                return Ok(ConfirmationStatus::Failed("execution reverted".to_string()));
            }

            let current_block = match rpc.block_number().await {
                Ok(n) => n,
                Err(e) if e.is_retryable() => {
                    tracing::warn!(tx_hash = %hash, error = %e, "Block number query failed, polling again");
                    continue;
                }
                Err(e) => return Err(e),
            };
            let tx_block = receipt.block_number.unwrap_or(current_block);
            let confirmations = current_block.saturating_sub(tx_block) + 1;

            if confirmations >= u64::from(required) {
                return Ok(ConfirmationStatus::Confirmed {
                    block_number: tx_block,
                    gas_used: receipt.gas_used,
                });
            }

            tracing::debug!(
                tx_hash = %hash,
                confirmations = confirmations,
                required = required,
                "Waiting for confirmations"
            );
        }
    })
    .await;

    match result {
        Ok(status) => status,
        Err(_) => Err(SdkError::ConfirmationTimeout(policy.timeout_secs)),
    }
}
