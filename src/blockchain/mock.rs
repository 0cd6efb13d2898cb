//! In-memory node used by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;

use alloy::consensus::TxEnvelope;
use alloy::eips::eip2718::Decodable2718;
use alloy::primitives::{keccak256, Address, TxHash, U256};
use async_trait::async_trait;

use crate::blockchain::rpc::ChainRpc;
use crate::blockchain::types::{SdkError, SdkResult, TxReceipt};

pub(crate) struct MockChain {
    pub chain_id: u64,
    pub gas_price: Mutex<u128>,
    pub block: AtomicU64,
    pub nonce: AtomicU64,
    pub balance: Mutex<U256>,
    pub sent: Mutex<Vec<Vec<u8>>>,
    pub receipts: Mutex<HashMap<TxHash, TxReceipt>>,
    pub known: Mutex<HashSet<TxHash>>,
    /// Fail this many sends with a transport error before accepting.
    pub transport_failures: AtomicU32,
    /// Transport failures still land the transaction in the pool.
    pub deliver_on_failure: AtomicBool,
    /// Fail this many `block_number` calls with a transport error.
    pub block_failures: AtomicU32,
    /// Reject every send with this node error.
    pub reject: Mutex<Option<String>>,
    /// Mine every accepted transaction into the next block.
    pub auto_mine: AtomicBool,
    /// Outcome of auto-mined transactions.
    pub mine_success: AtomicBool,
    pub nonce_queries: AtomicU32,
    pub send_attempts: AtomicU32,
}

impl MockChain {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            gas_price: Mutex::new(1),
            block: AtomicU64::new(100),
            nonce: AtomicU64::new(0),
            balance: Mutex::new(U256::from(1_000_000u64)),
            sent: Mutex::new(Vec::new()),
            receipts: Mutex::new(HashMap::new()),
            known: Mutex::new(HashSet::new()),
            transport_failures: AtomicU32::new(0),
            deliver_on_failure: AtomicBool::new(false),
            block_failures: AtomicU32::new(0),
            reject: Mutex::new(None),
            auto_mine: AtomicBool::new(false),
            mine_success: AtomicBool::new(true),
            nonce_queries: AtomicU32::new(0),
            send_attempts: AtomicU32::new(0),
        }
    }

    pub fn set_gas_price(&self, price: u128) {
        *self.gas_price.lock().unwrap() = price;
    }

    pub fn sent_envelopes(&self) -> Vec<TxEnvelope> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|raw| TxEnvelope::decode_2718(&mut raw.as_slice()).unwrap())
            .collect()
    }

    pub fn mine(&self, hash: TxHash, success: bool) {
        let block = self.block.fetch_add(1, Ordering::SeqCst) + 1;
        self.receipts.lock().unwrap().insert(
            hash,
            TxReceipt {
                hash,
                block_number: Some(block),
                success,
                gas_used: 21_000,
                contract_address: None,
            },
        );
    }

    fn accept(&self, raw: &[u8], hash: TxHash) {
        self.sent.lock().unwrap().push(raw.to_vec());
        self.known.lock().unwrap().insert(hash);
        self.nonce.fetch_add(1, Ordering::SeqCst);
        if self.auto_mine.load(Ordering::SeqCst) {
            self.mine(hash, self.mine_success.load(Ordering::SeqCst));
        }
    }
}

#[async_trait]
impl ChainRpc for MockChain {
    async fn chain_id(&self) -> SdkResult<u64> {
        Ok(self.chain_id)
    }

    async fn block_number(&self) -> SdkResult<u64> {
        if self
            .block_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(SdkError::Rpc("connection reset".into()));
        }
        Ok(self.block.load(Ordering::SeqCst))
    }

    async fn balance(&self, _address: Address) -> SdkResult<U256> {
        Ok(*self.balance.lock().unwrap())
    }

    async fn nonce(&self, _address: Address) -> SdkResult<u64> {
        self.nonce_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.nonce.load(Ordering::SeqCst))
    }

    async fn gas_price(&self) -> SdkResult<u128> {
        Ok(*self.gas_price.lock().unwrap())
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> SdkResult<TxHash> {
        self.send_attempts.fetch_add(1, Ordering::SeqCst);
        let hash = keccak256(raw);
        if self
            .transport_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            if self.deliver_on_failure.load(Ordering::SeqCst) {
                self.accept(raw, hash);
            }
            return Err(SdkError::Rpc("connection reset".into()));
        }
        if let Some(reason) = self.reject.lock().unwrap().clone() {
            return Err(SdkError::Broadcast(reason));
        }
        if self.known.lock().unwrap().contains(&hash) {
            return Err(SdkError::Broadcast("already known".into()));
        }

        self.accept(raw, hash);
        Ok(hash)
    }

    async fn transaction_receipt(&self, hash: TxHash) -> SdkResult<Option<TxReceipt>> {
        Ok(self.receipts.lock().unwrap().get(&hash).cloned())
    }

    async fn has_transaction(&self, hash: TxHash) -> SdkResult<bool> {
        Ok(self.known.lock().unwrap().contains(&hash))
    }
}
