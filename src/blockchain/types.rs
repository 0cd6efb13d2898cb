//! Chain-facing types and error definitions.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::{Address, Bytes, TxHash, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result code of a successfully executed transaction.
pub const CODE_TYPE_OK: u32 = 0;

/// Result code reported for a reverted transaction.
pub const CODE_REVERTED: u32 = 1;

/// Errors returned by client operations.
///
/// Every variant belongs to a codespace and carries a stable numeric code so
/// callers can branch on the error class without matching on messages.
#[derive(Debug, Error)]
pub enum SdkError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    #[error("Key '{0}' not found")]
    KeyNotFound(String),

    #[error("Key '{0}' already exists")]
    KeyExists(String),

    #[error("Wrong password for key '{0}'")]
    WrongPassword(String),

    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    /// Invalid private key format or derivation error.
    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    #[error("Unsupported signing algorithm: {0}")]
    UnsupportedAlgo(String),

    #[error("Password must be at least {0} characters")]
    WeakPassword(usize),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid coin '{0}'")]
    InvalidCoin(String),

    #[error("Gas limit {provided} is below the intrinsic gas {required}")]
    GasTooLow { required: u64, provided: u64 },

    #[error("Fee gas price {offered} is below the network gas price {required}")]
    InsufficientFee { required: u128, offered: u128 },

    /// Gas price exceeded maximum allowed.
    #[error("Gas price {current_gwei} gwei exceeds maximum {max_gwei} gwei")]
    GasPriceTooHigh { current_gwei: u64, max_gwei: u64 },

    #[error("Memo is {len} bytes, maximum is {max}")]
    MemoTooLong { len: usize, max: usize },

    #[error("Signing failed: {0}")]
    Signing(String),

    /// The node rejected the transaction.
    #[error("Broadcast rejected: {0}")]
    Broadcast(String),

    #[error("Node returned hash {returned}, expected {expected}")]
    HashMismatch { expected: TxHash, returned: TxHash },

    #[error("Transaction {0} not found")]
    TxNotFound(TxHash),

    #[error("Transaction {0} is pending")]
    TxPending(TxHash),

    /// Transaction was not confirmed within expected time.
    #[error("Transaction not confirmed after {0} seconds")]
    ConfirmationTimeout(u64),

    /// Transaction was reverted on-chain.
    #[error("Transaction {hash} reverted: {log}")]
    Reverted { hash: TxHash, log: String },

    #[error("Subscription error: {0}")]
    Subscription(String),

    #[error("Subscription {0} not found")]
    SubscriptionNotFound(uuid::Uuid),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SdkError {
    /// The error class this error belongs to.
    pub fn codespace(&self) -> &'static str {
        match self {
            SdkError::Rpc(_) | SdkError::Timeout(_) | SdkError::ChainMismatch { .. } => "rpc",
            SdkError::KeyNotFound(_)
            | SdkError::KeyExists(_)
            | SdkError::WrongPassword(_)
            | SdkError::InvalidMnemonic(_)
            | SdkError::InvalidKey(_)
            | SdkError::UnsupportedAlgo(_)
            | SdkError::WeakPassword(_) => "keys",
            SdkError::Subscription(_) | SdkError::SubscriptionNotFound(_) => "events",
            SdkError::Config(_) => "config",
            _ => "tx",
        }
    }

    /// Stable code within the codespace.
    pub fn code(&self) -> u32 {
        match self {
            SdkError::Rpc(_) => 1,
            SdkError::Timeout(_) => 2,
            SdkError::ChainMismatch { .. } => 3,

            SdkError::KeyNotFound(_) => 1,
            SdkError::KeyExists(_) => 2,
            SdkError::WrongPassword(_) => 3,
            SdkError::InvalidMnemonic(_) => 4,
            SdkError::InvalidKey(_) => 5,
            SdkError::UnsupportedAlgo(_) => 6,
            SdkError::WeakPassword(_) => 7,

            SdkError::InvalidRequest(_) => 1,
            SdkError::GasTooLow { .. } => 2,
            SdkError::InsufficientFee { .. } => 3,
            SdkError::GasPriceTooHigh { .. } => 4,
            SdkError::MemoTooLong { .. } => 5,
            SdkError::Broadcast(_) => 6,
            SdkError::HashMismatch { .. } => 7,
            SdkError::TxNotFound(_) => 8,
            SdkError::TxPending(_) => 9,
            SdkError::ConfirmationTimeout(_) => 10,
            SdkError::Reverted { .. } => 11,
            SdkError::Signing(_) => 12,
            SdkError::InvalidCoin(_) => 13,

            SdkError::Subscription(_) => 1,
            SdkError::SubscriptionNotFound(_) => 2,

            SdkError::Config(_) => 1,
        }
    }

    /// Transport failures and timeouts are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SdkError::Rpc(_) | SdkError::Timeout(_))
    }
}

/// Result type for client operations.
pub type SdkResult<T> = Result<T, SdkError>;

/// An amount of a single denomination, e.g. `200000wei`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: U256,
}

impl Coin {
    pub fn new(amount: impl Into<U256>, denom: impl Into<String>) -> Self {
        Self {
            denom: denom.into(),
            amount: amount.into(),
        }
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

impl FromStr for Coin {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (amount, denom) = s.split_at(split);

        if amount.is_empty() || !is_valid_denom(denom) {
            return Err(SdkError::InvalidCoin(s.to_string()));
        }
        let amount =
            U256::from_str_radix(amount, 10).map_err(|_| SdkError::InvalidCoin(s.to_string()))?;

        Ok(Self {
            denom: denom.to_string(),
            amount,
        })
    }
}

fn is_valid_denom(denom: &str) -> bool {
    let mut chars = denom.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (2..=128).contains(&denom.len())
        && first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | ':' | '.' | '_' | '-'))
}

/// Parse a comma-separated list of coins (`"10wei,5ugas"`).
pub fn parse_coins(s: &str) -> SdkResult<Vec<Coin>> {
    if s.trim().is_empty() {
        return Ok(Vec::new());
    }
    s.split(',').map(str::parse).collect()
}

/// How long a submission waits before returning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BroadcastMode {
    /// Return as soon as the transaction is handed to the node.
    Async,
    /// Return once the node has accepted the transaction into its pool.
    #[default]
    Sync,
    /// Return once the transaction is confirmed on chain.
    Commit,
}

impl FromStr for BroadcastMode {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "async" => Ok(Self::Async),
            "sync" => Ok(Self::Sync),
            "commit" => Ok(Self::Commit),
            other => Err(SdkError::InvalidRequest(format!("unknown broadcast mode '{}'", other))),
        }
    }
}

impl fmt::Display for BroadcastMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Async => "async",
            Self::Sync => "sync",
            Self::Commit => "commit",
        };
        f.write_str(s)
    }
}

/// Transaction metadata shared by every submission.
#[derive(Debug, Clone, Default)]
pub struct BaseTx {
    /// Name of the signing key in the key store.
    pub from: String,
    /// Password of the signing key.
    pub password: String,
    /// Gas limit; falls back to `tx.default_gas`.
    pub gas: Option<u64>,
    /// Fee budget; falls back to `tx.fee`.
    pub fee: Option<Coin>,
    pub memo: String,
    /// Broadcast mode; falls back to `tx.broadcast_mode`.
    pub mode: Option<BroadcastMode>,
}

impl BaseTx {
    pub fn new(from: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    pub fn with_gas(mut self, gas: u64) -> Self {
        self.gas = Some(gas);
        self
    }

    pub fn with_fee(mut self, fee: Coin) -> Self {
        self.fee = Some(fee);
        self
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = memo.into();
        self
    }

    pub fn with_mode(mut self, mode: BroadcastMode) -> Self {
        self.mode = Some(mode);
        self
    }
}

/// The payload of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxMsg {
    /// Native token transfer.
    Transfer { to: Address, amount: U256 },
    /// Contract call.
    Call { to: Address, value: U256, input: Bytes },
    /// Contract deployment.
    Deploy { value: U256, code: Bytes },
}

impl TxMsg {
    /// Destination address; `None` for deployments.
    pub fn to(&self) -> Option<Address> {
        match self {
            TxMsg::Transfer { to, .. } | TxMsg::Call { to, .. } => Some(*to),
            TxMsg::Deploy { .. } => None,
        }
    }

    pub fn value(&self) -> U256 {
        match self {
            TxMsg::Transfer { amount, .. } => *amount,
            TxMsg::Call { value, .. } | TxMsg::Deploy { value, .. } => *value,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TxMsg::Transfer { .. } => "transfer",
            TxMsg::Call { .. } => "call",
            TxMsg::Deploy { .. } => "deploy",
        }
    }
}

/// Outcome of a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxResult {
    pub hash: TxHash,
    pub mode: BroadcastMode,
    pub gas_wanted: u64,
    /// Set in commit mode only.
    pub height: Option<u64>,
    /// Set in commit mode only.
    pub gas_used: Option<u64>,
}

/// On-chain account state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    pub address: Address,
    pub balance: Coin,
    pub nonce: u64,
}

/// The parts of a transaction receipt the client relies on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxReceipt {
    pub hash: TxHash,
    pub block_number: Option<u64>,
    pub success: bool,
    pub gas_used: u64,
    pub contract_address: Option<Address>,
}

/// Execution result of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecResult {
    pub code: u32,
    pub log: String,
    pub gas_used: u64,
}

impl ExecResult {
    pub fn is_ok(&self) -> bool {
        self.code == CODE_TYPE_OK
    }
}

/// Answer to a transaction query by hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultQueryTx {
    pub hash: TxHash,
    pub height: u64,
    pub result: ExecResult,
}

impl From<TxReceipt> for ResultQueryTx {
    fn from(receipt: TxReceipt) -> Self {
        let result = if receipt.success {
            ExecResult {
                code: CODE_TYPE_OK,
                log: String::new(),
                gas_used: receipt.gas_used,
            }
        } else {
            ExecResult {
                code: CODE_REVERTED,
                log: "execution reverted".to_string(),
                gas_used: receipt.gas_used,
            }
        };
        Self {
            hash: receipt.hash,
            height: receipt.block_number.unwrap_or_default(),
            result,
        }
    }
}

/// Transaction confirmation status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationStatus {
    /// Transaction is pending in mempool.
    Pending,
    /// Transaction has been mined but not enough confirmations.
    Confirming { current: u32, required: u32 },
    /// Transaction is confirmed with required block depth.
    Confirmed { block_number: u64, gas_used: u64 },
    /// Transaction failed or was dropped.
    Failed(String),
}
