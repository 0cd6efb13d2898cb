//! Key management subsystem.
//!
//! # Data Flow
//! ```text
//! mnemonic / hex private key + password
//!     → manager.rs (derive, check password, hand out signers)
//!     → keystore.rs (KeyStore seam; MemoryKeyStore by default)
//! ```
//!
//! # Security Constraints
//! - Key material and passwords are never logged
//! - Every signer lookup re-checks the password

pub mod keystore;
pub mod manager;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::blockchain::types::SdkError;

pub use keystore::{KeyInfo, KeyStore, MemoryKeyStore};
pub use manager::KeyManager;

/// Supported signing algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SigningAlgo {
    /// secp256k1 with Ethereum addressing and keccak hashing.
    EthSecp256k1,
}

impl FromStr for SigningAlgo {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eth_secp256k1" => Ok(Self::EthSecp256k1),
            other => Err(SdkError::UnsupportedAlgo(other.to_string())),
        }
    }
}

impl fmt::Display for SigningAlgo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EthSecp256k1 => f.write_str("eth_secp256k1"),
        }
    }
}
