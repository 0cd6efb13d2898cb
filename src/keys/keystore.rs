//! Key storage backends.

use alloy::primitives::{Address, B256};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::blockchain::types::{SdkError, SdkResult};
use crate::keys::SigningAlgo;

/// A stored key with its password check material.
#[derive(Clone)]
pub struct KeyInfo {
    pub name: String,
    pub address: Address,
    pub algo: SigningAlgo,
    pub(crate) secret: B256,
    pub(crate) salt: [u8; 16],
    pub(crate) password_digest: B256,
}

impl std::fmt::Debug for KeyInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyInfo")
            .field("name", &self.name)
            .field("address", &self.address)
            .field("algo", &self.algo)
            .finish_non_exhaustive()
    }
}

/// Storage seam for named keys.
pub trait KeyStore: Send + Sync {
    /// Store a key. Fails with `KeyExists` if the name is taken.
    fn write(&self, info: KeyInfo) -> SdkResult<()>;

    fn read(&self, name: &str) -> Option<KeyInfo>;

    /// Remove a key. Fails with `KeyNotFound` if absent.
    fn delete(&self, name: &str) -> SdkResult<()>;

    fn has(&self, name: &str) -> bool;

    fn list(&self) -> Vec<KeyInfo>;
}

/// Process-local key store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryKeyStore {
    keys: DashMap<String, KeyInfo>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyStore for MemoryKeyStore {
    fn write(&self, info: KeyInfo) -> SdkResult<()> {
        match self.keys.entry(info.name.clone()) {
            Entry::Occupied(_) => Err(SdkError::KeyExists(info.name)),
            Entry::Vacant(slot) => {
                slot.insert(info);
                Ok(())
            }
        }
    }

    fn read(&self, name: &str) -> Option<KeyInfo> {
        self.keys.get(name).map(|r| r.value().clone())
    }

    fn delete(&self, name: &str) -> SdkResult<()> {
        self.keys
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| SdkError::KeyNotFound(name.to_string()))
    }

    fn has(&self, name: &str) -> bool {
        self.keys.contains_key(name)
    }

    fn list(&self) -> Vec<KeyInfo> {
        self.keys.iter().map(|r| r.value().clone()).collect()
    }
}
