//! Key recovery, import and signer lookup.

use std::sync::Arc;

use alloy::primitives::{keccak256, Address, B256};
use alloy::signers::local::coins_bip39::English;
use alloy::signers::local::{MnemonicBuilder, PrivateKeySigner};
use alloy::signers::{Signature, Signer};

use crate::blockchain::types::{SdkError, SdkResult};
use crate::config::KeysConfig;
use crate::keys::keystore::{KeyInfo, KeyStore};
use crate::keys::SigningAlgo;

/// Named keys guarded by passwords.
#[derive(Clone)]
pub struct KeyManager {
    store: Arc<dyn KeyStore>,
    algo: SigningAlgo,
    min_password_len: usize,
}

impl KeyManager {
    /// Create a key manager over the given store.
    pub fn new(store: Arc<dyn KeyStore>, config: &KeysConfig) -> SdkResult<Self> {
        Ok(Self {
            store,
            algo: config.algo.parse()?,
            min_password_len: config.min_password_len,
        })
    }

    /// Recover the first account (`m/44'/60'/0'/0/0`) of a mnemonic.
    pub fn recover(&self, name: &str, password: &str, mnemonic: &str) -> SdkResult<Address> {
        self.recover_at(name, password, mnemonic, 0)
    }

    /// Recover the account at `m/44'/60'/0'/0/{index}`.
    pub fn recover_at(
        &self,
        name: &str,
        password: &str,
        mnemonic: &str,
        index: u32,
    ) -> SdkResult<Address> {
        self.check_new_key(name, password)?;

        let signer = MnemonicBuilder::<English>::default()
            .phrase(mnemonic.trim())
            .index(index)
            .map_err(|e| SdkError::InvalidMnemonic(e.to_string()))?
            .build()
            .map_err(|e| SdkError::InvalidMnemonic(e.to_string()))?;

        self.store_signer(name, password, &signer)
    }

    /// Import a hex-encoded private key (with or without 0x prefix).
    pub fn import_private_key(
        &self,
        name: &str,
        password: &str,
        private_key_hex: &str,
    ) -> SdkResult<Address> {
        self.check_new_key(name, password)?;

        let key_hex = private_key_hex.strip_prefix("0x").unwrap_or(private_key_hex);
        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| SdkError::InvalidKey(format!("Invalid private key format: {}", e)))?;

        self.store_signer(name, password, &signer)
    }

    /// Address of a stored key.
    pub fn show(&self, name: &str) -> SdkResult<Address> {
        self.store
            .read(name)
            .map(|info| info.address)
            .ok_or_else(|| SdkError::KeyNotFound(name.to_string()))
    }

    /// All stored keys, sorted by name.
    pub fn list(&self) -> Vec<(String, Address)> {
        let mut keys: Vec<_> = self
            .store
            .list()
            .into_iter()
            .map(|info| (info.name, info.address))
            .collect();
        keys.sort();
        keys
    }

    /// Remove a key after checking its password.
    pub fn delete(&self, name: &str, password: &str) -> SdkResult<()> {
        self.unlock(name, password)?;
        self.store.delete(name)?;
        tracing::info!(name = %name, "Key deleted");
        Ok(())
    }

    /// Unlock a key for signing.
    pub fn signer(&self, name: &str, password: &str) -> SdkResult<PrivateKeySigner> {
        let info = self.unlock(name, password)?;
        PrivateKeySigner::from_bytes(&info.secret).map_err(|e| SdkError::InvalidKey(e.to_string()))
    }

    /// Sign arbitrary message bytes (with Ethereum prefix).
    pub async fn sign_message(
        &self,
        name: &str,
        password: &str,
        message: &[u8],
    ) -> SdkResult<Signature> {
        self.signer(name, password)?
            .sign_message(message)
            .await
            .map_err(|e| SdkError::Signing(format!("Message signing failed: {}", e)))
    }

    fn check_new_key(&self, name: &str, password: &str) -> SdkResult<()> {
        if name.trim().is_empty() {
            return Err(SdkError::InvalidRequest("key name must not be empty".to_string()));
        }
        if password.chars().count() < self.min_password_len {
            return Err(SdkError::WeakPassword(self.min_password_len));
        }
        if self.store.has(name) {
            return Err(SdkError::KeyExists(name.to_string()));
        }
        Ok(())
    }

    fn store_signer(
        &self,
        name: &str,
        password: &str,
        signer: &PrivateKeySigner,
    ) -> SdkResult<Address> {
        let salt: [u8; 16] = rand::random();
        let address = signer.address();

        self.store.write(KeyInfo {
            name: name.to_string(),
            address,
            algo: self.algo,
            secret: signer.to_bytes(),
            salt,
            password_digest: password_digest(&salt, password),
        })?;

        tracing::info!(name = %name, address = %address, algo = %self.algo, "Key stored");
        Ok(address)
    }

    fn unlock(&self, name: &str, password: &str) -> SdkResult<KeyInfo> {
        let info = self
            .store
            .read(name)
            .ok_or_else(|| SdkError::KeyNotFound(name.to_string()))?;
        if password_digest(&info.salt, password) != info.password_digest {
            tracing::warn!(name = %name, "Rejected wrong key password");
            return Err(SdkError::WrongPassword(name.to_string()));
        }
        Ok(info)
    }
}

fn password_digest(salt: &[u8; 16], password: &str) -> B256 {
    let mut buf = Vec::with_capacity(salt.len() + password.len());
    buf.extend_from_slice(salt);
    buf.extend_from_slice(password.as_bytes());
    keccak256(buf)
}

impl std::fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyManager")
            .field("algo", &self.algo)
            .field("keys", &self.store.list().len())
            .finish()
    }
}
