//! AES-256-GCM keyring for reversible tokens.
//!
//! Provides the encryption collaborator behind encrypted token contexts:
//! - Random 96-bit nonce per encryption, so equal secrets never produce equal
//!   ciphertext
//! - Key id recorded in every ciphertext for rotation support
//! - Lock-free reads while keys are added or rotated

use std::sync::Arc;

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use arc_swap::ArcSwap;
use dashmap::DashMap;
use rand::RngCore;
use tokenkit_auth::config::{EncryptionConfig, KEY_SIZE, decode_key};
use tokenkit_auth::{Ciphertext, TokenCipher, TokenError, TokenResult};

/// Nonce size for AES-256-GCM (96 bits)
const NONCE_SIZE: usize = 12;

/// Keyring errors.
#[derive(Debug, thiserror::Error)]
pub enum SecretsError {
    #[error("Key '{0}' not found in keyring")]
    UnknownKey(String),

    #[error("Cannot remove the current key '{0}'")]
    CurrentKey(String),

    #[error("No current encryption key configured")]
    NoKey,

    #[error("Invalid nonce size: expected {NONCE_SIZE}, got {0}")]
    InvalidNonce(usize),

    #[error("Encryption failed")]
    Encrypt,

    #[error("Decryption failed")]
    Decrypt,

    #[error("Invalid key material: {0}")]
    InvalidKey(String),
}

/// Key entry in the keyring
#[derive(Clone)]
struct KeyEntry {
    key: [u8; KEY_SIZE],
    created_at: time::OffsetDateTime,
}

/// Keyring with rotation support.
///
/// Encrypts with the current key; decrypts with whichever key the
/// ciphertext names.
#[derive(Clone)]
pub struct Keyring {
    current_key_id: Arc<ArcSwap<String>>,
    keys: Arc<DashMap<String, KeyEntry>>,
}

impl Keyring {
    /// Creates a keyring with a single current key.
    #[must_use]
    pub fn new(key: [u8; KEY_SIZE], key_id: &str) -> Self {
        let keys = DashMap::new();
        keys.insert(key_id.to_string(), KeyEntry::new(key));
        Self {
            current_key_id: Arc::new(ArcSwap::from_pointee(key_id.to_string())),
            keys: Arc::new(keys),
        }
    }

    /// Builds a keyring from configuration.
    ///
    /// Returns `Ok(None)` when no current key is configured.
    ///
    /// # Errors
    ///
    /// Returns `SecretsError::InvalidKey` if any configured key fails to decode.
    pub fn from_config(config: &EncryptionConfig) -> Result<Option<Self>, SecretsError> {
        let Some(key) = &config.key else {
            return Ok(None);
        };
        let keyring = Self::new(parse_key(key)?, &config.key_id);
        for retired in &config.retired_keys {
            keyring.add_key(parse_key(&retired.key)?, &retired.key_id);
        }
        tracing::debug!(
            key_id = %config.key_id,
            retired = config.retired_keys.len(),
            "Loaded encryption keyring"
        );
        Ok(Some(keyring))
    }

    /// Generate a new random key
    #[must_use]
    pub fn generate_key() -> [u8; KEY_SIZE] {
        let mut key = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut key);
        key
    }

    /// Current key id.
    #[must_use]
    pub fn current_key_id(&self) -> String {
        self.current_key_id.load().as_ref().clone()
    }

    /// Key ids in the keyring, oldest first.
    #[must_use]
    pub fn key_ids(&self) -> Vec<String> {
        let mut entries: Vec<_> = self
            .keys
            .iter()
            .map(|e| (e.value().created_at, e.key().clone()))
            .collect();
        entries.sort();
        entries.into_iter().map(|(_, id)| id).collect()
    }

    /// Adds a decryption-only key.
    pub fn add_key(&self, key: [u8; KEY_SIZE], key_id: &str) {
        self.keys.insert(key_id.to_string(), KeyEntry::new(key));
    }

    /// Makes `new_key` the current key. Older keys keep decrypting.
    pub fn rotate(&self, new_key: [u8; KEY_SIZE], new_key_id: &str) {
        self.add_key(new_key, new_key_id);
        let previous = self.current_key_id.swap(Arc::new(new_key_id.to_string()));
        tracing::info!(from = %previous, to = %new_key_id, "Rotated encryption key");
    }

    /// Removes a retired key. Ciphertext under it will no longer decrypt.
    ///
    /// # Errors
    ///
    /// Returns `SecretsError::CurrentKey` for the current key and
    /// `SecretsError::UnknownKey` if the id is absent.
    pub fn remove_key(&self, key_id: &str) -> Result<(), SecretsError> {
        if *self.current_key_id.load().as_ref() == key_id {
            return Err(SecretsError::CurrentKey(key_id.to_string()));
        }
        self.keys
            .remove(key_id)
            .map(|_| ())
            .ok_or_else(|| SecretsError::UnknownKey(key_id.to_string()))
    }

    /// Encrypts with the current key.
    ///
    /// # Errors
    ///
    /// Returns an error if the current key is missing or AES-GCM fails.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Ciphertext, SecretsError> {
        let key_id = self.current_key_id();
        let key = self
            .keys
            .get(&key_id)
            .map(|entry| entry.key)
            .ok_or(SecretsError::NoKey)?;

        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| SecretsError::InvalidKey(e.to_string()))?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);

        let data = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|_| SecretsError::Encrypt)?;

        Ok(Ciphertext {
            key_id,
            nonce: nonce_bytes.to_vec(),
            data,
        })
    }

    /// Decrypts with the key named by the ciphertext.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown keys, malformed nonces, or failed
    /// authentication.
    pub fn open(&self, ciphertext: &Ciphertext) -> Result<Vec<u8>, SecretsError> {
        let key = self
            .keys
            .get(&ciphertext.key_id)
            .map(|entry| entry.key)
            .ok_or_else(|| SecretsError::UnknownKey(ciphertext.key_id.clone()))?;

        if ciphertext.nonce.len() != NONCE_SIZE {
            return Err(SecretsError::InvalidNonce(ciphertext.nonce.len()));
        }

        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| SecretsError::InvalidKey(e.to_string()))?;

        cipher
            .decrypt(Nonce::from_slice(&ciphertext.nonce), ciphertext.data.as_ref())
            .map_err(|_| SecretsError::Decrypt)
    }
}

impl KeyEntry {
    fn new(key: [u8; KEY_SIZE]) -> Self {
        Self {
            key,
            created_at: time::OffsetDateTime::now_utc(),
        }
    }
}

/// Decodes a configured key, hex or base64.
///
/// # Errors
///
/// Returns `SecretsError::InvalidKey` for malformed or wrong-length keys.
pub fn parse_key(key: &str) -> Result<[u8; KEY_SIZE], SecretsError> {
    decode_key(key).map_err(|e| SecretsError::InvalidKey(e.to_string()))
}

/// Hex form of a key, as accepted by configuration.
#[must_use]
pub fn key_to_hex(key: &[u8; KEY_SIZE]) -> String {
    hex::encode(key)
}

impl TokenCipher for Keyring {
    fn encrypt(&self, plaintext: &[u8]) -> TokenResult<Ciphertext> {
        self.seal(plaintext)
            .map_err(|e| TokenError::encryption(e.to_string()))
    }

    fn decrypt(&self, ciphertext: &Ciphertext) -> TokenResult<Vec<u8>> {
        self.open(ciphertext)
            .map_err(|e| TokenError::decryption(e.to_string()))
    }
}

impl std::fmt::Debug for Keyring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keyring")
            .field("current_key_id", &self.current_key_id())
            .field("keyring_size", &"<redacted>")
            .finish()
    }
}
