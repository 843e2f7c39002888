//! Token subsystem configuration.
//!
//! Only key material and logging are configurable. Validity windows belong to
//! the token contract (see [`crate::policy`]) and have no knobs.
//!
//! # Example (TOML)
//!
//! ```toml
//! [encryption]
//! key_id = "2026-10"
//! key = "3f6c...64 hex chars..."
//!
//! [[encryption.retired_keys]]
//! key_id = "2026-04"
//! key = "base64-or-hex"
//!
//! [logging]
//! level = "info"
//! ```

use std::path::Path;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};

use crate::error::TokenError;

/// Environment variable overriding `encryption.key`.
pub const ENCRYPTION_KEY_ENV: &str = "TOKENKIT_ENCRYPTION_KEY";

/// AES-256 key size in bytes.
pub const KEY_SIZE: usize = 32;

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenKitConfig {
    /// Key material for encrypted contexts.
    pub encryption: EncryptionConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Keys for reversible (encrypted) token contexts.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EncryptionConfig {
    /// Identifier recorded in every new ciphertext.
    pub key_id: String,

    /// Current key, hex (64 chars) or base64 (32 bytes).
    /// When absent, encrypted contexts cannot be issued.
    pub key: Option<String>,

    /// Keys kept only for decrypting older ciphertext.
    pub retired_keys: Vec<RetiredKey>,
}

/// A key that may still decrypt but never encrypts.
#[derive(Clone, Deserialize, Serialize)]
pub struct RetiredKey {
    pub key_id: String,
    pub key: String,
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            key_id: "primary".to_string(),
            key: None,
            retired_keys: Vec::new(),
        }
    }
}

impl std::fmt::Debug for EncryptionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionConfig")
            .field("key_id", &self.key_id)
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .field(
                "retired_keys",
                &self
                    .retired_keys
                    .iter()
                    .map(|k| k.key_id.as_str())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level/filter when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration is not valid TOML for this schema.
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl From<ConfigError> for TokenError {
    fn from(err: ConfigError) -> Self {
        TokenError::configuration(err.to_string())
    }
}

impl TokenKitConfig {
    /// Parses configuration from TOML text and validates it.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed TOML and
    /// `ConfigError::InvalidValue` if validation fails.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, env-overrides and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let mut config: Self =
            toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Applies environment overrides.
    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var(ENCRYPTION_KEY_ENV)
            && !key.trim().is_empty()
        {
            tracing::debug!(key_id = %self.encryption.key_id, "Encryption key taken from environment");
            self.encryption.key = Some(key);
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - `encryption.key_id` is empty
    /// - any key is not 32 bytes of hex or base64
    /// - a retired key reuses the current or another retired key id
    /// - the logging level is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        let encryption = &self.encryption;

        if encryption.key_id.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "encryption.key_id cannot be empty".to_string(),
            ));
        }

        if let Some(key) = &encryption.key {
            decode_key(key)?;
        }

        let mut seen = vec![encryption.key_id.as_str()];
        for retired in &encryption.retired_keys {
            if seen.contains(&retired.key_id.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "Duplicate encryption key id: '{}'",
                    retired.key_id
                )));
            }
            seen.push(&retired.key_id);
            decode_key(&retired.key)?;
        }

        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "logging.level cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Decodes a 32-byte key given as hex or base64.
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` if the key is neither, or is not
/// exactly 32 bytes.
pub fn decode_key(key: &str) -> Result<[u8; KEY_SIZE], ConfigError> {
    let key = key.trim();
    let mut out = [0u8; KEY_SIZE];

    if key.len() == KEY_SIZE * 2 && hex::decode_to_slice(key, &mut out).is_ok() {
        return Ok(out);
    }

    let bytes = BASE64
        .decode(key)
        .map_err(|e| ConfigError::InvalidValue(format!("Invalid base64 key: {e}")))?;
    if bytes.len() != KEY_SIZE {
        return Err(ConfigError::InvalidValue(format!(
            "Key must be {} bytes, got {}",
            KEY_SIZE,
            bytes.len()
        )));
    }
    out.copy_from_slice(&bytes);
    Ok(out)
}
