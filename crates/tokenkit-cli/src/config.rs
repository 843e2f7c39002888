use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokenkit_auth::{TokenKitConfig, TokenService};
use tokenkit_secrets::Keyring;

/// Loads configuration from `path`, or defaults plus environment overrides.
pub fn load(path: Option<&Path>) -> Result<TokenKitConfig> {
    match path {
        Some(path) => TokenKitConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => {
            let mut config = TokenKitConfig::default();
            config.apply_env();
            config.validate().context("Invalid configuration")?;
            Ok(config)
        }
    }
}

/// Builds the token service, with encryption only when a key is configured.
pub fn service(config: &TokenKitConfig) -> Result<TokenService> {
    let keyring =
        Keyring::from_config(&config.encryption).context("Failed to load encryption keys")?;
    Ok(match keyring {
        Some(keyring) => TokenService::new(Arc::new(keyring)),
        None => {
            tracing::debug!("No encryption key configured; encrypted contexts unavailable");
            TokenService::without_encryption()
        }
    })
}
