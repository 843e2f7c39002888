use anyhow::{Context, Result};
use serde_json::json;
use tokenkit_auth::codec;
use tokenkit_secrets::{Keyring, key_to_hex};

use crate::cli::OutputFormat;
use crate::output::print_value;

pub fn keygen(format: OutputFormat) -> Result<()> {
    let key = key_to_hex(&Keyring::generate_key());
    match format {
        OutputFormat::Json => print_value(&json!({ "key": key }), format),
        // Bare key so it can be pasted into TOKENKIT_ENCRYPTION_KEY.
        OutputFormat::Table => {
            println!("{key}");
            Ok(())
        }
    }
}

pub fn digest(token: &str, format: OutputFormat) -> Result<()> {
    let bytes = codec::decode_from_transmission(token.trim()).context("Not a valid token")?;
    print_value(
        &json!({ "digest": codec::digest(&bytes).to_hex() }),
        format,
    )
}
