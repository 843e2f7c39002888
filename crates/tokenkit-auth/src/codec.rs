//! Token codec.
//!
//! Converts between the transmitted form of a token (URL-safe, unpadded
//! base64 text) and its raw bytes, and computes the one-way digest used for
//! lookup. The reversible transform lives behind [`crate::cipher::TokenCipher`].

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::TokenResult;
use crate::error::TokenError;
use crate::types::TokenDigest;

/// Number of random bytes in every token.
pub const TOKEN_BYTES: usize = 32;

/// Length of an encoded token: 32 bytes of base64 without padding.
pub const ENCODED_TOKEN_LEN: usize = 43;

/// Generates a fresh token secret from the thread-local CSPRNG.
#[must_use]
pub fn generate_random_bytes() -> [u8; TOKEN_BYTES] {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// Encodes bytes for transmission (URL-safe base64, no padding).
#[must_use]
pub fn encode_for_transmission(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decodes transmitted token text.
///
/// Padding, characters outside the URL-safe alphabet and non-canonical
/// trailing bits are all rejected.
///
/// # Errors
///
/// Returns [`TokenError::Decode`] on malformed input.
pub fn decode_from_transmission(text: &str) -> TokenResult<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(text)
        .map_err(|e| TokenError::decode(e.to_string()))
}

/// Computes the SHA-256 digest of token bytes.
#[must_use]
pub fn digest(bytes: &[u8]) -> TokenDigest {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    TokenDigest::from_bytes(hasher.finalize().into())
}

/// Serde helpers storing byte vectors as standard base64 strings.
pub(crate) mod serde_b64 {
    use base64::{Engine, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}
