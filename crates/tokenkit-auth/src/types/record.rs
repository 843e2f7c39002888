//! Persisted token record.
//!
//! # Security
//!
//! - Hashed-context records keep only a SHA-256 digest; the secret is gone
//!   once it has been handed to the caller
//! - Encrypted-context records keep ciphertext for display and a digest for
//!   lookup; ciphertext never takes part in equality matching

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::codec::serde_b64;
use crate::context::TokenContext;

/// Caller-interpreted linkage carried by a token (e.g. `account_id`).
pub type Annotations = Map<String, Value>;

/// Well-known annotation: the account an invite belongs to.
pub const ACCOUNT_ID: &str = "account_id";

/// Well-known annotation: the user being impersonated.
pub const IMPERSONATED_USER_ID: &str = "impersonated_user_id";

/// SHA-256 digest of a token secret.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenDigest([u8; 32]);

impl TokenDigest {
    /// Wraps raw digest bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex form, as persisted.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses the hex form.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not 64 hex characters.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for TokenDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenDigest({})", self.to_hex())
    }
}

impl Serialize for TokenDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for TokenDigest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Output of the encryption collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ciphertext {
    /// Identifier of the key that produced this ciphertext.
    pub key_id: String,
    /// Per-encryption nonce.
    #[serde(with = "serde_b64")]
    pub nonce: Vec<u8>,
    /// Encrypted payload including any authentication tag.
    #[serde(with = "serde_b64")]
    pub data: Vec<u8>,
}

/// What is persisted for a token, by encoding.
///
/// A digest can only ever be compared with a digest: the ciphertext of an
/// encrypted token is reachable solely through [`StoredValue::Encrypted`].
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "encoding", rename_all = "snake_case")]
pub enum StoredValue {
    /// Raw random bytes (session, impersonation).
    Raw {
        #[serde(with = "serde_b64")]
        bytes: Vec<u8>,
    },
    /// One-way digest only.
    Hashed { digest: TokenDigest },
    /// Reversible ciphertext plus an indexable digest.
    Encrypted {
        ciphertext: Ciphertext,
        digest: TokenDigest,
    },
}

impl StoredValue {
    /// Returns the lookup digest, if this value has one.
    #[must_use]
    pub fn digest(&self) -> Option<&TokenDigest> {
        match self {
            Self::Raw { .. } => None,
            Self::Hashed { digest } | Self::Encrypted { digest, .. } => Some(digest),
        }
    }

    /// Returns the ciphertext of an encrypted value.
    #[must_use]
    pub fn ciphertext(&self) -> Option<&Ciphertext> {
        match self {
            Self::Encrypted { ciphertext, .. } => Some(ciphertext),
            _ => None,
        }
    }
}

impl fmt::Debug for StoredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // raw values are live session credentials
            Self::Raw { bytes } => write!(f, "Raw(<{} bytes redacted>)", bytes.len()),
            Self::Hashed { digest } => f.debug_tuple("Hashed").field(digest).finish(),
            Self::Encrypted { ciphertext, digest } => f
                .debug_struct("Encrypted")
                .field("key_id", &ciphertext.key_id)
                .field("digest", digest)
                .finish(),
        }
    }
}

/// A token as handed to the storage collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    /// Storage identity.
    pub id: Uuid,

    /// Context the token was issued for.
    pub context: TokenContext,

    /// Encoded secret.
    pub stored: StoredValue,

    /// Address the token was delivered to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_to: Option<String>,

    /// Caller-supplied linkage.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub annotations: Annotations,

    /// User the token was issued for.
    pub owner_user_id: Uuid,

    /// Issuance time; validity is measured from here.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl TokenRecord {
    /// Returns `true` if the annotation `key` is present and equal to `value`.
    #[must_use]
    pub fn has_annotation(&self, key: &str, value: &Value) -> bool {
        self.annotations.get(key) == Some(value)
    }

    /// The `account_id` annotation as a UUID, if present and well formed.
    #[must_use]
    pub fn account_id(&self) -> Option<Uuid> {
        self.uuid_annotation(ACCOUNT_ID)
    }

    /// The `impersonated_user_id` annotation as a UUID.
    #[must_use]
    pub fn impersonated_user_id(&self) -> Option<Uuid> {
        self.uuid_annotation(IMPERSONATED_USER_ID)
    }

    fn uuid_annotation(&self, key: &str) -> Option<Uuid> {
        self.annotations
            .get(key)
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok())
    }
}
