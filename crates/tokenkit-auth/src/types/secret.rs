//! The user-facing half of an issued token.

use std::fmt;

use crate::types::TokenRecord;

/// Secret delivered to the user. Never persisted for hashed or encrypted
/// contexts.
///
/// `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub enum TokenSecret {
    /// Raw bytes, used as-is (e.g. a session cookie value).
    Raw([u8; 32]),
    /// URL-safe base64 text, suitable for links.
    Encoded(String),
}

impl TokenSecret {
    /// The bytes to present back to verification.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Raw(bytes) => bytes,
            Self::Encoded(text) => text.as_bytes(),
        }
    }

    /// The encoded text, for text-transmitted contexts.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Raw(_) => None,
            Self::Encoded(text) => Some(text),
        }
    }

    /// Consumes the secret, returning the encoded text if there is one.
    #[must_use]
    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Raw(_) => None,
            Self::Encoded(text) => Some(text),
        }
    }
}

impl AsRef<[u8]> for TokenSecret {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl fmt::Debug for TokenSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw(_) => f.write_str("TokenSecret::Raw(<redacted>)"),
            Self::Encoded(_) => f.write_str("TokenSecret::Encoded(<redacted>)"),
        }
    }
}

/// Result of issuing a token: what to deliver and what to persist.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub secret: TokenSecret,
    pub record: TokenRecord,
}
