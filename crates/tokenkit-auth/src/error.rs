//! Token error types.
//!
//! "Token not found" and "token expired" are deliberately absent: a
//! verification predicate that matches nothing is how those outcomes surface.

use std::fmt;

/// Errors that can occur while issuing, verifying or revealing tokens.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// The context tag matches no known policy.
    #[error("Unknown token context: {context}")]
    UnknownContext {
        /// The unrecognized context tag.
        context: String,
    },

    /// The presented token text is not valid URL-safe base64.
    #[error("Malformed token: {message}")]
    Decode {
        /// Description of the decoding failure.
        message: String,
    },

    /// Stored ciphertext could not be decrypted (tampered data or unknown key).
    #[error("Decryption failed: {message}")]
    Decryption {
        /// Description of the decryption failure.
        message: String,
    },

    /// The encryption collaborator failed to produce ciphertext.
    #[error("Encryption failed: {message}")]
    Encryption {
        /// Description of the encryption failure.
        message: String,
    },

    /// The record's context is not reversibly encrypted.
    #[error("Token context '{context}' is not reversible")]
    NotReversible {
        /// The record context.
        context: String,
    },

    /// Issuance or verification options do not fit the context.
    #[error("Invalid options: {message}")]
    InvalidOptions {
        /// Description of the problem.
        message: String,
    },

    /// The storage collaborator reported an error.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// Configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },
}

impl TokenError {
    /// Creates a new `UnknownContext` error.
    #[must_use]
    pub fn unknown_context(context: impl Into<String>) -> Self {
        Self::UnknownContext {
            context: context.into(),
        }
    }

    /// Creates a new `Decode` error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Creates a new `Decryption` error.
    #[must_use]
    pub fn decryption(message: impl Into<String>) -> Self {
        Self::Decryption {
            message: message.into(),
        }
    }

    /// Creates a new `Encryption` error.
    #[must_use]
    pub fn encryption(message: impl Into<String>) -> Self {
        Self::Encryption {
            message: message.into(),
        }
    }

    /// Creates a new `NotReversible` error.
    #[must_use]
    pub fn not_reversible(context: impl Into<String>) -> Self {
        Self::NotReversible {
            context: context.into(),
        }
    }

    /// Creates a new `InvalidOptions` error.
    #[must_use]
    pub fn invalid_options(message: impl Into<String>) -> Self {
        Self::InvalidOptions {
            message: message.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Returns `true` if the error means "the presented credential is invalid".
    ///
    /// Callers should answer these with a generic authentication failure and
    /// never tell the end user which step failed.
    #[must_use]
    pub fn is_invalid_credential(&self) -> bool {
        matches!(self, Self::Decode { .. } | Self::Decryption { .. })
    }

    /// Returns `true` if this points at a programming or deployment mistake.
    #[must_use]
    pub fn is_programmer_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownContext { .. }
                | Self::NotReversible { .. }
                | Self::InvalidOptions { .. }
                | Self::Configuration { .. }
        )
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnknownContext { .. } => ErrorCategory::Policy,
            Self::Decode { .. } => ErrorCategory::Credential,
            Self::Decryption { .. } => ErrorCategory::Crypto,
            Self::Encryption { .. } => ErrorCategory::Crypto,
            Self::NotReversible { .. } => ErrorCategory::Policy,
            Self::InvalidOptions { .. } => ErrorCategory::Validation,
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Configuration { .. } => ErrorCategory::Configuration,
        }
    }
}

/// Categories of token errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Context/policy lookup problems.
    Policy,
    /// The presented credential itself is malformed.
    Credential,
    /// Encryption or decryption faults.
    Crypto,
    /// Caller supplied options are inconsistent.
    Validation,
    /// Storage collaborator errors.
    Infrastructure,
    /// Configuration errors.
    Configuration,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Policy => write!(f, "policy"),
            Self::Credential => write!(f, "credential"),
            Self::Crypto => write!(f, "crypto"),
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}
