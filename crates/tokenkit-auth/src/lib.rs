//! # tokenkit-auth
//!
//! Multi-context credential tokens: sessions, email confirmation, password
//! reset, email change, impersonation and account/team invitations.
//!
//! This crate provides:
//! - A fixed policy table mapping each context to its encoding, validity
//!   window and lookup rules
//! - A codec for the transmitted (URL-safe base64) and stored (raw, digest,
//!   ciphertext) forms of a token
//! - A factory issuing tokens and the records to persist
//! - A builder producing declarative lookup predicates for verification
//!
//! ## Overview
//!
//! Nothing here performs I/O. Issuance returns a record for the caller to
//! store; verification returns a [`Predicate`] for the caller's storage to
//! execute. A token that is unknown, expired or invalidated by an email change
//! is simply a predicate matching no rows.
//!
//! ## Modules
//!
//! - [`context`] - Token contexts and their wire tags
//! - [`policy`] - Per-context policy table
//! - [`codec`] - Random generation, base64url, SHA-256
//! - [`cipher`] - Encryption collaborator trait
//! - [`factory`] - Token issuance
//! - [`verify`] - Verification predicates and reveal
//! - [`predicate`] - Predicate data structure and evaluator
//! - [`service`] - Caller-facing facade
//! - [`storage`] - Storage collaborator traits
//! - [`config`] - Key material and logging configuration

pub mod cipher;
pub mod codec;
pub mod config;
pub mod context;
pub mod error;
pub mod factory;
pub mod policy;
pub mod predicate;
pub mod service;
pub mod storage;
pub mod types;
pub mod verify;

pub use cipher::{NoCipher, TokenCipher};
pub use config::{ConfigError, EncryptionConfig, TokenKitConfig};
pub use context::TokenContext;
pub use error::{ErrorCategory, TokenError};
pub use factory::IssueOptions;
pub use policy::{Encoding, TokenPolicy};
pub use predicate::{Constraint, Predicate, ValueMatch};
pub use service::TokenService;
pub use storage::{TokenMatch, TokenStorage, UserDirectory};
pub use types::{
    Annotations, Ciphertext, IssuedToken, StoredValue, TokenDigest, TokenRecord, TokenSecret,
    UserRef,
};
pub use verify::ContextSelector;

/// Type alias for token operation results.
pub type TokenResult<T> = Result<T, TokenError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use tokenkit_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::TokenResult;
    pub use crate::cipher::TokenCipher;
    pub use crate::context::TokenContext;
    pub use crate::error::TokenError;
    pub use crate::factory::IssueOptions;
    pub use crate::predicate::Predicate;
    pub use crate::service::TokenService;
    pub use crate::storage::{TokenMatch, TokenStorage, UserDirectory};
    pub use crate::types::{IssuedToken, TokenRecord, TokenSecret, UserRef};
    pub use crate::verify::ContextSelector;
}
