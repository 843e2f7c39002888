//! Storage collaborator traits.
//!
//! Backends execute [`Predicate`]s built by this crate; the core itself never
//! touches storage.
//!
//! # Implementations
//!
//! - `tokenkit-db-memory` - in-memory backend evaluating predicates directly
//!
//! # Concurrency
//!
//! Redeeming a one-time token (reset, invite) must find and delete in one
//! step; [`TokenStorage::take_one`] is that step.

use async_trait::async_trait;
use uuid::Uuid;

use crate::TokenResult;
use crate::predicate::Predicate;
use crate::types::{TokenRecord, UserRef};

/// A record together with its owner, as returned by a joined lookup.
#[derive(Debug, Clone)]
pub struct TokenMatch {
    pub record: TokenRecord,
    pub owner: UserRef,
}

/// Persistence for token records.
#[async_trait]
pub trait TokenStorage: Send + Sync {
    /// Stores a newly issued record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be stored.
    async fn insert(&self, record: &TokenRecord) -> TokenResult<()>;

    /// Returns the first record satisfying `predicate`, joined with its owner.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_one(&self, predicate: &Predicate) -> TokenResult<Option<TokenMatch>>;

    /// Returns every record satisfying `predicate`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_all(&self, predicate: &Predicate) -> TokenResult<Vec<TokenRecord>>;

    /// Deletes every record satisfying `predicate`, returning how many.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete_matching(&self, predicate: &Predicate) -> TokenResult<u64>;

    /// Atomically finds and deletes the first record satisfying `predicate`.
    ///
    /// Two concurrent calls with the same predicate never both succeed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn take_one(&self, predicate: &Predicate) -> TokenResult<Option<TokenMatch>>;
}

/// Read access to user records.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Looks up a user's current id and email.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_user(&self, id: Uuid) -> TokenResult<Option<UserRef>>;
}
