//! In-memory token storage.
//!
//! Executes [`Predicate`]s by evaluating them record by record, joining each
//! record with its owner from the in-memory user table. Intended for tests,
//! local tooling and single-process deployments.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokenkit_auth::{
    Predicate, TokenError, TokenMatch, TokenRecord, TokenResult, TokenStorage, UserDirectory,
    UserRef,
};
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory token and user store.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStore {
    tokens: Arc<RwLock<HashMap<Uuid, TokenRecord>>>,
    users: Arc<RwLock<HashMap<Uuid, UserRef>>>,
}

impl MemoryTokenStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a user.
    pub async fn upsert_user(&self, user: UserRef) {
        self.users.write().await.insert(user.id, user);
    }

    /// Changes a user's email, which invalidates email-matched tokens.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the user does not exist.
    pub async fn update_email(&self, user_id: Uuid, email: impl Into<String>) -> TokenResult<()> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(&user_id)
            .ok_or_else(|| TokenError::storage(format!("user {user_id} not found")))?;
        user.email = email.into();
        Ok(())
    }

    /// Number of stored token records.
    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }

    /// Returns `true` if no token records are stored.
    pub async fn is_empty(&self) -> bool {
        self.tokens.read().await.is_empty()
    }

    fn first_match<'a>(
        tokens: &'a HashMap<Uuid, TokenRecord>,
        users: &HashMap<Uuid, UserRef>,
        predicate: &Predicate,
    ) -> Option<(&'a TokenRecord, UserRef)> {
        // Oldest first, so results do not depend on hash order.
        let mut candidates: Vec<_> = tokens.values().collect();
        candidates.sort_by_key(|r| (r.created_at, r.id));

        candidates.into_iter().find_map(|record| {
            let owner = users.get(&record.owner_user_id)?;
            predicate
                .matches(record, Some(owner))
                .then(|| (record, owner.clone()))
        })
    }
}

#[async_trait]
impl TokenStorage for MemoryTokenStore {
    async fn insert(&self, record: &TokenRecord) -> TokenResult<()> {
        if !self.users.read().await.contains_key(&record.owner_user_id) {
            return Err(TokenError::storage(format!(
                "owner {} does not exist",
                record.owner_user_id
            )));
        }
        let mut tokens = self.tokens.write().await;
        if tokens.contains_key(&record.id) {
            return Err(TokenError::storage(format!(
                "token {} already exists",
                record.id
            )));
        }
        tokens.insert(record.id, record.clone());
        Ok(())
    }

    async fn find_one(&self, predicate: &Predicate) -> TokenResult<Option<TokenMatch>> {
        let tokens = self.tokens.read().await;
        let users = self.users.read().await;
        Ok(
            Self::first_match(&tokens, &users, predicate).map(|(record, owner)| TokenMatch {
                record: record.clone(),
                owner,
            }),
        )
    }

    async fn find_all(&self, predicate: &Predicate) -> TokenResult<Vec<TokenRecord>> {
        let tokens = self.tokens.read().await;
        let users = self.users.read().await;
        let mut found: Vec<_> = tokens
            .values()
            .filter(|r| predicate.matches(r, users.get(&r.owner_user_id)))
            .cloned()
            .collect();
        found.sort_by_key(|r| (r.created_at, r.id));
        Ok(found)
    }

    async fn delete_matching(&self, predicate: &Predicate) -> TokenResult<u64> {
        let mut tokens = self.tokens.write().await;
        let users = self.users.read().await;
        let before = tokens.len();
        tokens.retain(|_, r| !predicate.matches(r, users.get(&r.owner_user_id)));
        let deleted = (before - tokens.len()) as u64;
        tracing::debug!(deleted, "Deleted matching tokens");
        Ok(deleted)
    }

    async fn take_one(&self, predicate: &Predicate) -> TokenResult<Option<TokenMatch>> {
        let mut tokens = self.tokens.write().await;
        let users = self.users.read().await;
        let Some(id) = Self::first_match(&tokens, &users, predicate).map(|(r, _)| r.id) else {
            return Ok(None);
        };
        Ok(tokens.remove(&id).and_then(|record| {
            users
                .get(&record.owner_user_id)
                .cloned()
                .map(|owner| TokenMatch { record, owner })
        }))
    }
}

#[async_trait]
impl UserDirectory for MemoryTokenStore {
    async fn find_user(&self, id: Uuid) -> TokenResult<Option<UserRef>> {
        Ok(self.users.read().await.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokenkit_auth::{ContextSelector, IssueOptions, TokenContext, TokenService};

    async fn store_with_user() -> (MemoryTokenStore, UserRef) {
        let store = MemoryTokenStore::new();
        let user = UserRef::new(Uuid::new_v4(), "user@example.com");
        store.upsert_user(user.clone()).await;
        (store, user)
    }

    #[tokio::test]
    async fn test_insert_requires_owner() {
        let store = MemoryTokenStore::new();
        let stranger = UserRef::new(Uuid::new_v4(), "ghost@example.com");
        let issued = TokenService::without_encryption()
            .issue(TokenContext::Confirm, &stranger, IssueOptions::new())
            .unwrap();
        let err = store.insert(&issued.record).await.unwrap_err();
        assert!(matches!(err, TokenError::Storage { .. }));
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_id() {
        let (store, user) = store_with_user().await;
        let issued = TokenService::without_encryption()
            .issue(TokenContext::Confirm, &user, IssueOptions::new())
            .unwrap();
        store.insert(&issued.record).await.unwrap();
        assert!(store.insert(&issued.record).await.is_err());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_find_delete_by_user() {
        let (store, user) = store_with_user().await;
        let service = TokenService::without_encryption();
        for context in [
            TokenContext::Confirm,
            TokenContext::ResetPassword,
            TokenContext::AccountInvite,
        ] {
            let issued = service.issue(context, &user, IssueOptions::new()).unwrap();
            store.insert(&issued.record).await.unwrap();
        }

        let all = service.records_for_user(&user, ContextSelector::All);
        assert_eq!(store.find_all(&all).await.unwrap().len(), 3);

        let resets = service.records_for_user(
            &user,
            ContextSelector::Only(vec![TokenContext::ResetPassword]),
        );
        assert_eq!(store.delete_matching(&resets).await.unwrap(), 1);
        assert_eq!(store.delete_matching(&all).await.unwrap(), 2);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_update_email_unknown_user() {
        let store = MemoryTokenStore::new();
        assert!(store.update_email(Uuid::new_v4(), "x@y.z").await.is_err());
    }

    #[tokio::test]
    async fn test_find_user() {
        let (store, user) = store_with_user().await;
        assert_eq!(store.find_user(user.id).await.unwrap(), Some(user));
        assert!(store.find_user(Uuid::new_v4()).await.unwrap().is_none());
    }
}
