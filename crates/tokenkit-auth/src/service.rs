//! Caller-facing token service.
//!
//! Bundles the factory, the verification builder and the cipher behind one
//! handle. Every time-dependent operation has an `_at` form taking an explicit
//! clock reading; the plain forms use the current UTC time.
//!
//! # Usage
//!
//! ```ignore
//! use tokenkit_auth::{IssueOptions, TokenContext, TokenService};
//!
//! let service = TokenService::new(Arc::new(keyring));
//! let issued = service.issue(TokenContext::Confirm, &user, IssueOptions::new())?;
//! storage.insert(&issued.record).await?;
//! // ...deliver issued.secret, later:
//! let predicate = service.verify(presented.as_bytes(), &TokenContext::Confirm)?;
//! let found = storage.find_one(&predicate).await?;
//! ```

use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::TokenResult;
use crate::cipher::{NoCipher, TokenCipher};
use crate::context::TokenContext;
use crate::factory::{self, IssueOptions};
use crate::predicate::Predicate;
use crate::types::{IssuedToken, TokenRecord, UserRef};
use crate::verify::{self, ContextSelector};

/// Token issuance and verification service.
#[derive(Clone)]
pub struct TokenService {
    cipher: Arc<dyn TokenCipher>,
}

impl TokenService {
    /// Creates a service using `cipher` for encrypted contexts.
    #[must_use]
    pub fn new(cipher: Arc<dyn TokenCipher>) -> Self {
        Self { cipher }
    }

    /// Creates a service that cannot issue or reveal encrypted contexts.
    #[must_use]
    pub fn without_encryption() -> Self {
        Self::new(Arc::new(NoCipher))
    }

    /// Issues a token now.
    ///
    /// # Errors
    ///
    /// See [`factory::issue`].
    pub fn issue(
        &self,
        context: TokenContext,
        user: &UserRef,
        options: IssueOptions,
    ) -> TokenResult<IssuedToken> {
        self.issue_at(context, user, options, OffsetDateTime::now_utc())
    }

    /// Issues a token as of `now`.
    ///
    /// # Errors
    ///
    /// See [`factory::issue`].
    pub fn issue_at(
        &self,
        context: TokenContext,
        user: &UserRef,
        options: IssueOptions,
        now: OffsetDateTime,
    ) -> TokenResult<IssuedToken> {
        factory::issue(context, user, options, self.cipher.as_ref(), now)
    }

    /// Issues a token for a context given as a wire tag.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TokenError::UnknownContext`] for unknown tags, plus
    /// the errors of [`factory::issue`].
    pub fn issue_tagged(
        &self,
        tag: &str,
        user: &UserRef,
        options: IssueOptions,
    ) -> TokenResult<IssuedToken> {
        self.issue(TokenContext::parse(tag)?, user, options)
    }

    /// Builds the validity predicate for a presented token.
    ///
    /// # Errors
    ///
    /// See [`verify::build_verification`].
    pub fn verify(&self, presented: &[u8], context: &TokenContext) -> TokenResult<Predicate> {
        self.verify_at(presented, context, OffsetDateTime::now_utc())
    }

    /// Builds the validity predicate as of `now`.
    ///
    /// # Errors
    ///
    /// See [`verify::build_verification`].
    pub fn verify_at(
        &self,
        presented: &[u8],
        context: &TokenContext,
        now: OffsetDateTime,
    ) -> TokenResult<Predicate> {
        verify::build_verification(presented, context, now)
    }

    /// Builds the validity predicate for a context given as a wire tag.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TokenError::UnknownContext`] for unknown tags, plus
    /// the errors of [`verify::build_verification`].
    pub fn verify_tagged(&self, presented: &[u8], tag: &str) -> TokenResult<Predicate> {
        self.verify(presented, &TokenContext::parse(tag)?)
    }

    /// Builds the "is current" predicate for a presented token.
    ///
    /// # Errors
    ///
    /// See [`verify::build_freshness`].
    pub fn verify_current(
        &self,
        presented: &[u8],
        context: &TokenContext,
    ) -> TokenResult<Predicate> {
        self.verify_current_at(presented, context, OffsetDateTime::now_utc())
    }

    /// Builds the "is current" predicate as of `now`.
    ///
    /// # Errors
    ///
    /// See [`verify::build_freshness`].
    pub fn verify_current_at(
        &self,
        presented: &[u8],
        context: &TokenContext,
        now: OffsetDateTime,
    ) -> TokenResult<Predicate> {
        verify::build_freshness(presented, context, now)
    }

    /// Recovers the transmissible text of an encrypted-context record.
    ///
    /// # Errors
    ///
    /// See [`verify::reveal`].
    pub fn reveal(&self, record: &TokenRecord) -> TokenResult<String> {
        verify::reveal(record, self.cipher.as_ref())
    }

    /// Selects tokens owned by `user`.
    #[must_use]
    pub fn records_for_user(&self, user: &UserRef, selector: ContextSelector) -> Predicate {
        verify::records_for_user(user, selector)
    }

    /// Selects the still-valid team invites of an account.
    #[must_use]
    pub fn invites_for_account(&self, account_id: Uuid) -> Predicate {
        self.invites_for_account_at(account_id, OffsetDateTime::now_utc())
    }

    /// Selects the team invites of an account valid as of `now`.
    #[must_use]
    pub fn invites_for_account_at(&self, account_id: Uuid, now: OffsetDateTime) -> Predicate {
        verify::invites_for_account(account_id, now)
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("cipher", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::testing::MockCipher;
    use crate::error::TokenError;

    fn service() -> TokenService {
        TokenService::new(Arc::new(MockCipher::new()))
    }

    fn user() -> UserRef {
        UserRef::new(Uuid::new_v4(), "user@example.com")
    }

    #[test]
    fn test_unknown_context_tag() {
        let service = service();
        let err = service.verify_tagged(b"abc", "unknown-context").unwrap_err();
        assert!(matches!(err, TokenError::UnknownContext { .. }));
        assert!(err.is_programmer_error());

        let err = service
            .issue_tagged("unknown-context", &user(), IssueOptions::new())
            .unwrap_err();
        assert!(matches!(err, TokenError::UnknownContext { .. }));
    }

    #[test]
    fn test_issue_verify_by_tag() {
        let service = service();
        let user = user();
        let issued = service
            .issue_tagged("change:user@example.com", &user, IssueOptions::new())
            .unwrap();
        let predicate = service
            .verify_tagged(issued.secret.as_bytes(), "change:user@example.com")
            .unwrap();
        assert!(predicate.matches(&issued.record, None));
    }

    #[test]
    fn test_reveal_through_service() {
        let service = service();
        let issued = service
            .issue(
                TokenContext::AccountTeamInvite,
                &user(),
                IssueOptions::new().for_account(Uuid::new_v4()),
            )
            .unwrap();
        assert_eq!(
            service.reveal(&issued.record).unwrap(),
            issued.secret.as_text().unwrap()
        );
    }

    #[test]
    fn test_without_encryption() {
        let service = TokenService::without_encryption();
        assert!(
            service
                .issue(TokenContext::Confirm, &user(), IssueOptions::new())
                .is_ok()
        );
        assert!(
            service
                .issue(TokenContext::AccountTeamInvite, &user(), IssueOptions::new())
                .is_err()
        );
    }

    #[test]
    fn test_verify_current_uses_freshness() {
        let service = service();
        let user = user();
        let t = OffsetDateTime::now_utc();
        let issued = service
            .issue_at(
                TokenContext::AccountTeamInvite,
                &user,
                IssueOptions::new(),
                t,
            )
            .unwrap();
        let current = service
            .verify_current_at(
                issued.secret.as_bytes(),
                &TokenContext::AccountTeamInvite,
                t,
            )
            .unwrap();
        assert_eq!(
            current.created_lower_bound(),
            Some(t - time::Duration::days(1))
        );
    }
}
