//! Token factory.
//!
//! Issues a fresh token for a context, applying the context's storage
//! transform. No I/O happens here: persisting the returned record is the
//! caller's job.

use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::TokenResult;
use crate::cipher::TokenCipher;
use crate::codec;
use crate::context::TokenContext;
use crate::error::TokenError;
use crate::policy::Encoding;
use crate::types::{
    ACCOUNT_ID, Annotations, IMPERSONATED_USER_ID, IssuedToken, StoredValue, TokenRecord,
    TokenSecret, UserRef,
};

/// Caller-supplied issuance options.
#[derive(Debug, Clone, Default)]
pub struct IssueOptions {
    /// Destination address; defaults to the user's email where one is needed.
    pub sent_to: Option<String>,
    /// Auxiliary linkage stored with the token.
    pub annotations: Annotations,
}

impl IssueOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the destination address.
    #[must_use]
    pub fn sent_to(mut self, address: impl Into<String>) -> Self {
        self.sent_to = Some(address.into());
        self
    }

    /// Adds an annotation.
    #[must_use]
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Links the token to an account (invites).
    #[must_use]
    pub fn for_account(self, account_id: Uuid) -> Self {
        self.with_annotation(ACCOUNT_ID, account_id.to_string())
    }

    /// Records the user being impersonated.
    #[must_use]
    pub fn impersonating(self, user_id: Uuid) -> Self {
        self.with_annotation(IMPERSONATED_USER_ID, user_id.to_string())
    }
}

/// Issues a token for `user` in `context` at time `now`.
///
/// # Errors
///
/// - [`TokenError::InvalidOptions`] if an impersonation token lacks the
///   impersonated user
/// - [`TokenError::Encryption`] if the cipher fails for an encrypted context
pub fn issue(
    context: TokenContext,
    user: &UserRef,
    options: IssueOptions,
    cipher: &dyn TokenCipher,
    now: OffsetDateTime,
) -> TokenResult<IssuedToken> {
    let policy = context.policy();

    if matches!(context, TokenContext::Impersonate)
        && !options.annotations.contains_key(IMPERSONATED_USER_ID)
    {
        return Err(TokenError::invalid_options(
            "impersonation tokens require an impersonated_user_id annotation",
        ));
    }

    let bytes = codec::generate_random_bytes();

    let (stored, secret) = match policy.encoding {
        Encoding::Raw => (
            StoredValue::Raw {
                bytes: bytes.to_vec(),
            },
            TokenSecret::Raw(bytes),
        ),
        Encoding::Hashed => (
            StoredValue::Hashed {
                digest: codec::digest(&bytes),
            },
            TokenSecret::Encoded(codec::encode_for_transmission(&bytes)),
        ),
        Encoding::Encrypted => (
            StoredValue::Encrypted {
                ciphertext: cipher.encrypt(&bytes)?,
                digest: codec::digest(&bytes),
            },
            TokenSecret::Encoded(codec::encode_for_transmission(&bytes)),
        ),
    };

    let sent_to = options.sent_to.or_else(|| {
        (policy.requires_email_match || context.is_change_email()).then(|| user.email.clone())
    });

    tracing::debug!(
        context = %context,
        user_id = %user.id,
        encoding = ?policy.encoding,
        "Issued token"
    );

    Ok(IssuedToken {
        secret,
        record: TokenRecord {
            id: Uuid::new_v4(),
            context,
            stored,
            sent_to,
            annotations: options.annotations,
            owner_user_id: user.id,
            created_at: now,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::NoCipher;
    use crate::cipher::testing::MockCipher;

    fn user() -> UserRef {
        UserRef::new(Uuid::new_v4(), "user@example.com")
    }

    #[test]
    fn test_session_token_is_raw() {
        let user = user();
        let now = OffsetDateTime::now_utc();
        let issued = issue(
            TokenContext::Session,
            &user,
            IssueOptions::new(),
            &NoCipher,
            now,
        )
        .unwrap();

        let TokenSecret::Raw(bytes) = issued.secret else {
            panic!("session secret should be raw");
        };
        assert_eq!(
            issued.record.stored,
            StoredValue::Raw {
                bytes: bytes.to_vec()
            }
        );
        assert_eq!(issued.record.owner_user_id, user.id);
        assert_eq!(issued.record.created_at, now);
        assert!(issued.record.sent_to.is_none());
    }

    #[test]
    fn test_hashed_token_never_stores_raw_bytes() {
        for context in [
            TokenContext::Confirm,
            TokenContext::ResetPassword,
            TokenContext::change_email("old@example.com"),
            TokenContext::AccountInvite,
        ] {
            let issued = issue(
                context.clone(),
                &user(),
                IssueOptions::new(),
                &NoCipher,
                OffsetDateTime::now_utc(),
            )
            .unwrap();

            let text = issued.secret.as_text().unwrap();
            let raw = codec::decode_from_transmission(text).unwrap();
            assert_eq!(raw.len(), codec::TOKEN_BYTES);

            let StoredValue::Hashed { digest } = &issued.record.stored else {
                panic!("{context} should be hashed");
            };
            assert_ne!(digest.as_bytes().as_slice(), raw.as_slice());
            assert_eq!(*digest, codec::digest(&raw));
        }
    }

    #[test]
    fn test_encrypted_token_stores_ciphertext_and_digest() {
        let cipher = MockCipher::new();
        let account = Uuid::new_v4();
        let issued = issue(
            TokenContext::AccountTeamInvite,
            &user(),
            IssueOptions::new()
                .for_account(account)
                .sent_to("invitee@example.com"),
            &cipher,
            OffsetDateTime::now_utc(),
        )
        .unwrap();

        let raw = codec::decode_from_transmission(issued.secret.as_text().unwrap()).unwrap();
        let StoredValue::Encrypted { ciphertext, digest } = &issued.record.stored else {
            panic!("team invites should be encrypted");
        };
        assert_ne!(ciphertext.data, raw);
        assert_eq!(cipher.decrypt(ciphertext).unwrap(), raw);
        assert_eq!(*digest, codec::digest(&raw));
        assert_eq!(issued.record.account_id(), Some(account));
        assert_eq!(
            issued.record.sent_to.as_deref(),
            Some("invitee@example.com")
        );
    }

    #[test]
    fn test_encrypted_context_without_cipher_fails() {
        let err = issue(
            TokenContext::AccountTeamInvite,
            &user(),
            IssueOptions::new(),
            &NoCipher,
            OffsetDateTime::now_utc(),
        )
        .unwrap_err();
        assert!(matches!(err, TokenError::Encryption { .. }));
    }

    #[test]
    fn test_sent_to_defaults_for_email_contexts() {
        let user = user();
        let now = OffsetDateTime::now_utc();
        for context in [
            TokenContext::Confirm,
            TokenContext::ResetPassword,
            TokenContext::change_email("old@example.com"),
        ] {
            let issued = issue(context, &user, IssueOptions::new(), &NoCipher, now).unwrap();
            assert_eq!(issued.record.sent_to.as_deref(), Some("user@example.com"));
        }

        let invite = issue(
            TokenContext::AccountInvite,
            &user,
            IssueOptions::new(),
            &NoCipher,
            now,
        )
        .unwrap();
        assert!(invite.record.sent_to.is_none());
    }

    #[test]
    fn test_impersonation_requires_target() {
        let admin = user();
        let err = issue(
            TokenContext::Impersonate,
            &admin,
            IssueOptions::new(),
            &NoCipher,
            OffsetDateTime::now_utc(),
        )
        .unwrap_err();
        assert!(matches!(err, TokenError::InvalidOptions { .. }));

        let target = Uuid::new_v4();
        let issued = issue(
            TokenContext::Impersonate,
            &admin,
            IssueOptions::new().impersonating(target),
            &NoCipher,
            OffsetDateTime::now_utc(),
        )
        .unwrap();
        assert_eq!(issued.record.impersonated_user_id(), Some(target));
        assert!(matches!(issued.secret, TokenSecret::Raw(_)));
    }

    #[test]
    fn test_tokens_are_unique() {
        let user = user();
        let a = issue(
            TokenContext::Confirm,
            &user,
            IssueOptions::new(),
            &NoCipher,
            OffsetDateTime::now_utc(),
        )
        .unwrap();
        let b = issue(
            TokenContext::Confirm,
            &user,
            IssueOptions::new(),
            &NoCipher,
            OffsetDateTime::now_utc(),
        )
        .unwrap();
        assert_ne!(a.secret, b.secret);
        assert_ne!(a.record.id, b.record.id);
    }
}
