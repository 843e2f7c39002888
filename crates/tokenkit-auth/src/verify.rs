//! Verification predicate builder.
//!
//! Turns a presented token into the exact predicate storage must satisfy for
//! the token to be valid. Unknown or expired tokens are not errors here: the
//! predicate simply matches nothing when executed.
//!
//! # Example
//!
//! ```
//! use time::OffsetDateTime;
//! use tokenkit_auth::TokenContext;
//! use tokenkit_auth::verify::build_verification;
//!
//! let err = build_verification(b"not base64!", &TokenContext::Confirm, OffsetDateTime::now_utc())
//!     .unwrap_err();
//! assert!(err.is_invalid_credential());
//! ```

use time::{Duration, OffsetDateTime, PrimitiveDateTime};
use uuid::Uuid;

use crate::TokenResult;
use crate::cipher::TokenCipher;
use crate::codec;
use crate::context::TokenContext;
use crate::error::TokenError;
use crate::policy::Encoding;
use crate::predicate::{Constraint, Predicate, ValueMatch};
use crate::types::{ACCOUNT_ID, TokenRecord, UserRef};

/// Which contexts a per-user predicate selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextSelector {
    /// Every token the user owns.
    All,
    /// Only tokens in these contexts.
    Only(Vec<TokenContext>),
    /// Tokens in these context families, ignoring parameters
    /// (`"change:*"` selects every email change token).
    Families(Vec<&'static str>),
}

/// Builds the full-validity predicate for a presented token.
///
/// For raw contexts `presented` is compared byte-for-byte. For hashed and
/// encrypted contexts it must be the transmitted text.
///
/// # Errors
///
/// Returns [`TokenError::Decode`] if text-encoded contexts receive malformed
/// input.
pub fn build_verification(
    presented: &[u8],
    context: &TokenContext,
    now: OffsetDateTime,
) -> TokenResult<Predicate> {
    build(presented, context, now, context.policy().validity())
}

/// Builds the shorter "is current" predicate for contexts with a freshness
/// window.
///
/// # Errors
///
/// - [`TokenError::InvalidOptions`] if the context has no freshness window
/// - [`TokenError::Decode`] on malformed input
pub fn build_freshness(
    presented: &[u8],
    context: &TokenContext,
    now: OffsetDateTime,
) -> TokenResult<Predicate> {
    let window = context.policy().freshness().ok_or_else(|| {
        TokenError::invalid_options(format!("context '{context}' has no freshness window"))
    })?;
    build(presented, context, now, window)
}

fn build(
    presented: &[u8],
    context: &TokenContext,
    now: OffsetDateTime,
    window: Duration,
) -> TokenResult<Predicate> {
    let policy = context.policy();

    let value = match policy.encoding {
        Encoding::Raw => ValueMatch::Raw {
            bytes: presented.to_vec(),
        },
        Encoding::Hashed | Encoding::Encrypted => {
            let text = std::str::from_utf8(presented)
                .map_err(|_| TokenError::decode("token is not valid UTF-8"))?;
            let bytes = codec::decode_from_transmission(text).inspect_err(|_| {
                tracing::debug!(context = %context, "Rejected malformed token");
            })?;
            ValueMatch::Digest {
                digest: codec::digest(&bytes),
            }
        }
    };

    let mut predicate = Predicate::new()
        .and(Constraint::ContextEquals {
            context: context.clone(),
        })
        .and(Constraint::ValueEquals { value })
        .and(Constraint::CreatedAtOrAfter {
            at: window_start(now, window),
        });

    if policy.requires_email_match {
        predicate = predicate.and(Constraint::SentToMatchesOwnerEmail);
    }

    Ok(predicate)
}

/// Decrypts an encrypted-context record back to its transmissible text.
///
/// A stored ciphertext that no longer decrypts is an operational fault
/// (rotated key, corrupted row) and is logged as such.
///
/// # Errors
///
/// - [`TokenError::NotReversible`] for records of non-encrypted contexts
/// - [`TokenError::Decryption`] if the cipher rejects the ciphertext
pub fn reveal(record: &TokenRecord, cipher: &dyn TokenCipher) -> TokenResult<String> {
    let ciphertext = match (record.context.policy().encoding, record.stored.ciphertext()) {
        (Encoding::Encrypted, Some(ciphertext)) => ciphertext,
        _ => return Err(TokenError::not_reversible(record.context.tag())),
    };

    let bytes = cipher.decrypt(ciphertext).inspect_err(|e| {
        tracing::warn!(
            token_id = %record.id,
            key_id = %ciphertext.key_id,
            error = %e,
            "Stored token ciphertext failed to decrypt"
        );
    })?;

    Ok(codec::encode_for_transmission(&bytes))
}

/// Selects the tokens owned by `user`.
#[must_use]
pub fn records_for_user(user: &UserRef, selector: ContextSelector) -> Predicate {
    let predicate = Predicate::new().and(Constraint::OwnerEquals { user_id: user.id });
    match selector {
        ContextSelector::All => predicate,
        ContextSelector::Only(contexts) => predicate.and(Constraint::ContextIn { contexts }),
        ContextSelector::Families(families) => {
            predicate.and(Constraint::ContextFamilyIn { families })
        }
    }
}

/// Selects the still-valid team invites of an account.
#[must_use]
pub fn invites_for_account(account_id: Uuid, now: OffsetDateTime) -> Predicate {
    let context = TokenContext::AccountTeamInvite;
    let validity = context.policy().validity();
    Predicate::new()
        .and(Constraint::ContextEquals { context })
        .with_annotation(ACCOUNT_ID, account_id.to_string())
        .and(Constraint::CreatedAtOrAfter {
            at: window_start(now, validity),
        })
}

/// Earliest creation time still inside `window`, clamped to the calendar's
/// lower end.
fn window_start(now: OffsetDateTime, window: Duration) -> OffsetDateTime {
    now.checked_sub(window)
        .unwrap_or_else(|| PrimitiveDateTime::MIN.assume_utc())
}
