//! Per-context token policy.
//!
//! The table is fixed: validity windows are part of the token contract and
//! are not tunable at runtime.

use serde::Serialize;
use time::Duration;

use crate::context::TokenContext;

/// How a token's secret is turned into its stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Encoding {
    /// Random bytes stored and compared directly.
    Raw,
    /// SHA-256 digest stored; the raw bytes are only ever transmitted.
    Hashed,
    /// Ciphertext stored for display, plus a digest for indexed lookup.
    Encrypted,
}

impl Encoding {
    /// Returns `true` if the secret is transmitted as URL-safe text.
    #[must_use]
    pub fn is_text_encoded(self) -> bool {
        !matches!(self, Self::Raw)
    }
}

/// Policy row for one context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TokenPolicy {
    /// Storage transform.
    pub encoding: Encoding,
    /// Validity window in days, measured from `created_at`.
    pub validity_days: i64,
    /// Shorter "is current" window, for contexts that expose one.
    pub freshness_days: Option<i64>,
    /// Whether `sent_to` must still equal the owner's current email.
    pub requires_email_match: bool,
}

impl TokenPolicy {
    const fn new(encoding: Encoding, validity_days: i64, requires_email_match: bool) -> Self {
        Self {
            encoding,
            validity_days,
            freshness_days: None,
            requires_email_match,
        }
    }

    /// Validity window as a duration.
    #[must_use]
    pub fn validity(&self) -> Duration {
        Duration::days(self.validity_days)
    }

    /// Freshness window as a duration, if the context has one.
    #[must_use]
    pub fn freshness(&self) -> Option<Duration> {
        self.freshness_days.map(Duration::days)
    }
}

pub const SESSION: TokenPolicy = TokenPolicy::new(Encoding::Raw, 60, false);
pub const IMPERSONATE: TokenPolicy = TokenPolicy::new(Encoding::Raw, 1, false);
pub const CONFIRM: TokenPolicy = TokenPolicy::new(Encoding::Hashed, 7, true);
pub const RESET_PASSWORD: TokenPolicy = TokenPolicy::new(Encoding::Hashed, 1, true);
pub const CHANGE_EMAIL: TokenPolicy = TokenPolicy::new(Encoding::Hashed, 7, false);
pub const ACCOUNT_INVITE: TokenPolicy = TokenPolicy::new(Encoding::Hashed, 7, false);
pub const ACCOUNT_TEAM_INVITE: TokenPolicy = TokenPolicy {
    encoding: Encoding::Encrypted,
    validity_days: 7,
    freshness_days: Some(1),
    requires_email_match: false,
};

impl TokenContext {
    /// Resolves the policy for this context.
    #[must_use]
    pub fn policy(&self) -> TokenPolicy {
        match self {
            Self::Session => SESSION,
            Self::Impersonate => IMPERSONATE,
            Self::Confirm => CONFIRM,
            Self::ResetPassword => RESET_PASSWORD,
            Self::ChangeEmail(_) => CHANGE_EMAIL,
            Self::AccountInvite => ACCOUNT_INVITE,
            Self::AccountTeamInvite => ACCOUNT_TEAM_INVITE,
        }
    }
}

/// Resolves the policy for a context tag.
///
/// # Errors
///
/// Returns [`crate::TokenError::UnknownContext`] for unrecognized tags.
pub fn lookup(tag: &str) -> crate::TokenResult<(TokenContext, TokenPolicy)> {
    let context = TokenContext::parse(tag)?;
    let policy = context.policy();
    Ok((context, policy))
}

/// One row per context family, in display order.
#[must_use]
pub fn table() -> Vec<(&'static str, TokenPolicy)> {
    TokenContext::FIXED
        .iter()
        .chain(std::iter::once(&TokenContext::ChangeEmail(String::new())))
        .map(|context| (context.family(), context.policy()))
        .collect()
}
