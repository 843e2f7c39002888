//! Token contexts.
//!
//! A context selects the policy a token is issued and verified under. On the
//! wire and in storage it is a string tag (`"session"`, `"change:old@x.org"`);
//! in code it is [`TokenContext`], so policy lookup is an exhaustive match
//! instead of prefix parsing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TokenError;

/// Tag prefix of email-change contexts.
pub const CHANGE_EMAIL_PREFIX: &str = "change:";

/// The purpose a token was issued for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum TokenContext {
    /// Browser session token.
    Session,
    /// Admin impersonating another user.
    Impersonate,
    /// Email address confirmation.
    Confirm,
    /// Password reset.
    ResetPassword,
    /// Email change confirmation, parameterized by the email being replaced.
    ChangeEmail(String),
    /// Invitation to join an account.
    AccountInvite,
    /// Invitation to join an account team; revealable after issuance.
    AccountTeamInvite,
}

impl TokenContext {
    /// Every non-parameterized context.
    pub const FIXED: [TokenContext; 6] = [
        Self::Session,
        Self::Impersonate,
        Self::Confirm,
        Self::ResetPassword,
        Self::AccountInvite,
        Self::AccountTeamInvite,
    ];

    /// Creates an email change context for the given current email.
    #[must_use]
    pub fn change_email(current_email: impl Into<String>) -> Self {
        Self::ChangeEmail(current_email.into())
    }

    /// Parses a storage/wire tag.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::UnknownContext`] if the tag names no context.
    /// Any `change:` tag parses, including one with an empty email, so every
    /// context [`TokenContext::tag`] produces reads back.
    pub fn parse(tag: &str) -> Result<Self, TokenError> {
        match tag {
            "session" => Ok(Self::Session),
            "impersonate" => Ok(Self::Impersonate),
            "confirm" => Ok(Self::Confirm),
            "reset_password" => Ok(Self::ResetPassword),
            "account-invite" => Ok(Self::AccountInvite),
            "account-team-invite" => Ok(Self::AccountTeamInvite),
            other => other
                .strip_prefix(CHANGE_EMAIL_PREFIX)
                .map(|email| Self::ChangeEmail(email.to_string()))
                .ok_or_else(|| TokenError::unknown_context(other)),
        }
    }

    /// Returns the storage/wire tag.
    #[must_use]
    pub fn tag(&self) -> String {
        match self {
            Self::ChangeEmail(email) => format!("{CHANGE_EMAIL_PREFIX}{email}"),
            fixed => fixed.family().to_string(),
        }
    }

    /// Returns the context family name, ignoring any parameter.
    #[must_use]
    pub fn family(&self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::Impersonate => "impersonate",
            Self::Confirm => "confirm",
            Self::ResetPassword => "reset_password",
            Self::ChangeEmail(_) => "change:*",
            Self::AccountInvite => "account-invite",
            Self::AccountTeamInvite => "account-team-invite",
        }
    }

    /// Returns `true` for email change contexts regardless of parameter.
    #[must_use]
    pub fn is_change_email(&self) -> bool {
        matches!(self, Self::ChangeEmail(_))
    }
}

impl fmt::Display for TokenContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag())
    }
}

impl FromStr for TokenContext {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<TokenContext> for String {
    fn from(context: TokenContext) -> Self {
        context.tag()
    }
}

impl TryFrom<String> for TokenContext {
    type Error = TokenError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}
