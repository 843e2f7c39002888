//! Declarative lookup predicates.
//!
//! A [`Predicate`] is a conjunction of named [`Constraint`]s that a storage
//! backend translates into its own query language. The core never executes
//! queries; [`Predicate::matches`] exists so backends without a query
//! language (and tests) can evaluate a predicate against a single record.

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::codec::serde_b64;
use crate::context::TokenContext;
use crate::types::{StoredValue, TokenDigest, TokenRecord, UserRef};

/// Value a record's stored secret must equal.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValueMatch {
    /// Raw bytes, compared with [`StoredValue::Raw`].
    Raw {
        #[serde(serialize_with = "serde_b64::serialize")]
        bytes: Vec<u8>,
    },
    /// Digest, compared with the digest of hashed or encrypted values.
    Digest { digest: TokenDigest },
}

impl ValueMatch {
    /// Returns `true` if `stored` satisfies this match.
    ///
    /// Ciphertext is never consulted: an encrypted value matches only via its
    /// secondary digest.
    #[must_use]
    pub fn matches(&self, stored: &StoredValue) -> bool {
        match (self, stored) {
            (Self::Raw { bytes }, StoredValue::Raw { bytes: stored }) => bytes == stored,
            (Self::Digest { digest }, StoredValue::Hashed { digest: stored })
            | (Self::Digest { digest }, StoredValue::Encrypted { digest: stored, .. }) => {
                digest == stored
            }
            _ => false,
        }
    }
}

impl fmt::Debug for ValueMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw { bytes } => write!(f, "Raw(<{} bytes redacted>)", bytes.len()),
            Self::Digest { digest } => f.debug_tuple("Digest").field(digest).finish(),
        }
    }
}

/// A single named condition on a token record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "constraint", rename_all = "snake_case")]
pub enum Constraint {
    /// `record.context == context`
    ContextEquals { context: TokenContext },
    /// `record.context IN contexts`
    ContextIn { contexts: Vec<TokenContext> },
    /// `family(record.context) IN families`
    ContextFamilyIn { families: Vec<&'static str> },
    /// `record.owner_user_id == user_id`
    OwnerEquals { user_id: Uuid },
    /// `record.stored` equals the presented value.
    ValueEquals { value: ValueMatch },
    /// `record.created_at >= at`
    CreatedAtOrAfter {
        #[serde(with = "time::serde::rfc3339")]
        at: OffsetDateTime,
    },
    /// `record.annotations[key] == value`
    AnnotationContains { key: String, value: Value },
    /// `record.sent_to == owner.email`, read from the owner at execution time.
    SentToMatchesOwnerEmail,
}

impl Constraint {
    /// Evaluates the constraint against a record and, when joined, its owner.
    #[must_use]
    pub fn matches(&self, record: &TokenRecord, owner: Option<&UserRef>) -> bool {
        match self {
            Self::ContextEquals { context } => &record.context == context,
            Self::ContextIn { contexts } => contexts.contains(&record.context),
            Self::ContextFamilyIn { families } => families.contains(&record.context.family()),
            Self::OwnerEquals { user_id } => record.owner_user_id == *user_id,
            Self::ValueEquals { value } => value.matches(&record.stored),
            Self::CreatedAtOrAfter { at } => record.created_at >= *at,
            Self::AnnotationContains { key, value } => record.has_annotation(key, value),
            Self::SentToMatchesOwnerEmail => match owner {
                Some(owner) if owner.id == record.owner_user_id => {
                    record.sent_to.as_deref() == Some(owner.email.as_str())
                }
                _ => false,
            },
        }
    }
}

/// Conjunction of constraints.
///
/// An empty predicate matches every record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Predicate {
    constraints: Vec<Constraint>,
}

impl Predicate {
    /// Creates an empty predicate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a constraint.
    #[must_use]
    pub fn and(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Narrows the predicate to records annotated with `key == value`.
    ///
    /// Used to bind a verification to auxiliary linkage, e.g. "this invite
    /// belongs to account X".
    #[must_use]
    pub fn with_annotation(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(Constraint::AnnotationContains {
            key: key.into(),
            value: value.into(),
        })
    }

    /// The constraints, in insertion order.
    #[must_use]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// The single context this predicate is pinned to, if any.
    #[must_use]
    pub fn context(&self) -> Option<&TokenContext> {
        self.constraints.iter().find_map(|c| match c {
            Constraint::ContextEquals { context } => Some(context),
            _ => None,
        })
    }

    /// The creation-time lower bound, if any.
    #[must_use]
    pub fn created_lower_bound(&self) -> Option<OffsetDateTime> {
        self.constraints.iter().find_map(|c| match c {
            Constraint::CreatedAtOrAfter { at } => Some(*at),
            _ => None,
        })
    }

    /// Returns `true` if evaluation needs the owner's user record.
    #[must_use]
    pub fn requires_owner_join(&self) -> bool {
        self.constraints
            .iter()
            .any(|c| matches!(c, Constraint::SentToMatchesOwnerEmail))
    }

    /// Evaluates every constraint against `record`.
    ///
    /// `owner` must be the current user record of `record.owner_user_id`
    /// when [`Predicate::requires_owner_join`] is `true`.
    #[must_use]
    pub fn matches(&self, record: &TokenRecord, owner: Option<&UserRef>) -> bool {
        self.constraints.iter().all(|c| c.matches(record, owner))
    }
}
