//! User directory reference.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The slice of a user record tokens care about.
///
/// `email` must be the user's *current* address: email-match verification
/// compares it with the address a token was sent to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserRef {
    pub id: Uuid,
    pub email: String,
}

impl UserRef {
    #[must_use]
    pub fn new(id: Uuid, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
        }
    }
}
