//! Domain types shared by the factory, the verification builder and storage.

pub mod record;
pub mod secret;
pub mod user;

pub use record::{
    ACCOUNT_ID, Annotations, Ciphertext, IMPERSONATED_USER_ID, StoredValue, TokenDigest,
    TokenRecord,
};
pub use secret::{IssuedToken, TokenSecret};
pub use user::UserRef;
