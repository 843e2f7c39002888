//! Encryption collaborator seam.
//!
//! Reversible tokens are encrypted by an external keyed scheme. The core
//! only requires that encryption may be randomized and that decryption of
//! tampered or foreign ciphertext fails with [`TokenError::Decryption`].
//!
//! Implementations are provided in separate crates:
//! - `tokenkit-secrets` - AES-256-GCM keyring with rotation
//!
//! [`TokenError::Decryption`]: crate::TokenError::Decryption

use crate::TokenResult;
use crate::types::Ciphertext;

/// Keyed symmetric encryption for reversible tokens.
pub trait TokenCipher: Send + Sync {
    /// Encrypts token bytes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TokenError::Encryption`] if no key is usable.
    fn encrypt(&self, plaintext: &[u8]) -> TokenResult<Ciphertext>;

    /// Decrypts ciphertext produced by [`TokenCipher::encrypt`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::TokenError::Decryption`] on tampered data or an
    /// unknown key.
    fn decrypt(&self, ciphertext: &Ciphertext) -> TokenResult<Vec<u8>>;
}

/// Cipher for deployments without any encrypted context in use.
///
/// Every call fails, so issuing an encrypted token without a real cipher is
/// a loud error rather than silent plaintext storage.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCipher;

impl TokenCipher for NoCipher {
    fn encrypt(&self, _plaintext: &[u8]) -> TokenResult<Ciphertext> {
        Err(crate::TokenError::encryption("no encryption key configured"))
    }

    fn decrypt(&self, _ciphertext: &Ciphertext) -> TokenResult<Vec<u8>> {
        Err(crate::TokenError::decryption("no encryption key configured"))
    }
}


#[cfg(test)]
mod tests {
    use super::testing::MockCipher;
    use super::*;
    use crate::codec;

    #[test]
    fn test_no_cipher_fails_loudly() {
        assert!(NoCipher.encrypt(b"x").is_err());
    }

    #[test]
    fn test_mock_round_trip_and_tamper() {
        let cipher = MockCipher::new();
        let bytes = codec::generate_random_bytes();
        let mut ct = cipher.encrypt(&bytes).unwrap();
        assert_eq!(cipher.decrypt(&ct).unwrap(), bytes);

        ct.data[0] ^= 1;
        assert!(cipher.decrypt(&ct).unwrap_err().is_invalid_credential());
    }
}
