//! Master-password key derivation.
//!
//! PBKDF2-HMAC-SHA1 stretches the password into 64 bytes: the first half is the AES-256
//! encryption key, the second half the HMAC signing key. The salt is `SHA-1(password)`, so
//! the same password always yields the same keys and the bearer token can be recomputed
//! on any device without storing a salt.

use crate::backend::Backend;
use crate::encoding::base64_encode;
use crate::error::CryptoError;
use sha1::{Digest, Sha1};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Iteration count used when none is configured.
pub const DEFAULT_ITERATIONS: u32 = 1000;

/// Length of each derived key in bytes.
pub const KEY_LEN: usize = 32;

const DERIVED_LEN: usize = KEY_LEN * 2;

/// The pair of keys derived from a master password.
///
/// Key material is wiped when the keyring is dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Keyring {
    encryption: [u8; KEY_LEN],
    signing: [u8; KEY_LEN],
}

impl fmt::Debug for Keyring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keyring").finish_non_exhaustive()
    }
}

impl Keyring {
    /// Derives both keys from `password` with the given backend.
    ///
    /// # Errors
    /// Returns [`CryptoError::InvalidConfiguration`] for an empty password or zero iterations.
    pub fn derive(backend: Backend, password: &[u8], iterations: u32) -> Result<Self, CryptoError> {
        if password.is_empty() {
            return Err(CryptoError::InvalidConfiguration {
                message: "Master password must not be empty".into(),
                context: None,
            });
        }

        let salt = password_salt(password);
        let mut derived = Zeroizing::new([0u8; DERIVED_LEN]);
        backend.derive_key(password, &salt, iterations, derived.as_mut_slice())?;

        let mut keyring = Self { encryption: [0u8; KEY_LEN], signing: [0u8; KEY_LEN] };
        keyring.encryption.copy_from_slice(&derived[..KEY_LEN]);
        keyring.signing.copy_from_slice(&derived[KEY_LEN..]);
        Ok(keyring)
    }

    #[must_use]
    pub const fn encryption_key(&self) -> &[u8; KEY_LEN] {
        &self.encryption
    }

    #[must_use]
    pub const fn signing_key(&self) -> &[u8; KEY_LEN] {
        &self.signing
    }

    /// Base64 of the signing key, presented to the store as a bearer credential.
    #[must_use]
    pub fn authorization_token(&self) -> String {
        base64_encode(self.signing)
    }
}

/// The deterministic salt: `SHA-1(password)`.
#[must_use]
pub fn password_salt(password: &[u8]) -> [u8; 20] {
    Sha1::digest(password).into()
}
