use crate::backend::BackendPreference;
use crate::error::CryptoError;
use crate::kdf::DEFAULT_ITERATIONS;
use crate::service::EncryptionService;
use private::Sealed;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

#[derive(Debug, Default, ZeroizeOnDrop)]
pub struct NoPassword;

#[derive(Zeroize, ZeroizeOnDrop)]
pub struct WithPassword {
    password: String,
}

impl fmt::Debug for WithPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WithPassword").field("password", &"<redacted>").finish()
    }
}

mod private {
    pub(super) trait Sealed {}
}
impl Sealed for NoPassword {}
impl Sealed for WithPassword {}

/// A builder for an [`EncryptionService`].
///
/// The master password is wiped from the builder when it is dropped or consumed.
#[allow(private_bounds)]
#[derive(Debug)]
pub struct EncryptionServiceBuilder<P: Sealed + ZeroizeOnDrop = NoPassword> {
    iterations: u32,
    backend: BackendPreference,
    password: P,
}

impl Default for EncryptionServiceBuilder {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            backend: BackendPreference::Auto,
            password: NoPassword,
        }
    }
}

impl EncryptionServiceBuilder {
    /// Creates a new builder with the default iteration count and automatic backend choice.
    #[must_use = "Builder must be given a master password before use"]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the master password the keys are derived from.
    #[must_use]
    pub fn password(self, password: impl Into<String>) -> EncryptionServiceBuilder<WithPassword> {
        EncryptionServiceBuilder {
            iterations: self.iterations,
            backend: self.backend,
            password: WithPassword { password: password.into() },
        }
    }
}

#[allow(private_bounds)]
impl<P: Sealed + ZeroizeOnDrop> EncryptionServiceBuilder<P> {
    /// Sets the PBKDF2 iteration count.
    #[must_use]
    pub const fn iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    /// Restricts the service to a backend.
    #[must_use]
    pub const fn backend(mut self, backend: BackendPreference) -> Self {
        self.backend = backend;
        self
    }
}

impl EncryptionServiceBuilder<WithPassword> {
    /// Finalizes the service. Keys are not derived until [`EncryptionService::init`].
    ///
    /// # Errors
    /// Returns [`CryptoError::InvalidConfiguration`] if the password is empty or the
    /// iteration count is zero.
    pub fn build(mut self) -> Result<EncryptionService, CryptoError> {
        if self.password.password.is_empty() {
            return Err(CryptoError::InvalidConfiguration {
                message: "Master password must not be empty".into(),
                context: None,
            });
        }
        if self.iterations == 0 {
            return Err(CryptoError::InvalidConfiguration {
                message: "PBKDF2 iteration count must be at least 1".into(),
                context: None,
            });
        }

        let password = Zeroizing::new(std::mem::take(&mut self.password.password));
        Ok(EncryptionService::new(password, self.iterations, self.backend))
    }
}
