use crate::backend::{self, BLOCK_LEN, Backend, BackendPreference};
use crate::builder::EncryptionServiceBuilder;
use crate::encoding::{base64_encode, utf8_decode};
use crate::envelope::Envelope;
use crate::error::{CryptoError, CryptoErrorExt};
use crate::kdf::Keyring;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;
use tracing::debug;
use zeroize::Zeroizing;

struct ServiceInner {
    password: Zeroizing<String>,
    iterations: u32,
    preference: BackendPreference,
    session: OnceCell<Session>,
}

struct Session {
    backend: Backend,
    keyring: Keyring,
}

/// Encrypts and decrypts vault documents under keys derived from a master password.
///
/// The service is cheap to clone; clones share the derived keys. Keys are derived once by
/// [`EncryptionService::init`] and wiped when the last clone is dropped.
///
/// ### Example
/// ```rust
/// use passio_crypto::prelude::*;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), CryptoError> {
/// let service = EncryptionService::builder().password("correct horse").build()?;
/// service.init().await?;
///
/// let envelope = service.encrypt(&vec!["secret"])?;
/// let restored: Vec<String> = service.decrypt(&envelope)?;
/// assert_eq!(restored, ["secret"]);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct EncryptionService {
    inner: Arc<ServiceInner>,
}

impl std::fmt::Debug for EncryptionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionService")
            .field("iterations", &self.inner.iterations)
            .field("preference", &self.inner.preference)
            .field("backend", &self.backend())
            .finish_non_exhaustive()
    }
}

impl EncryptionService {
    /// Returns a new [`EncryptionServiceBuilder`].
    #[must_use]
    pub fn builder() -> EncryptionServiceBuilder {
        EncryptionServiceBuilder::new()
    }

    pub(crate) fn new(
        password: Zeroizing<String>,
        iterations: u32,
        preference: BackendPreference,
    ) -> Self {
        Self {
            inner: Arc::new(ServiceInner {
                password,
                iterations,
                preference,
                session: OnceCell::new(),
            }),
        }
    }

    /// Selects a backend and derives the keys.
    ///
    /// Derivation runs on a blocking worker thread. Calling `init` again after success is a
    /// no-op; concurrent calls share one derivation.
    ///
    /// # Results
    /// Returns the backend the service settled on.
    ///
    /// # Errors
    /// * [`CryptoError::UnsupportedEnvironment`] If no usable backend passed the probe.
    /// * [`CryptoError::Internal`] If the derivation task panicked.
    pub async fn init(&self) -> Result<Backend, CryptoError> {
        let session = self
            .inner
            .session
            .get_or_try_init(|| async {
                let backend = backend::probe().await.select(self.inner.preference)?;
                let password = self.inner.password.clone();
                let iterations = self.inner.iterations;
                let started = Instant::now();

                let keyring = tokio::task::spawn_blocking(move || {
                    Keyring::derive(backend, password.as_bytes(), iterations)
                })
                .await
                .map_err(|err| CryptoError::Internal {
                    message: format!("key derivation task failed: {err}").into(),
                    context: None,
                })??;

                debug!(
                    %backend,
                    iterations,
                    elapsed_ms = started.elapsed().as_millis(),
                    "Derived vault keys"
                );
                Ok::<_, CryptoError>(Session { backend, keyring })
            })
            .await?;

        Ok(session.backend)
    }

    /// Returns `true` once keys have been derived.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.inner.session.initialized()
    }

    /// The backend in use, once initialized.
    #[must_use]
    pub fn backend(&self) -> Option<Backend> {
        self.inner.session.get().map(|s| s.backend)
    }

    #[must_use]
    pub fn iterations(&self) -> u32 {
        self.inner.iterations
    }

    fn session(&self) -> Result<&Session, CryptoError> {
        self.inner.session.get().ok_or(CryptoError::NotInitialized { context: None })
    }

    /// Serializes `document` to JSON and encrypts it under a fresh random IV.
    ///
    /// # Results
    /// Returns the envelope as JSON text.
    ///
    /// # Errors
    /// * [`CryptoError::NotInitialized`] Before [`EncryptionService::init`].
    /// * [`CryptoError::Serialization`] If the document cannot be serialized.
    /// * [`CryptoError::Encryption`] If OS randomness is unavailable.
    pub fn encrypt<T: Serialize + ?Sized>(&self, document: &T) -> Result<String, CryptoError> {
        let session = self.session()?;
        let plaintext = Zeroizing::new(serde_json::to_vec(document).context("encoding document")?);

        let mut iv = [0u8; BLOCK_LEN];
        getrandom::fill(&mut iv).map_err(|err| CryptoError::Encryption {
            message: format!("OS randomness unavailable: {err}").into(),
            context: None,
        })?;

        let ciphertext =
            session.backend.encrypt_cbc(session.keyring.encryption_key(), &iv, &plaintext)?;
        Envelope::new(&ciphertext, &iv).to_json()
    }

    /// Decrypts an envelope and parses the plaintext as `T`.
    ///
    /// # Errors
    /// * [`CryptoError::NotInitialized`] Before [`EncryptionService::init`].
    /// * [`CryptoError::DecryptionFailed`] If the envelope is malformed, the padding is
    ///   invalid, or the plaintext is not UTF-8 JSON of the expected shape. A wrong master
    ///   password ends up here.
    pub fn decrypt<T: DeserializeOwned>(&self, envelope: &str) -> Result<T, CryptoError> {
        let session = self.session()?;
        let envelope = Envelope::parse(envelope)?;
        let iv = envelope.iv_bytes()?;
        let ciphertext = envelope.ciphertext_bytes()?;

        let plaintext = Zeroizing::new(session.backend.decrypt_cbc(
            session.keyring.encryption_key(),
            &iv,
            &ciphertext,
        )?);
        let text =
            utf8_decode(&plaintext).map_err(|_| CryptoError::decryption("plaintext is not UTF-8"))?;

        serde_json::from_str(text)
            .map_err(|_| CryptoError::decryption("plaintext is not a valid document"))
    }

    /// HMAC-SHA1 of `message` under the signing key.
    ///
    /// # Errors
    /// Returns [`CryptoError::NotInitialized`] before [`EncryptionService::init`].
    pub fn sign(&self, message: impl AsRef<[u8]>) -> Result<Vec<u8>, CryptoError> {
        let session = self.session()?;
        let tag = session.backend.hmac_sha1(session.keyring.signing_key(), message.as_ref())?;
        Ok(tag.to_vec())
    }

    /// Base64 of the signing key.
    ///
    /// # Errors
    /// Returns [`CryptoError::NotInitialized`] before [`EncryptionService::init`].
    pub fn signing_key_base64(&self) -> Result<String, CryptoError> {
        Ok(base64_encode(self.session()?.keyring.signing_key()))
    }

    /// The bearer credential presented to the store.
    ///
    /// This is the base64 signing key; it reveals nothing about the encryption key.
    ///
    /// # Errors
    /// Returns [`CryptoError::NotInitialized`] before [`EncryptionService::init`].
    pub fn authorization_token(&self) -> Result<String, CryptoError> {
        Ok(self.session()?.keyring.authorization_token())
    }
}
