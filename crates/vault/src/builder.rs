use crate::config::VaultConfig;
use crate::engine::{Vault, VaultInner};
use crate::error::VaultError;
use crate::persistence::Persistence;
use passio_crypto::EncryptionService;
use private::Sealed;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use zeroize::Zeroizing;

#[derive(Debug, Default)]
pub struct NoPersistence;

pub struct WithPersistence<P>(Arc<P>);

mod private {
    pub trait Sealed {}
}
impl Sealed for NoPersistence {}
impl<P> Sealed for WithPersistence<P> {}

/// A builder for a [`Vault`].
///
/// [`VaultBuilder::build`] exists only once a persistence backend is set. A missing
/// username or master password is reported by `build`, before any key is derived.
pub struct VaultBuilder<P: Persistence, S: Sealed = NoPersistence> {
    username: Option<String>,
    password: Option<Zeroizing<String>>,
    config: VaultConfig,
    persistence: S,
    backend: PhantomData<fn() -> P>,
}

impl<P: Persistence, S: Sealed> fmt::Debug for VaultBuilder<P, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultBuilder")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<P: Persistence> VaultBuilder<P> {
    #[must_use = "Builder must be given a persistence backend before use"]
    pub fn new() -> Self {
        Self {
            username: None,
            password: None,
            config: VaultConfig::default(),
            persistence: NoPersistence,
            backend: PhantomData,
        }
    }

    /// Sets the store the vault reads and writes.
    #[must_use]
    pub fn persistence(self, persistence: P) -> VaultBuilder<P, WithPersistence<P>> {
        self.shared_persistence(Arc::new(persistence))
    }

    /// Sets a store shared with other vaults.
    #[must_use]
    pub fn shared_persistence(self, persistence: Arc<P>) -> VaultBuilder<P, WithPersistence<P>> {
        VaultBuilder {
            username: self.username,
            password: self.password,
            config: self.config,
            persistence: WithPersistence(persistence),
            backend: PhantomData,
        }
    }
}

impl<P: Persistence> Default for VaultBuilder<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Persistence, S: Sealed> VaultBuilder<P, S> {
    /// The account name, also the key the document is stored under.
    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// The master password. It is wiped from memory with the builder.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(Zeroizing::new(password.into()));
        self
    }

    #[must_use]
    pub fn config(mut self, config: VaultConfig) -> Self {
        self.config = config;
        self
    }
}

impl<P: Persistence> VaultBuilder<P, WithPersistence<P>> {
    /// Finalizes the vault. Nothing is derived or retrieved until [`Vault::init`].
    ///
    /// # Errors
    /// Returns [`VaultError::InvalidConfiguration`] if the username or master password is
    /// missing or empty, or the configuration is out of range.
    pub fn build(self) -> Result<Vault<P>, VaultError> {
        let username = self
            .username
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| VaultError::invalid("a username is required"))?;
        let password = self
            .password
            .filter(|password| !password.is_empty())
            .ok_or_else(|| VaultError::invalid("a master password is required"))?;
        self.config.validate()?;

        let crypto = EncryptionService::builder()
            .password(password.as_str())
            .iterations(self.config.iterations)
            .backend(self.config.backend)
            .build()?;

        Ok(Vault::from_inner(VaultInner::new(
            username,
            self.config,
            crypto,
            self.persistence.0,
        )))
    }
}
