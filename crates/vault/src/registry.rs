//! Open vault sessions, keyed by username.

use crate::config::VaultConfig;
use crate::engine::Vault;
use crate::error::VaultError;
use crate::persistence::Persistence;
use fxhash::FxHashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info};

/// Owns every open [`Vault`] of a process.
///
/// Sessions share one persistence backend and one configuration. Opening a session for a
/// username that already has one replaces it. Pass the registry by reference to whatever
/// needs to look sessions up; [`SessionRegistry::clear`] is the logout path.
pub struct SessionRegistry<P: Persistence> {
    persistence: Arc<P>,
    config: VaultConfig,
    sessions: RwLock<FxHashMap<String, Vault<P>>>,
}

impl<P: Persistence> std::fmt::Debug for SessionRegistry<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("config", &self.config)
            .field("sessions", &self.usernames())
            .finish_non_exhaustive()
    }
}

impl<P: Persistence> SessionRegistry<P> {
    #[must_use]
    pub fn new(persistence: P, config: VaultConfig) -> Self {
        Self::with_shared(Arc::new(persistence), config)
    }

    #[must_use]
    pub fn with_shared(persistence: Arc<P>, config: VaultConfig) -> Self {
        Self { persistence, config, sessions: RwLock::new(FxHashMap::default()) }
    }

    /// The backend every session stores through.
    #[must_use]
    pub fn persistence(&self) -> &Arc<P> {
        &self.persistence
    }

    /// Builds and initializes a session, then registers it under `username`.
    ///
    /// A session already registered under the name is replaced only once the new one is
    /// ready; a failed open leaves the registry unchanged.
    ///
    /// # Errors
    /// Any error of [`crate::VaultBuilder::build`] or [`Vault::init`].
    pub async fn open(&self, username: &str, password: &str) -> Result<Vault<P>, VaultError> {
        let vault = Vault::builder()
            .username(username)
            .password(password)
            .config(self.config.clone())
            .shared_persistence(Arc::clone(&self.persistence))
            .build()?;
        vault.init().await?;

        let replaced = self.sessions.write().insert(username.to_owned(), vault.clone());
        if replaced.is_some() {
            info!(username, "Replaced open vault session");
        } else {
            debug!(username, "Opened vault session");
        }
        Ok(vault)
    }

    #[must_use]
    pub fn get(&self, username: &str) -> Option<Vault<P>> {
        self.sessions.read().get(username).cloned()
    }

    /// Closes one session. Its keys are wiped once every clone of it is dropped.
    pub fn remove(&self, username: &str) -> Option<Vault<P>> {
        self.sessions.write().remove(username)
    }

    /// Closes every session and returns how many were open.
    pub fn clear(&self) -> usize {
        let mut sessions = self.sessions.write();
        let closed = sessions.len();
        sessions.clear();
        info!(closed, "Cleared vault sessions");
        closed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Usernames with an open session, sorted.
    #[must_use]
    pub fn usernames(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sessions.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }
}
