//! The per-account vault session.

use crate::builder::{NoPersistence, VaultBuilder};
use crate::config::VaultConfig;
use crate::error::VaultError;
use crate::generator::generate_password;
use crate::history::{HistoryAction, HistoryOptions, HistoryTarget, PropertyChange, RevertOptions};
use crate::model::{self, Entry, EntryDraft, EntryId, Field, VaultDocument};
use crate::persistence::Persistence;
use crate::search::{SearchHit, SearchIndex};
use fxhash::FxHashMap;
use parking_lot::Mutex;
use passio_crypto::EncryptionService;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Lifecycle of a [`Vault`].
///
/// `Uninitialized → Loading → Ready`, or `Loading → Failed`. Both `Ready` and `Failed` are
/// final for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultState {
    Uninitialized,
    Loading,
    Ready,
    Failed,
}

/// Options for [`Vault::put_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PutOptions {
    /// Create the entry even though the draft carries an id, keeping that id.
    pub force_create: bool,
    pub history: HistoryOptions,
}

/// What a mutation did to the document.
enum Outcome<T> {
    Unchanged(T),
    /// The document changed and must be stored; `touched` stays volatile until then.
    Changed { value: T, touched: Option<EntryId> },
}

impl<T> Outcome<T> {
    fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Unchanged(value) => Outcome::Unchanged(f(value)),
            Self::Changed { value, touched } => Outcome::Changed { value: f(value), touched },
        }
    }
}

/// An encrypted snapshot of one document revision, on its way to the store.
struct Ticket {
    envelope: String,
    revision: u64,
    touched: Option<EntryId>,
}

struct Session {
    state: VaultState,
    document: VaultDocument,
    /// Bumped by every mutation that needs storing.
    revision: u64,
    /// Volatile entries and the revision of their latest mutation.
    pending: FxHashMap<EntryId, u64>,
    raw: Option<String>,
}

impl Session {
    fn new() -> Self {
        Self {
            state: VaultState::Uninitialized,
            document: VaultDocument::default(),
            revision: 0,
            pending: FxHashMap::default(),
            raw: None,
        }
    }

    fn ensure_ready(&self) -> Result<(), VaultError> {
        match self.state {
            VaultState::Ready => Ok(()),
            VaultState::Uninitialized => Err(VaultError::not_ready("call init first")),
            VaultState::Loading => Err(VaultError::not_ready("initialization in progress")),
            VaultState::Failed => Err(VaultError::not_ready("initialization failed")),
        }
    }

    fn apply_put(
        &mut self,
        draft: EntryDraft,
        options: PutOptions,
        password_length: usize,
    ) -> Result<Outcome<Entry>, VaultError> {
        let EntryDraft { id, description, url, username, password } = draft;
        let password = match password {
            Some(password) if !password.is_empty() => password,
            _ => generate_password(password_length),
        };
        let now = model::now();
        let entry = Entry {
            id: id.unwrap_or_default(),
            description,
            url,
            username,
            password,
            created: now,
            modified: now,
            volatile: true,
        };

        match id {
            Some(id) if !options.force_create => self.apply_update(entry, now, options.history),
            requested => self.insert(requested, entry, options.history),
        }
    }

    fn apply_update(
        &mut self,
        mut next: Entry,
        now: chrono::DateTime<chrono::Utc>,
        history: HistoryOptions,
    ) -> Result<Outcome<Entry>, VaultError> {
        let id = next.id;
        let Some(current) = self.document.get_mut(id) else {
            return Err(VaultError::EntryNotFound { id, context: None });
        };

        let properties: Vec<PropertyChange> = Field::ALL
            .into_iter()
            .filter(|&key| current.field(key) != next.field(key))
            .map(|key| PropertyChange {
                key,
                before: current.field(key).to_owned(),
                after: next.field(key).to_owned(),
            })
            .collect();
        if properties.is_empty() {
            return Ok(Outcome::Unchanged(current.clone()));
        }

        next.created = current.created;
        next.modified = if current.password == next.password { current.modified } else { now };
        *current = next.clone();

        self.document.record(HistoryAction::Update { id, properties }, history);
        Ok(Outcome::Changed { value: next, touched: Some(id) })
    }

    /// Appends `entry`, allocating an id unless one is requested.
    fn insert(
        &mut self,
        requested: Option<EntryId>,
        mut entry: Entry,
        history: HistoryOptions,
    ) -> Result<Outcome<Entry>, VaultError> {
        let doc = &mut self.document;
        entry.id = match requested {
            Some(id) if doc.get(id).is_some() => {
                return Err(VaultError::DuplicateEntry { id, context: None });
            },
            Some(id) => {
                doc.next_id = doc.next_id.max(id.saturating_add(1));
                id
            },
            None => {
                let id = doc.next_id;
                doc.next_id += 1;
                id
            },
        };
        entry.volatile = true;

        let id = entry.id;
        doc.entries.push(entry.clone());
        doc.record(HistoryAction::Create { id }, history);
        Ok(Outcome::Changed { value: entry, touched: Some(id) })
    }

    fn apply_unput(
        &mut self,
        id: EntryId,
        history: HistoryOptions,
    ) -> Result<Outcome<Entry>, VaultError> {
        let Some(index) = self.document.position(id) else {
            return Err(VaultError::EntryNotFound { id, context: None });
        };
        let mut removed = self.document.entries.remove(index);
        removed.volatile = false;
        self.pending.remove(&id);

        self.document.record(HistoryAction::Delete { entry: removed.clone() }, history);
        Ok(Outcome::Changed { value: removed, touched: None })
    }

    fn apply_revert(
        &mut self,
        action: HistoryAction,
        history: HistoryOptions,
        password_length: usize,
    ) -> Result<Outcome<()>, VaultError> {
        let outcome = match action {
            HistoryAction::Create { id } => self.apply_unput(id, history)?,
            HistoryAction::Update { id, properties } => {
                let mut draft = self
                    .document
                    .get(id)
                    .ok_or(VaultError::EntryNotFound { id, context: Some("revert".into()) })?
                    .to_draft();
                for change in properties {
                    draft.set(change.key, change.before);
                }
                self.apply_put(draft, PutOptions { force_create: false, history }, password_length)?
            },
            HistoryAction::Delete { entry } => self.insert(Some(entry.id), entry, history)?,
        };
        Ok(outcome.map(drop))
    }

    /// Pops the newest action from `from` and reverts it into the opposite log.
    ///
    /// A failed revert puts the action back.
    fn apply_step(
        &mut self,
        from: HistoryTarget,
        password_length: usize,
    ) -> Result<Outcome<bool>, VaultError> {
        let Some(action) = self.document.log_mut(from).pop() else {
            return Ok(Outcome::Unchanged(false));
        };

        let history = HistoryOptions::replay(from.opposite());
        match self.apply_revert(action.clone(), history, password_length) {
            Ok(Outcome::Changed { touched, .. }) => Ok(Outcome::Changed { value: true, touched }),
            // The popped log still has to be stored.
            Ok(Outcome::Unchanged(())) => Ok(Outcome::Changed { value: true, touched: None }),
            Err(err) => {
                self.document.log_mut(from).push(action);
                Err(err)
            },
        }
    }

    fn seal(
        &mut self,
        crypto: &EncryptionService,
        touched: Option<EntryId>,
    ) -> Result<Ticket, VaultError> {
        self.revision += 1;
        if let Some(id) = touched {
            self.pending.insert(id, self.revision);
        }
        let envelope = crypto.encrypt(&self.document)?;
        Ok(Ticket { envelope, revision: self.revision, touched })
    }

    /// Clears the volatile flag set by `ticket`, unless a later mutation owns it now.
    fn settle(&mut self, ticket: &Ticket) -> bool {
        let Some(id) = ticket.touched else {
            return false;
        };
        if self.pending.get(&id) != Some(&ticket.revision) {
            return false;
        }
        self.pending.remove(&id);
        if let Some(entry) = self.document.get_mut(id) {
            entry.volatile = false;
        }
        true
    }
}

/// Moves a session out of `Loading` even when the `init` future is dropped midway.
struct LoadingGuard<'a> {
    session: &'a Mutex<Session>,
    settled: bool,
}

impl LoadingGuard<'_> {
    fn settle(mut self, state: VaultState) {
        self.session.lock().state = state;
        self.settled = true;
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.session.lock().state = VaultState::Failed;
            warn!("Vault initialization was cancelled");
        }
    }
}

pub(crate) struct VaultInner<P> {
    pub(crate) username: String,
    pub(crate) config: VaultConfig,
    pub(crate) crypto: EncryptionService,
    pub(crate) persistence: Arc<P>,
    session: Mutex<Session>,
}

impl<P> VaultInner<P> {
    pub(crate) fn new(
        username: String,
        config: VaultConfig,
        crypto: EncryptionService,
        persistence: Arc<P>,
    ) -> Self {
        Self { username, config, crypto, persistence, session: Mutex::new(Session::new()) }
    }
}

/// One account's decrypted vault.
///
/// Entries live in memory; every mutation re-encrypts the whole document and hands it to
/// the [`Persistence`] store. The history bookkeeping of a mutation happens synchronously,
/// before its store starts, so overlapping mutations never interleave their bookkeeping.
/// Their stores may overlap; the last one to finish decides what is stored.
///
/// Cloning is cheap and clones share the session.
///
/// # Example
/// ```rust
/// use passio_vault::prelude::*;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), VaultError> {
/// let vault = Vault::builder()
///     .username("alice")
///     .password("correct horse battery staple")
///     .persistence(MemoryPersistence::new())
///     .build()?;
/// vault.init().await?;
///
/// let entry = vault.put(EntryDraft::new().description("Mail").username("alice")).await?;
/// assert_eq!(entry.password.len(), 15);
///
/// vault.undo().await?;
/// assert!(vault.entries().is_empty());
/// # Ok(())
/// # }
/// ```
pub struct Vault<P: Persistence> {
    inner: Arc<VaultInner<P>>,
}

impl<P: Persistence> Clone for Vault<P> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<P: Persistence> fmt::Debug for Vault<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vault")
            .field("username", &self.inner.username)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl<P: Persistence> Vault<P> {
    #[must_use = "The vault is not usable until you call .build() and .init()"]
    pub fn builder() -> VaultBuilder<P, NoPersistence> {
        VaultBuilder::new()
    }

    pub(crate) fn from_inner(inner: VaultInner<P>) -> Self {
        Self { inner: Arc::new(inner) }
    }

    /// Derives the keys and loads the account's document.
    ///
    /// Key derivation and retrieval run concurrently. An account with no stored vault gets
    /// an empty document, which is stored immediately. Calling `init` on a ready vault is a
    /// no-op.
    ///
    /// # Errors
    /// * [`VaultError::UnsupportedEnvironment`] If no cryptographic backend is usable.
    /// * [`VaultError::InitializationFailed`] If retrieval fails other than with "not
    ///   found", or the first store of a new vault fails.
    /// * [`VaultError::DecryptionFailed`] If the master password is wrong or the stored
    ///   document is corrupt.
    /// * [`VaultError::NotReady`] If another `init` is running or a previous one failed.
    ///   Dropping the `init` future before it completes also leaves the session failed.
    #[instrument(skip(self), fields(username = %self.inner.username))]
    pub async fn init(&self) -> Result<(), VaultError> {
        {
            let mut session = self.inner.session.lock();
            match session.state {
                VaultState::Ready => return Ok(()),
                VaultState::Uninitialized => session.state = VaultState::Loading,
                VaultState::Loading | VaultState::Failed => session.ensure_ready()?,
            }
        }

        let started = Instant::now();
        let loading = LoadingGuard { session: &self.inner.session, settled: false };
        let result = self.load().await;
        loading.settle(if result.is_ok() { VaultState::Ready } else { VaultState::Failed });

        match &result {
            Ok(()) => info!(elapsed_ms = started.elapsed().as_millis(), "Vault ready"),
            Err(err) => warn!(kind = err.kind(), error = %err, "Vault initialization failed"),
        }
        result
    }

    async fn load(&self) -> Result<(), VaultError> {
        let inner = &self.inner;
        let (backend, retrieved) =
            tokio::join!(inner.crypto.init(), inner.persistence.retrieve(&inner.username));
        let backend = backend?;
        debug!(%backend, "Encryption service ready");

        match retrieved {
            Ok(envelope) => {
                let mut document: VaultDocument = inner.crypto.decrypt(&envelope)?;
                document.repair().map_err(|id| VaultError::DecryptionFailed {
                    message: format!("document lists entry {id} more than once").into(),
                    context: None,
                })?;
                debug!(entries = document.entries.len(), "Vault decrypted");

                let mut session = inner.session.lock();
                session.document = document;
                session.raw = Some(envelope);
                Ok(())
            },
            Err(err) if err.is_not_found() => {
                info!("No stored vault, creating an empty one");
                let ticket = {
                    let mut session = inner.session.lock();
                    session.document = VaultDocument::default();
                    session.seal(&inner.crypto, None)?
                };
                match self.commit(ticket).await {
                    Err(VaultError::PersistenceFailed { cause, .. }) => {
                        Err(VaultError::InitializationFailed {
                            cause,
                            context: Some("storing the new vault".into()),
                        })
                    },
                    other => other.map(drop),
                }
            },
            Err(cause) => Err(VaultError::InitializationFailed { cause, context: None }),
        }
    }

    /// Stores a sealed revision. Returns whether this store cleared its entry's volatile
    /// flag.
    async fn commit(&self, ticket: Ticket) -> Result<bool, VaultError> {
        let inner = &self.inner;
        let token = inner.crypto.authorization_token()?;
        let stored =
            inner.persistence.store(&inner.username, &ticket.envelope, Some(&token)).await;

        match stored {
            Ok(()) => {
                let mut session = inner.session.lock();
                let settled = session.settle(&ticket);
                session.raw = Some(ticket.envelope);
                debug!(revision = ticket.revision, "Vault stored");
                Ok(settled)
            },
            Err(cause) => {
                warn!(
                    revision = ticket.revision,
                    kind = cause.kind(),
                    error = %cause,
                    "Vault store failed"
                );
                Err(VaultError::PersistenceFailed { cause, context: None })
            },
        }
    }

    /// Applies a mutation under the session lock, then stores the result outside it.
    ///
    /// Returns the mutation's value and whether a store cleared its volatile flag.
    async fn mutate<T>(
        &self,
        apply: impl FnOnce(&mut Session) -> Result<Outcome<T>, VaultError>,
    ) -> Result<(T, bool), VaultError> {
        let (value, ticket) = {
            let mut session = self.inner.session.lock();
            session.ensure_ready()?;
            match apply(&mut session)? {
                Outcome::Unchanged(value) => (value, None),
                Outcome::Changed { value, touched } => {
                    (value, Some(session.seal(&self.inner.crypto, touched)?))
                },
            }
        };

        let settled = match ticket {
            Some(ticket) => self.commit(ticket).await?,
            None => false,
        };
        Ok((value, settled))
    }

    /// Creates or updates an entry, recording it in the undo log and clearing the redo log.
    ///
    /// See [`Vault::put_with`].
    ///
    /// # Errors
    /// See [`Vault::put_with`].
    pub async fn put(&self, draft: EntryDraft) -> Result<Entry, VaultError> {
        self.put_with(draft, PutOptions::default()).await
    }

    /// Creates or updates an entry.
    ///
    /// A draft without an id, or any draft with `force_create`, creates an entry stamped
    /// with the current time. Otherwise the entry with the draft's id is replaced and an
    /// `Update` action lists the fields that changed; `modified` moves only if the password
    /// did. An update that changes nothing records nothing and stores nothing.
    ///
    /// A missing or empty password is replaced with a generated one.
    ///
    /// # Returns
    /// The entry as applied. It is `volatile` if the store has not confirmed it.
    ///
    /// # Errors
    /// * [`VaultError::NotReady`] Before a successful `init`.
    /// * [`VaultError::EntryNotFound`] If an update names an unknown id.
    /// * [`VaultError::DuplicateEntry`] If `force_create` names an id in use.
    /// * [`VaultError::PersistenceFailed`] If the store failed. The change stays applied in
    ///   memory and the entry stays volatile.
    pub async fn put_with(
        &self,
        draft: EntryDraft,
        options: PutOptions,
    ) -> Result<Entry, VaultError> {
        let length = self.inner.config.password_length;
        let (mut entry, settled) =
            self.mutate(|session| session.apply_put(draft, options, length)).await?;
        entry.volatile &= !settled;
        debug!(id = entry.id, "Entry saved");
        Ok(entry)
    }

    /// Deletes an entry, recording its snapshot in the undo log.
    ///
    /// # Errors
    /// See [`Vault::unput_with`].
    pub async fn unput(&self, id: EntryId) -> Result<Entry, VaultError> {
        self.unput_with(id, HistoryOptions::default()).await
    }

    /// Deletes an entry and returns it.
    ///
    /// # Errors
    /// * [`VaultError::NotReady`] Before a successful `init`.
    /// * [`VaultError::EntryNotFound`] If no entry has `id`; nothing changes.
    /// * [`VaultError::PersistenceFailed`] If the store failed. The entry stays deleted in
    ///   memory.
    pub async fn unput_with(
        &self,
        id: EntryId,
        history: HistoryOptions,
    ) -> Result<Entry, VaultError> {
        let (removed, _) = self.mutate(|session| session.apply_unput(id, history)).await?;
        debug!(id, "Entry deleted");
        Ok(removed)
    }

    /// Appends `action` to a history log without touching entries or the store.
    ///
    /// The change is stored with the next mutation.
    ///
    /// # Errors
    /// Returns [`VaultError::NotReady`] before a successful `init`.
    pub fn add_history(
        &self,
        action: HistoryAction,
        options: HistoryOptions,
    ) -> Result<(), VaultError> {
        let mut session = self.inner.session.lock();
        session.ensure_ready()?;
        session.document.record(action, options);
        Ok(())
    }

    /// Inverts `action` through the ordinary mutation paths.
    ///
    /// `Create` deletes the entry, `Update` writes back every `before` value and `Delete`
    /// re-inserts the snapshot under its original id. The inverse is recorded in
    /// `options.target`.
    ///
    /// # Errors
    /// Any error of [`Vault::put_with`] or [`Vault::unput_with`].
    pub async fn revert(
        &self,
        action: HistoryAction,
        options: RevertOptions,
    ) -> Result<(), VaultError> {
        let length = self.inner.config.password_length;
        let history = options.into();
        self.mutate(|session| session.apply_revert(action, history, length)).await.map(drop)
    }

    /// Reverts the newest undo action, moving its inverse to the redo log.
    ///
    /// # Returns
    /// `false` if there was nothing to undo.
    ///
    /// # Errors
    /// Any error of [`Vault::revert`]. If the revert itself fails the action stays in the
    /// undo log; if only the store fails it has moved.
    pub async fn undo(&self) -> Result<bool, VaultError> {
        self.step(HistoryTarget::Undo).await
    }

    /// Reverts the newest redo action, moving its inverse to the undo log.
    ///
    /// # Returns
    /// `false` if there was nothing to redo.
    ///
    /// # Errors
    /// See [`Vault::undo`].
    pub async fn redo(&self) -> Result<bool, VaultError> {
        self.step(HistoryTarget::Redo).await
    }

    async fn step(&self, from: HistoryTarget) -> Result<bool, VaultError> {
        let length = self.inner.config.password_length;
        let (stepped, _) = self.mutate(|session| session.apply_step(from, length)).await?;
        Ok(stepped)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.inner.session.lock().document.undo_history.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.inner.session.lock().document.redo_history.is_empty()
    }

    /// A copy of the entry with `id`.
    #[must_use]
    pub fn get(&self, id: EntryId) -> Option<Entry> {
        self.inner.session.lock().document.get(id).cloned()
    }

    /// Copies of all entries, in display order.
    #[must_use]
    pub fn entries(&self) -> Vec<Entry> {
        self.inner.session.lock().document.entries.clone()
    }

    /// Entries matching `query`, best first. An empty query matches nothing.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        let session = self.inner.session.lock();
        SearchIndex::new(&session.document.entries).search(query)
    }

    /// A copy of the whole decrypted document.
    #[must_use]
    pub fn document(&self) -> VaultDocument {
        self.inner.session.lock().document.clone()
    }

    #[must_use]
    pub fn undo_history(&self) -> Vec<HistoryAction> {
        self.inner.session.lock().document.undo_history.clone()
    }

    #[must_use]
    pub fn redo_history(&self) -> Vec<HistoryAction> {
        self.inner.session.lock().document.redo_history.clone()
    }

    /// The envelope most recently retrieved or successfully stored.
    #[must_use]
    pub fn raw(&self) -> Option<String> {
        self.inner.session.lock().raw.clone()
    }

    #[must_use]
    pub fn state(&self) -> VaultState {
        self.inner.session.lock().state
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state() == VaultState::Ready
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.inner.username
    }

    #[must_use]
    pub fn config(&self) -> &VaultConfig {
        &self.inner.config
    }

    /// The bearer credential presented to the store.
    ///
    /// # Errors
    /// Returns [`VaultError::Crypto`] before the keys are derived.
    pub fn authorization_token(&self) -> Result<String, VaultError> {
        Ok(self.inner.crypto.authorization_token()?)
    }
}
