use super::{Persistence, PersistenceError};
use fxhash::FxHashMap;
use parking_lot::Mutex;
use std::io;
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug)]
struct Record {
    value: String,
    token: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    records: FxHashMap<String, Record>,
    stores: usize,
    retrieves: usize,
    fail_stores: bool,
    fail_retrievals: bool,
}

/// A process-local store with trust-on-first-use authorization.
///
/// The first store that presents a token registers it for the key; later stores must
/// present the same token. Besides serving embedders that need no durable storage, it lets
/// tests inject transport failures and hold writes in flight.
///
/// # Example
/// ```rust
/// use passio_vault::persistence::{MemoryPersistence, Persistence};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let store = MemoryPersistence::new();
/// assert!(store.retrieve("alice").await.unwrap_err().is_not_found());
///
/// store.store("alice", "envelope", Some("token")).await.unwrap();
/// assert!(store.store("alice", "forged", Some("other")).await.is_err());
/// assert_eq!(store.retrieve("alice").await.unwrap(), "envelope");
/// # }
/// ```
#[derive(Debug)]
pub struct MemoryPersistence {
    state: Mutex<State>,
    gate: watch::Sender<bool>,
}

impl Default for MemoryPersistence {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPersistence {
    #[must_use]
    pub fn new() -> Self {
        Self { state: Mutex::new(State::default()), gate: watch::Sender::new(true) }
    }

    /// Seeds a record without a token, bypassing authorization.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.state
            .lock()
            .records
            .insert(key.into(), Record { value: value.into(), token: None });
    }

    /// The stored value, read without going through [`Persistence::retrieve`].
    #[must_use]
    pub fn value(&self, key: &str) -> Option<String> {
        self.state.lock().records.get(key).map(|record| record.value.clone())
    }

    /// The token registered for `key`, if any.
    #[must_use]
    pub fn token(&self, key: &str) -> Option<String> {
        self.state.lock().records.get(key).and_then(|record| record.token.clone())
    }

    /// Number of successful stores.
    #[must_use]
    pub fn store_count(&self) -> usize {
        self.state.lock().stores
    }

    /// Number of retrieval attempts, failed ones included.
    #[must_use]
    pub fn retrieve_count(&self) -> usize {
        self.state.lock().retrieves
    }

    /// Makes every store fail with a transport error until reset.
    pub fn fail_stores(&self, fail: bool) {
        self.state.lock().fail_stores = fail;
    }

    /// Makes every retrieval fail with a transport error until reset.
    pub fn fail_retrievals(&self, fail: bool) {
        self.state.lock().fail_retrievals = fail;
    }

    /// Holds every subsequent store until [`MemoryPersistence::open_gate`].
    pub fn close_gate(&self) {
        self.gate.send_replace(false);
    }

    pub fn open_gate(&self) {
        self.gate.send_replace(true);
    }
}

impl Persistence for MemoryPersistence {
    async fn retrieve(&self, key: &str) -> Result<String, PersistenceError> {
        let mut state = self.state.lock();
        state.retrieves += 1;
        if state.fail_retrievals {
            return Err(PersistenceError::transport(io::Error::other("retrieval failure injected")));
        }
        state.records.get(key).map(|record| record.value.clone()).ok_or_else(|| {
            PersistenceError::NotFound { message: key.to_owned().into(), context: None }
        })
    }

    async fn store(
        &self,
        key: &str,
        value: &str,
        auth: Option<&str>,
    ) -> Result<(), PersistenceError> {
        let mut gate = self.gate.subscribe();
        gate.wait_for(|open| *open).await.map_err(|_| PersistenceError::Internal {
            message: "store gate closed".into(),
            context: Some(key.to_owned().into()),
        })?;

        let mut state = self.state.lock();
        if state.fail_stores {
            return Err(PersistenceError::transport(io::Error::other("store failure injected")));
        }

        let token = match state.records.get(key).and_then(|record| record.token.as_deref()) {
            Some(registered) if auth != Some(registered) => {
                return Err(PersistenceError::Unauthorized {
                    message: "token does not match the registered one".into(),
                    context: Some(key.to_owned().into()),
                });
            },
            Some(registered) => Some(registered.to_owned()),
            None => auth.map(str::to_owned),
        };

        state.records.insert(key.to_owned(), Record { value: value.to_owned(), token });
        state.stores += 1;
        debug!(key, bytes = value.len(), "Stored record in memory");
        Ok(())
    }
}
