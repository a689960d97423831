use passio_storage::{RecordStore, Storage, StorageError};
use passio_vault::persistence::{Persistence, PersistenceError};
use std::path::Path;
use tracing::debug;

/// Vault persistence on the local filesystem, one sharded record per account.
#[derive(Debug, Clone)]
pub struct FileBackend {
    records: RecordStore,
}

impl FileBackend {
    /// Connects to the storage root, creating it when missing.
    ///
    /// # Errors
    /// Returns the storage error when the root cannot be created or resolved.
    pub async fn open(root: &Path) -> Result<Self, StorageError> {
        let storage = Storage::builder().root(root).connect().await?;
        Ok(Self::new(RecordStore::new(&storage)?))
    }

    #[must_use]
    pub const fn new(records: RecordStore) -> Self {
        Self { records }
    }
}

fn classify(err: StorageError) -> PersistenceError {
    match err {
        StorageError::FileNotFound { message, context } => {
            PersistenceError::NotFound { message, context }
        },
        StorageError::Unauthorized { message, context } => {
            PersistenceError::Unauthorized { message, context }
        },
        other => PersistenceError::transport(other),
    }
}

impl Persistence for FileBackend {
    async fn retrieve(&self, key: &str) -> Result<String, PersistenceError> {
        self.records.load(key).await.map_err(classify)
    }

    async fn store(
        &self,
        key: &str,
        value: &str,
        auth: Option<&str>,
    ) -> Result<(), PersistenceError> {
        self.records.save(key, value, auth).await.map_err(classify)?;
        debug!(bytes = value.len(), "Stored vault record");
        Ok(())
    }
}
