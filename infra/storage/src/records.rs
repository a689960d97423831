//! Keyed vault records with per-record bearer-token authorization.
//!
//! A record key (an account name) is never used as a file name directly. Its SHA-256 hex
//! digest names two files in the `records` namespace:
//!
//! ```text
//! <root>/records/<d0d1>/<d2d3>/<digest>.vault   envelope text
//! <root>/records/<d0d1>/<d2d3>/<digest>.auth    SHA-256 hex of the bearer token
//! ```
//!
//! Authorization is trust-on-first-use: the first save that presents a token registers its
//! digest, and every later save or removal must present the same token.

use crate::engine::Storage;
use crate::error::StorageError;
use crate::namespace::NamespacedStorage;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

const NAMESPACE: &str = "records";
const DATA_EXT: &str = "vault";
const AUTH_EXT: &str = "auth";

/// Key-value access to encrypted vault records.
#[derive(Debug, Clone)]
pub struct RecordStore {
    records: NamespacedStorage,
}

impl RecordStore {
    /// Opens the `records` namespace of `storage`.
    ///
    /// # Errors
    /// Never fails for the built-in namespace name; the `Result` mirrors
    /// [`Storage::namespace`].
    pub fn new(storage: &Storage) -> Result<Self, StorageError> {
        Ok(Self { records: storage.namespace(NAMESPACE)? })
    }

    /// File stem shared by a record's data and auth files.
    #[must_use]
    pub fn stem(key: &str) -> String {
        hex::encode(Sha256::digest(key.as_bytes()))
    }

    fn data_file(key: &str) -> String {
        format!("{}.{DATA_EXT}", Self::stem(key))
    }

    fn auth_file(key: &str) -> String {
        format!("{}.{AUTH_EXT}", Self::stem(key))
    }

    /// Loads the envelope stored under `key`.
    ///
    /// # Errors
    /// * [`StorageError::FileNotFound`] If nothing was ever stored under `key`.
    /// * [`StorageError::CorruptRecord`] If the stored bytes are not UTF-8.
    /// * [`StorageError::Io`] On any other I/O failure.
    pub async fn load(&self, key: &str) -> Result<String, StorageError> {
        let bytes = self.records.read(Self::data_file(key)).await?;
        String::from_utf8(bytes).map_err(|_| StorageError::CorruptRecord {
            message: "record is not UTF-8".into(),
            context: Some(Self::stem(key).into()),
        })
    }

    /// Stores `value` under `key`, enforcing the record's bearer token.
    ///
    /// A record with no registered token accepts any save; if `token` is given it becomes
    /// the registered token.
    ///
    /// # Errors
    /// * [`StorageError::Unauthorized`] If a token is registered and `token` does not match.
    /// * [`StorageError::Io`] If either file cannot be written.
    pub async fn save(
        &self,
        key: &str,
        value: &str,
        token: Option<&str>,
    ) -> Result<(), StorageError> {
        let registered = self.check_token(key, token).await?;

        if !registered && let Some(token) = token {
            self.records.write(Self::auth_file(key), token_digest(token).as_bytes()).await?;
            debug!(record = %Self::stem(key), "Registered record token");
        }

        self.records.write(Self::data_file(key), value.as_bytes()).await
    }

    /// Deletes the record and its token.
    ///
    /// # Errors
    /// * [`StorageError::Unauthorized`] If a token is registered and `token` does not match.
    /// * [`StorageError::FileNotFound`] If the record does not exist.
    pub async fn remove(&self, key: &str, token: Option<&str>) -> Result<(), StorageError> {
        let registered = self.check_token(key, token).await?;
        self.records.delete(Self::data_file(key)).await?;
        if registered {
            self.records.delete(Self::auth_file(key)).await?;
        }
        Ok(())
    }

    /// Whether a record exists under `key`.
    ///
    /// # Errors
    /// Fails only when path resolution fails.
    pub fn contains(&self, key: &str) -> Result<bool, StorageError> {
        self.records.exists(Self::data_file(key))
    }

    /// Returns whether a token is registered for `key`, failing when `token` does not
    /// match it.
    async fn check_token(&self, key: &str, token: Option<&str>) -> Result<bool, StorageError> {
        let stored = match self.records.read(Self::auth_file(key)).await {
            Ok(stored) => stored,
            Err(StorageError::FileNotFound { .. }) => return Ok(false),
            Err(err) => return Err(err),
        };

        let presented = token.map(token_digest);
        if presented.as_deref().map(str::as_bytes) == Some(stored.as_slice()) {
            Ok(true)
        } else {
            warn!(record = %Self::stem(key), "Rejected record token");
            Err(StorageError::Unauthorized {
                message: (if token.is_some() { "token mismatch" } else { "token required" }).into(),
                context: Some(Self::stem(key).into()),
            })
        }
    }
}

fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
