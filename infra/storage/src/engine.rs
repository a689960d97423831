//! The [`Storage`] handle: sandboxed, atomic file I/O under a single root directory.

use crate::builder::StorageBuilder;
use crate::error::{StorageError, StorageErrorExt};
use crate::maintenance::{self, PurgeReport};
use crate::namespace::{NamespaceName, NamespacedStorage};
use crate::security;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Marker inserted into temp file names; the purge sweep matches on it.
pub(crate) const TMP_MARKER: &str = ".passiotmp.";

#[derive(Debug)]
pub(crate) struct StorageInner {
    /// Canonical physical root; every resolved path must stay beneath it.
    root: PathBuf,
    stale_after: Duration,
    tmp_counter: AtomicU64,
}

impl StorageInner {
    pub(crate) const fn new(root: PathBuf, stale_after: Duration) -> Self {
        Self { root, stale_after, tmp_counter: AtomicU64::new(1) }
    }
}

/// A thread-safe handle to a storage root.
///
/// Every path is resolved relative to the root and rejected if it would escape it, through
/// `..`, an absolute path or a symlinked ancestor. Files land in two levels of shard
/// directories taken from the first four characters of the file name, and writes replace
/// the target atomically.
///
/// Cloning is cheap; clones share the root and the temp-name counter.
///
/// # Example
///
/// ```rust
/// use passio_storage::{Storage, StorageError};
///
/// #[tokio::main]
/// async fn main() -> Result<(), StorageError> {
///     # let tmp = tempfile::tempdir().unwrap();
///     # let root = tmp.path().join("data");
///     let storage = Storage::builder().root(&root).connect().await?;
///
///     storage.write("settings.json", b"{}").await?;
///     assert_eq!(storage.read("settings.json").await?, b"{}");
///
///     let records = storage.namespace("records")?;
///     records.write("abcdef.vault", b"envelope").await?;
///     assert!(records.resolve("abcdef.vault")?.ends_with("records/ab/cd/abcdef.vault"));
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Storage {
    inner: Arc<StorageInner>,
}

impl Storage {
    pub(crate) fn from_inner(inner: StorageInner) -> Self {
        Self { inner: Arc::new(inner) }
    }

    #[must_use = "The storage engine is not initialized until you call .connect()"]
    pub fn builder() -> StorageBuilder {
        StorageBuilder::new()
    }

    /// The canonical root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Returns a view whose paths all live under `<root>/<name>/`.
    ///
    /// Names are lowercased and may contain only ASCII letters, digits and underscores.
    ///
    /// # Errors
    /// Returns [`StorageError::PathTraversalAttempt`] if the name is empty or contains
    /// illegal characters.
    pub fn namespace<N>(&self, name: N) -> Result<NamespacedStorage, StorageError>
    where
        N: TryInto<NamespaceName, Error = StorageError>,
    {
        Ok(NamespacedStorage::new(self.clone(), name.try_into()?))
    }

    /// Resolves `path` to its sharded physical location inside the root.
    ///
    /// # Errors
    /// * [`StorageError::PathTraversalAttempt`] If the path escapes the sandbox.
    /// * [`StorageError::Io`] If an existing ancestor cannot be verified.
    pub fn resolve(&self, path: impl AsRef<Path>) -> Result<PathBuf, StorageError> {
        self.resolve_in(None, path)
    }

    pub(crate) fn resolve_in(
        &self,
        namespace: Option<&str>,
        path: impl AsRef<Path>,
    ) -> Result<PathBuf, StorageError> {
        security::resolve_sharded(&self.inner.root, namespace, path.as_ref())
    }

    /// Reads a whole file.
    ///
    /// # Errors
    /// * [`StorageError::FileNotFound`] If the file does not exist.
    /// * [`StorageError::PathTraversalAttempt`] If the path escapes the sandbox.
    /// * [`StorageError::Io`] On any other I/O failure.
    pub async fn read(&self, path: impl AsRef<Path>) -> Result<Vec<u8>, StorageError> {
        self.read_in(None, path).await
    }

    pub(crate) async fn read_in(
        &self,
        namespace: Option<&str>,
        path: impl AsRef<Path>,
    ) -> Result<Vec<u8>, StorageError> {
        let resolved = self.resolve_in(namespace, path)?;
        let data = fs::read(&resolved).await.map_err(|err| io_failure(err, &resolved, "Read"))?;
        debug!(path = %resolved.display(), bytes = data.len(), "File read");
        Ok(data)
    }

    /// Replaces a file atomically.
    ///
    /// The data goes to a fresh temp file next to the target (`<name>.passiotmp.<n>`), which
    /// is synced and then renamed over the target; the parent directory is synced last.
    /// Readers therefore see either the old or the new contents, never a mix. Where rename
    /// cannot replace an existing file, the target is removed first.
    ///
    /// # Errors
    /// * [`StorageError::PathTraversalAttempt`] If the path escapes the sandbox.
    /// * [`StorageError::Io`] If the disk is full or the write fails.
    pub async fn write(&self, path: impl AsRef<Path>, data: &[u8]) -> Result<(), StorageError> {
        self.write_in(None, path, data).await
    }

    pub(crate) async fn write_in(
        &self,
        namespace: Option<&str>,
        path: impl AsRef<Path>,
        data: &[u8],
    ) -> Result<(), StorageError> {
        let resolved = self.resolve_in(namespace, path)?;

        if let Some(parent) = resolved.parent() {
            fs::create_dir_all(parent)
                .await
                .context(format!("Failed to create shards for {}", resolved.display()))?;
        }

        let temp = self.tmp_path(&resolved);
        {
            let mut file = fs::OpenOptions::new()
                .create_new(true)
                .write(true)
                .open(&temp)
                .await
                .context(format!("Temp creation failed: {}", temp.display()))?;
            file.write_all(data).await.context("Write failed")?;
            file.sync_all().await.context("Hardware sync failed")?;
        }

        if let Err(err) = fs::rename(&temp, &resolved).await {
            if err.kind() != ErrorKind::AlreadyExists {
                let _ = fs::remove_file(&temp).await;
                return Err(StorageError::Io {
                    source: err,
                    context: Some(format!("Atomic swap failed: {}", resolved.display()).into()),
                });
            }
            fs::remove_file(&resolved)
                .await
                .context(format!("Failed to replace existing file: {}", resolved.display()))?;
            fs::rename(&temp, &resolved)
                .await
                .context(format!("Atomic swap failed: {}", resolved.display()))?;
        }

        if let Some(parent) = resolved.parent() {
            sync_dir(parent).await;
        }

        debug!(path = %resolved.display(), bytes = data.len(), "File saved atomically");
        Ok(())
    }

    /// Removes a file.
    ///
    /// # Errors
    /// * [`StorageError::FileNotFound`] If the file does not exist.
    /// * [`StorageError::Io`] On any other I/O failure.
    pub async fn delete(&self, path: impl AsRef<Path>) -> Result<(), StorageError> {
        self.delete_in(None, path).await
    }

    pub(crate) async fn delete_in(
        &self,
        namespace: Option<&str>,
        path: impl AsRef<Path>,
    ) -> Result<(), StorageError> {
        let resolved = self.resolve_in(namespace, path)?;
        fs::remove_file(&resolved).await.map_err(|err| io_failure(err, &resolved, "Delete"))?;
        debug!(path = %resolved.display(), "File deleted");
        Ok(())
    }

    /// Checks whether a file exists.
    ///
    /// # Errors
    /// Fails only when path resolution fails.
    pub fn exists(&self, path: impl AsRef<Path>) -> Result<bool, StorageError> {
        self.exists_in(None, path)
    }

    pub(crate) fn exists_in(
        &self,
        namespace: Option<&str>,
        path: impl AsRef<Path>,
    ) -> Result<bool, StorageError> {
        Ok(self.resolve_in(namespace, path)?.is_file())
    }

    /// Removes temp files older than the configured threshold, plus empty shard
    /// directories.
    pub async fn purge_tmp(&self) -> PurgeReport {
        maintenance::purge_tmp(&self.inner.root, self.inner.stale_after).await
    }

    fn tmp_path(&self, target: &Path) -> PathBuf {
        let n = self.inner.tmp_counter.fetch_add(1, Ordering::Relaxed);
        let name = target.file_name().and_then(|s| s.to_str()).unwrap_or("record");
        target.with_file_name(format!("{name}{TMP_MARKER}{}.{n}", std::process::id()))
    }
}

fn io_failure(err: std::io::Error, path: &Path, op: &'static str) -> StorageError {
    if err.kind() == ErrorKind::NotFound {
        StorageError::FileNotFound { message: path.display().to_string().into(), context: None }
    } else {
        StorageError::Io {
            source: err,
            context: Some(format!("{op} failed: {}", path.display()).into()),
        }
    }
}

async fn sync_dir(path: &Path) {
    match fs::File::open(path).await {
        Ok(dir) => {
            if let Err(err) = dir.sync_all().await {
                warn!(path = %path.display(), error = %err, "Directory sync failed");
            }
        },
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Directory open failed");
        },
    }
}
