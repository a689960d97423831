use crate::engine::Storage;
use crate::error::StorageError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A validated namespace directory name: lowercase ASCII letters, digits and underscores.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamespaceName(String);

impl TryFrom<&str> for NamespaceName {
    type Error = StorageError;

    fn try_from(value: &str) -> Result<Self, StorageError> {
        let name = value.to_ascii_lowercase();

        if name.is_empty() {
            return Err(StorageError::PathTraversalAttempt {
                message: "namespace is empty".into(),
                context: None,
            });
        }
        if !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
            return Err(StorageError::PathTraversalAttempt {
                message: name.into(),
                context: Some("Namespace contains illegal characters".into()),
            });
        }

        Ok(Self(name))
    }
}

impl TryFrom<String> for NamespaceName {
    type Error = StorageError;

    fn try_from(value: String) -> Result<Self, StorageError> {
        Self::try_from(value.as_str())
    }
}

impl AsRef<str> for NamespaceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NamespaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A view of [`Storage`] scoped to one namespace directory.
///
/// All operations behave like their [`Storage`] counterparts with `<namespace>/` prepended
/// before sharding. Clones share the underlying handle.
#[derive(Debug, Clone)]
pub struct NamespacedStorage {
    storage: Storage,
    namespace: Arc<NamespaceName>,
}

impl NamespacedStorage {
    pub(crate) fn new(storage: Storage, namespace: NamespaceName) -> Self {
        Self { storage, namespace: Arc::new(namespace) }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.namespace.0
    }

    /// See [`Storage::resolve`].
    ///
    /// # Errors
    /// Same as [`Storage::resolve`].
    pub fn resolve(&self, path: impl AsRef<Path>) -> Result<PathBuf, StorageError> {
        self.storage.resolve_in(Some(self.name()), path)
    }

    /// See [`Storage::read`].
    ///
    /// # Errors
    /// Same as [`Storage::read`].
    pub async fn read(&self, path: impl AsRef<Path>) -> Result<Vec<u8>, StorageError> {
        self.storage.read_in(Some(self.name()), path).await
    }

    /// See [`Storage::write`].
    ///
    /// # Errors
    /// Same as [`Storage::write`].
    pub async fn write(&self, path: impl AsRef<Path>, data: &[u8]) -> Result<(), StorageError> {
        self.storage.write_in(Some(self.name()), path, data).await
    }

    /// See [`Storage::delete`].
    ///
    /// # Errors
    /// Same as [`Storage::delete`].
    pub async fn delete(&self, path: impl AsRef<Path>) -> Result<(), StorageError> {
        self.storage.delete_in(Some(self.name()), path).await
    }

    /// See [`Storage::exists`].
    ///
    /// # Errors
    /// Same as [`Storage::exists`].
    pub fn exists(&self, path: impl AsRef<Path>) -> Result<bool, StorageError> {
        self.storage.exists_in(Some(self.name()), path)
    }
}
