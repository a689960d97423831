use crate::engine::{Storage, StorageInner};
use crate::error::{StorageError, StorageErrorExt};
use private::Sealed;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::info;

/// Temp files older than this are considered orphaned by a crashed writer.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(300);

#[derive(Debug, Default)]
pub struct NoRoot;
#[derive(Debug)]
pub struct WithRoot(PathBuf);

mod private {
    pub(super) trait Sealed {}
}
impl Sealed for NoRoot {}
impl Sealed for WithRoot {}

/// Configures a [`Storage`] handle; [`StorageBuilder::connect`] exists once a root is set.
#[allow(private_bounds)]
#[derive(Debug)]
pub struct StorageBuilder<S: Sealed = NoRoot> {
    root: S,
    create: bool,
    stale_after: Duration,
}

impl Default for StorageBuilder {
    fn default() -> Self {
        Self { root: NoRoot, create: true, stale_after: DEFAULT_STALE_AFTER }
    }
}

#[allow(private_bounds)]
impl<S: Sealed> StorageBuilder<S> {
    /// Whether a missing root is created (on Unix, readable by the owner only).
    #[must_use]
    pub const fn create(mut self, enable: bool) -> Self {
        self.create = enable;
        self
    }

    /// Age after which leftover temp files are purged on connect.
    #[must_use]
    pub const fn stale_after(mut self, age: Duration) -> Self {
        self.stale_after = age;
        self
    }
}

impl StorageBuilder<NoRoot> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn root(self, path: impl Into<PathBuf>) -> StorageBuilder<WithRoot> {
        StorageBuilder {
            root: WithRoot(path.into()),
            create: self.create,
            stale_after: self.stale_after,
        }
    }
}

impl StorageBuilder<WithRoot> {
    /// Opens the storage root.
    ///
    /// The root is canonicalized, so later symlink tricks cannot move it, and swept for temp
    /// files left by interrupted writes. A failed sweep is logged, not returned.
    ///
    /// # Errors
    /// [`StorageError::Io`] if the root is missing and `create` is off, or cannot be
    /// created or resolved.
    pub async fn connect(self) -> Result<Storage, StorageError> {
        let Self { root: WithRoot(root), create, stale_after } = self;

        if create {
            create_private_dir(&root).await?;
        }
        let root = fs::canonicalize(&root)
            .await
            .context(format!("Failed to resolve storage root: {}", root.display()))?;

        let storage = Storage::from_inner(StorageInner::new(root, stale_after));
        storage.purge_tmp().await;
        Ok(storage)
    }
}

async fn create_private_dir(root: &Path) -> Result<(), StorageError> {
    if fs::try_exists(root).await.unwrap_or(false) {
        return Ok(());
    }
    fs::create_dir_all(root)
        .await
        .context(format!("Failed to create storage root: {}", root.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(root, std::fs::Permissions::from_mode(0o700))
            .await
            .context(format!("Failed to restrict storage root: {}", root.display()))?;
    }

    info!(path = %root.display(), "Created storage root");
    Ok(())
}
