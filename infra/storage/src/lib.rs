//! Sandboxed file storage for encrypted vault records.
//!
//! # Core Features
//!
//! - **Sandbox Security**: every path is confined to a canonical root; `..`, absolute paths and
//!   symlinked ancestors that point outside are rejected.
//! - **Atomic Writes**: unique temp file, `fsync`, rename over the target, then a directory sync.
//! - **Namespacing & Sharding**: `<root>/<namespace>/<c0c1>/<c2c3>/<file>`.
//! - **Self-Healing**: temp files orphaned by an interrupted write are purged on connect.
//! - **Records**: [`RecordStore`] maps account keys to envelope files with a trust-on-first-use
//!   bearer-token check.
//!
//! # Examples
//!
//! ```rust
//! use passio_storage::{RecordStore, Storage, StorageError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), StorageError> {
//!     # let tmp = tempfile::tempdir().unwrap();
//!     # let root = tmp.path().join("data");
//!     let storage = Storage::builder().root(&root).create(true).connect().await?;
//!     let records = RecordStore::new(&storage)?;
//!
//!     records.save("alice", r#"{"ct":"..","iv":".."}"#, Some("token-a")).await?;
//!     assert_eq!(records.load("alice").await?, r#"{"ct":"..","iv":".."}"#);
//!
//!     let err = records.save("alice", "{}", Some("token-b")).await.unwrap_err();
//!     assert!(matches!(err, StorageError::Unauthorized { .. }));
//!     Ok(())
//! }
//! ```

mod builder;
mod engine;
mod error;
mod maintenance;
mod namespace;
mod records;
mod security;

pub use builder::{DEFAULT_STALE_AFTER, StorageBuilder};
pub use engine::Storage;
pub use error::{StorageError, StorageErrorExt};
pub use maintenance::PurgeReport;
pub use namespace::{NamespaceName, NamespacedStorage};
pub use records::RecordStore;
