//! The Passio vault: an account's credentials, decrypted only in memory.
//!
//! A [`Vault`] derives its keys from the master password, retrieves the account's envelope
//! through a [`persistence::Persistence`] backend and decrypts it into a [`VaultDocument`].
//! Every mutation goes through [`Vault::put`] or [`Vault::unput`], records its inverse in the
//! undo log, re-encrypts the document and stores it. Entries stay `volatile` until the store
//! confirms them.
//!
//! Search ranks entries with a case-insensitive subsequence match over description, URL and
//! username; see [`search::fuzzy_match`]. Passwords are never searched.
//!
//! ## Examples
//!
//! ```rust
//! use passio_vault::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), VaultError> {
//! let registry = SessionRegistry::new(MemoryPersistence::new(), VaultConfig::default());
//! let vault = registry.open("homer", "donuts").await?;
//!
//! vault.put(EntryDraft::new().username("homer_simpson").password("x")).await?;
//! vault.put(EntryDraft::new().url("https://www.amazon.com/").password("y")).await?;
//!
//! let hits = vault.search("hom");
//! assert_eq!(hits[0].entry.username, "homer_simpson");
//! assert!(vault.search("").is_empty());
//!
//! registry.clear();
//! # Ok(())
//! # }
//! ```

mod builder;
mod config;
mod engine;
mod error;
pub mod generator;
mod history;
mod model;
pub mod persistence;
mod registry;
pub mod search;

pub use builder::{NoPersistence, VaultBuilder, WithPersistence};
pub use config::VaultConfig;
pub use engine::{PutOptions, Vault, VaultState};
pub use error::{VaultError, VaultErrorExt};
pub use generator::{DEFAULT_PASSWORD_LENGTH, PASSWORD_POOL, generate_password};
pub use history::{HistoryAction, HistoryOptions, HistoryTarget, PropertyChange, RevertOptions};
pub use model::{Entry, EntryDraft, EntryId, Field, VaultDocument};
pub use registry::SessionRegistry;
pub use search::{FuzzyMatch, SearchHit, SearchIndex, Slice, fuzzy_match};

pub mod prelude {
    pub use crate::config::VaultConfig;
    pub use crate::engine::{Vault, VaultState};
    pub use crate::error::{VaultError, VaultErrorExt};
    pub use crate::model::{Entry, EntryDraft};
    pub use crate::persistence::{MemoryPersistence, Persistence, PersistenceError};
    pub use crate::registry::SessionRegistry;
}
