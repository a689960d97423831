//! The boundary to wherever envelopes are kept.
//!
//! The vault hands a [`Persistence`] implementation opaque envelope text and asks for it
//! back by account name. It needs exactly one distinction from the store: whether a key
//! was never written ([`PersistenceError::NotFound`]) or could not be read for any other
//! reason. Retry and backoff policy belong to the implementation.

mod memory;

pub use memory::MemoryPersistence;

use std::borrow::Cow;
use std::future::Future;

#[passio_derive::passio_error]
pub enum PersistenceError {
    /// Nothing was ever stored under the key.
    #[error("Record not found{}: {message}", format_context(.context))]
    NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The store refused the bearer token.
    #[error("Unauthorized{}: {message}", format_context(.context))]
    Unauthorized { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The store could not be reached or failed while serving the request.
    #[error("Transport failure{}: {cause}", format_context(.context))]
    Transport {
        #[source]
        cause: Box<dyn std::error::Error + Send + Sync + 'static>,
        context: Option<Cow<'static, str>>,
    },

    #[error("Internal persistence error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl PersistenceError {
    /// Wraps a transport-level failure.
    pub fn transport(cause: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>) -> Self {
        Self::Transport { cause: cause.into(), context: None }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Key-value storage for envelopes.
pub trait Persistence: Send + Sync + 'static {
    /// Returns the envelope stored under `key`.
    ///
    /// # Errors
    /// Must return [`PersistenceError::NotFound`] when nothing was ever stored under `key`,
    /// and any other variant for every other failure.
    fn retrieve(&self, key: &str) -> impl Future<Output = Result<String, PersistenceError>> + Send;

    /// Stores `value` under `key`, presenting `auth` as the bearer credential.
    ///
    /// # Errors
    /// [`PersistenceError::Unauthorized`] if the store rejects `auth`, otherwise a
    /// transport failure.
    fn store(
        &self,
        key: &str,
        value: &str,
        auth: Option<&str>,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;
}
