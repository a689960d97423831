//! # Vault Errors
//!
//! [`VaultError`] separates the three failures a login screen must tell apart: the store
//! could not be reached ([`VaultError::InitializationFailed`]), the account has no vault yet
//! (not an error, an empty vault is created) and the master password is wrong
//! ([`VaultError::DecryptionFailed`]).

use crate::model::EntryId;
use crate::persistence::PersistenceError;
use passio_crypto::CryptoError;
use std::borrow::Cow;

#[passio_derive::passio_error]
pub enum VaultError {
    /// A required argument is missing or a setting is out of range.
    #[error("Invalid vault configuration{}: {message}", format_context(.context))]
    InvalidConfiguration { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The vault was used before `init` completed, or after it failed.
    #[error("Vault is not ready{}: {message}", format_context(.context))]
    NotReady { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Unsupported environment{}: {message}", format_context(.context))]
    UnsupportedEnvironment { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Retrieval failed for a reason other than "not found", or the first store of a new
    /// vault failed.
    #[error("Vault initialization failed{}: {cause}", format_context(.context))]
    InitializationFailed {
        #[source]
        cause: PersistenceError,
        context: Option<Cow<'static, str>>,
    },

    /// Wrong master password or corrupted ciphertext.
    #[error("Vault decryption failed{}: {message}", format_context(.context))]
    DecryptionFailed { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The mutation was applied in memory but the store rejected or lost the write.
    #[error("Vault persistence failed{}: {cause}", format_context(.context))]
    PersistenceFailed {
        #[source]
        cause: PersistenceError,
        context: Option<Cow<'static, str>>,
    },

    #[error("Entry {id} not found{}", format_context(.context))]
    EntryNotFound { id: EntryId, context: Option<Cow<'static, str>> },

    #[error("Entry {id} already exists{}", format_context(.context))]
    DuplicateEntry { id: EntryId, context: Option<Cow<'static, str>> },

    /// Any other failure reported by the encryption service.
    #[error("Crypto error{}: {cause}", format_context(.context))]
    Crypto {
        #[source]
        cause: CryptoError,
        context: Option<Cow<'static, str>>,
    },

    #[error("Internal vault error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl From<CryptoError> for VaultError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::UnsupportedEnvironment { message, context } => {
                Self::UnsupportedEnvironment { message, context }
            },
            CryptoError::DecryptionFailed { message, context } => {
                Self::DecryptionFailed { message, context }
            },
            CryptoError::InvalidConfiguration { message, context } => {
                Self::InvalidConfiguration { message, context }
            },
            cause => Self::Crypto { cause, context: None },
        }
    }
}

impl VaultError {
    pub(crate) fn not_ready(message: &'static str) -> Self {
        Self::NotReady { message: Cow::Borrowed(message), context: None }
    }

    pub(crate) fn invalid(message: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidConfiguration { message: message.into(), context: None }
    }
}
