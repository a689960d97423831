//! # Crypto Errors
//!
//! This module defines the [`CryptoError`] enum used throughout the crate for reporting
//! key-derivation, encryption and envelope failures.

use crate::encoding::EncodingError;
use std::borrow::Cow;

/// A specialized [`CryptoError`] enum for encryption-service failures.
#[passio_derive::passio_error]
pub enum CryptoError {
    /// Neither backend passed its capability probe.
    #[error("Unsupported environment{}: {message}", format_context(.context))]
    UnsupportedEnvironment { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The service was used before [`crate::EncryptionService::init`] completed.
    #[error("Encryption service is not initialized{}", format_context(.context))]
    NotInitialized { context: Option<Cow<'static, str>> },

    /// Failure when the service or builder is incorrectly configured.
    #[error("Invalid configuration{}: {message}", format_context(.context))]
    InvalidConfiguration { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Failure during the encryption process.
    #[error("Encryption error{}: {message}", format_context(.context))]
    Encryption { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The envelope could not be turned back into a document.
    ///
    /// This is how a wrong master password surfaces: the padding check or the JSON parse of
    /// the recovered plaintext fails.
    #[error("Decryption failed{}: {message}", format_context(.context))]
    DecryptionFailed { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Failure in a byte or string conversion.
    #[error("Encoding error{}: {source}", format_context(.context))]
    Encoding { source: EncodingError, context: Option<Cow<'static, str>> },

    /// Failure during JSON serialization of a document or envelope.
    #[error("Serialization error{}: {source}", format_context(.context))]
    Serialization { source: serde_json::Error, context: Option<Cow<'static, str>> },

    /// Internal fallback for unexpected issues or logic errors.
    #[error("Internal crypto error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl CryptoError {
    pub(crate) fn decryption(message: &'static str) -> Self {
        Self::DecryptionFailed { message: Cow::Borrowed(message), context: None }
    }
}
