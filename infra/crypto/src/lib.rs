//! Key derivation and envelope encryption for Passio vault documents.
//!
//! A master password is stretched with PBKDF2-HMAC-SHA1 into an AES-256 encryption key and
//! an HMAC-SHA1 signing key. Documents are serialized to JSON, encrypted with AES-256-CBC
//! under a fresh random IV, and wrapped in a JSON [`Envelope`]. The base64 signing key doubles
//! as the bearer token presented to the remote store.
//!
//! ## Backends
//!
//! The primitives come from one of two [`Backend`]s with identical output. A capability
//! probe runs once per process and the service uses the provider backend unless it fails
//! its self-test; see [`backend::probe`].
//!
//! ## Examples
//!
//! ```rust
//! use passio_crypto::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), CryptoError> {
//! let service = EncryptionService::builder()
//!     .password("master password")
//!     .iterations(1000)
//!     .build()?;
//! service.init().await?;
//!
//! let token = service.authorization_token()?;
//! assert_eq!(token.len(), 44);
//! # Ok(())
//! # }
//! ```

pub mod backend;
mod builder;
pub mod encoding;
mod envelope;
mod error;
mod kdf;
mod mac;
mod service;

pub use backend::{Backend, BackendPreference, ProbeReport};
pub use builder::{EncryptionServiceBuilder, NoPassword, WithPassword};
pub use envelope::Envelope;
pub use error::{CryptoError, CryptoErrorExt};
pub use kdf::{DEFAULT_ITERATIONS, KEY_LEN, Keyring, password_salt};
pub use mac::{MAC_LEN, hmac_sha1};
pub use service::EncryptionService;

pub mod prelude {
    pub use crate::backend::{Backend, BackendPreference};
    pub use crate::envelope::Envelope;
    pub use crate::error::{CryptoError, CryptoErrorExt};
    pub use crate::service::EncryptionService;
}
