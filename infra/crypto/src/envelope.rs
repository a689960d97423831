use crate::backend::BLOCK_LEN;
use crate::encoding::{base64_decode, base64_encode};
use crate::error::{CryptoError, CryptoErrorExt};
use serde::{Deserialize, Serialize};

/// The persisted wrapper around a ciphertext.
///
/// ```text
/// { "ct": "<base64 ciphertext>", "iv": "<base64, 16 bytes>" }
/// ```
///
/// Older envelopes may carry a base64 salt under `s`. It is kept verbatim when an envelope
/// is parsed and re-serialized, and ignored otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "ct")]
    pub ciphertext: String,
    pub iv: String,
    #[serde(rename = "s", default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
}

impl Envelope {
    #[must_use]
    pub fn new(ciphertext: &[u8], iv: &[u8; BLOCK_LEN]) -> Self {
        Self { ciphertext: base64_encode(ciphertext), iv: base64_encode(iv), salt: None }
    }

    /// Parses an envelope from its JSON text.
    ///
    /// # Errors
    /// Returns [`CryptoError::DecryptionFailed`] if the text is not an envelope.
    pub fn parse(text: &str) -> Result<Self, CryptoError> {
        serde_json::from_str(text).map_err(|_| CryptoError::decryption("malformed envelope"))
    }

    /// Serializes the envelope to compact JSON.
    ///
    /// # Errors
    /// Returns [`CryptoError::Serialization`] if serialization fails.
    pub fn to_json(&self) -> Result<String, CryptoError> {
        serde_json::to_string(self).context("encoding envelope")
    }

    /// Decoded initialization vector.
    ///
    /// # Errors
    /// Returns [`CryptoError::DecryptionFailed`] unless `iv` is base64 of exactly 16 bytes.
    pub fn iv_bytes(&self) -> Result<[u8; BLOCK_LEN], CryptoError> {
        base64_decode(&self.iv)
            .ok()
            .and_then(|bytes| <[u8; BLOCK_LEN]>::try_from(bytes.as_slice()).ok())
            .ok_or_else(|| CryptoError::decryption("initialization vector must be 16 bytes"))
    }

    /// Decoded ciphertext.
    ///
    /// # Errors
    /// Returns [`CryptoError::DecryptionFailed`] if `ct` is not valid base64.
    pub fn ciphertext_bytes(&self) -> Result<Vec<u8>, CryptoError> {
        base64_decode(&self.ciphertext)
            .map_err(|_| CryptoError::decryption("ciphertext is not valid base64"))
    }
}
