//! Byte, string and word-array conversions.
//!
//! Everything here is pure. UTF-8 decoding is strict: the first malformed sequence is
//! reported with its byte offset and a [`Utf8Fault`] describing what was wrong with it.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use std::borrow::Cow;
use std::fmt;

#[passio_derive::passio_error]
pub enum EncodingError {
    #[error("Invalid UTF-8{} at byte {offset}: {fault}", format_context(.context))]
    InvalidUtf8 { fault: Utf8Fault, offset: usize, context: Option<Cow<'static, str>> },

    #[error("Invalid base64{}: {source}", format_context(.context))]
    Base64 { source: base64::DecodeError, context: Option<Cow<'static, str>> },
}

/// Classification of a malformed UTF-8 sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Utf8Fault {
    /// A byte that can never start a sequence (a stray continuation byte, or `0xF5..=0xFF`).
    InvalidLead,
    /// A sequence whose follow-up byte is not `0b10xx_xxxx`.
    InvalidContinuation,
    /// A code point encoded with more bytes than necessary.
    Overlong,
    /// A surrogate or a code point above `U+10FFFF`.
    OutOfRange,
    /// The input ended in the middle of a sequence.
    Truncated,
}

impl fmt::Display for Utf8Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::InvalidLead => "invalid lead byte",
            Self::InvalidContinuation => "invalid continuation byte",
            Self::Overlong => "overlong encoding",
            Self::OutOfRange => "code point out of range",
            Self::Truncated => "truncated sequence",
        })
    }
}

/// Byte order for [`bytes_to_words`] and [`words_to_bytes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Big,
    Little,
}

/// Decodes `bytes` as UTF-8, rejecting any malformed input.
///
/// # Errors
/// Returns [`EncodingError::InvalidUtf8`] describing the first malformed sequence.
pub fn utf8_decode(bytes: &[u8]) -> Result<&str, EncodingError> {
    std::str::from_utf8(bytes).map_err(|err| {
        let offset = err.valid_up_to();
        let fault = match err.error_len() {
            None => Utf8Fault::Truncated,
            Some(_) => classify(bytes[offset], bytes.get(offset + 1).copied()),
        };
        EncodingError::InvalidUtf8 { fault, offset, context: None }
    })
}

fn classify(lead: u8, next: Option<u8>) -> Utf8Fault {
    match (lead, next) {
        (0xC0 | 0xC1, _) => Utf8Fault::Overlong,
        (0x80..=0xBF | 0xF5..=0xFF, _) => Utf8Fault::InvalidLead,
        (0xE0, Some(0x80..=0x9F)) | (0xF0, Some(0x80..=0x8F)) => Utf8Fault::Overlong,
        (0xED, Some(0xA0..=0xBF)) | (0xF4, Some(0x90..=0xBF)) => Utf8Fault::OutOfRange,
        _ => Utf8Fault::InvalidContinuation,
    }
}

/// Encodes bytes as standard, padded base64.
#[must_use]
pub fn base64_encode(bytes: impl AsRef<[u8]>) -> String {
    STANDARD.encode(bytes)
}

/// Decodes standard, padded base64.
///
/// # Errors
/// Returns [`EncodingError::Base64`] if the input is not valid base64.
pub fn base64_decode(text: impl AsRef<[u8]>) -> Result<Vec<u8>, EncodingError> {
    STANDARD.decode(text).context("decoding base64")
}

/// Packs bytes into 32-bit words. A trailing partial word is zero-padded.
#[must_use]
pub fn bytes_to_words(bytes: &[u8], endian: Endian) -> Vec<u32> {
    bytes
        .chunks(4)
        .map(|chunk| {
            let mut word = [0u8; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            match endian {
                Endian::Big => u32::from_be_bytes(word),
                Endian::Little => u32::from_le_bytes(word),
            }
        })
        .collect()
}

/// Unpacks words into bytes, keeping only the first `sig_bytes` of them.
#[must_use]
pub fn words_to_bytes(words: &[u32], sig_bytes: usize, endian: Endian) -> Vec<u8> {
    let mut bytes: Vec<u8> = words
        .iter()
        .flat_map(|word| match endian {
            Endian::Big => word.to_be_bytes(),
            Endian::Little => word.to_le_bytes(),
        })
        .collect();
    bytes.truncate(sig_bytes);
    bytes
}
