use crate::error::CryptoError;
use hmac::{Hmac, Mac};
use sha1::Sha1;

/// Length of an HMAC-SHA1 tag in bytes.
pub const MAC_LEN: usize = 20;

type HmacSha1 = Hmac<Sha1>;

/// Computes HMAC-SHA1 over the concatenation of `parts`.
///
/// # Errors
/// Returns [`CryptoError::Internal`] if the MAC rejects the key.
pub fn hmac_sha1(key: &[u8], parts: &[&[u8]]) -> Result<[u8; MAC_LEN], CryptoError> {
    let mut mac = <HmacSha1 as Mac>::new_from_slice(key)
        .map_err(|_| CryptoError::from("HMAC-SHA1 rejected the key"))?;
    for part in parts {
        mac.update(part);
    }

    let mut tag = [0u8; MAC_LEN];
    tag.copy_from_slice(&mac.finalize().into_bytes());
    Ok(tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_message_matches_contiguous_message() {
        let whole = hmac_sha1(b"key", &[b"hello world"]).unwrap();
        let split = hmac_sha1(b"key", &[b"hello", b" ", b"world"]).unwrap();
        assert_eq!(whole, split);
    }

    #[test]
    fn long_keys_are_accepted() {
        let key = [0xAAu8; 80];
        assert!(hmac_sha1(&key, &[b"data"]).is_ok());
    }
}
