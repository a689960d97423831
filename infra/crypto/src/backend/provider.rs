use super::BLOCK_LEN;
use crate::error::CryptoError;
use aes::Aes256;
use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use sha1::Sha1;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

pub(super) fn derive_key(password: &[u8], salt: &[u8], iterations: u32, out: &mut [u8]) {
    pbkdf2::pbkdf2_hmac::<Sha1>(password, salt, iterations, out);
}

pub(super) fn encrypt_cbc(
    key: &[u8],
    iv: &[u8; BLOCK_LEN],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256CbcEnc::new_from_slices(key, iv).map_err(|_| invalid_key(key))?;
    Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

pub(super) fn decrypt_cbc(
    key: &[u8],
    iv: &[u8; BLOCK_LEN],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
        return Err(CryptoError::decryption("ciphertext is not a whole number of blocks"));
    }
    let cipher = Aes256CbcDec::new_from_slices(key, iv).map_err(|_| invalid_key(key))?;
    cipher
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CryptoError::decryption("padding check failed"))
}

fn invalid_key(key: &[u8]) -> CryptoError {
    CryptoError::InvalidConfiguration {
        message: format!("Invalid key length {}, must be 32 bytes", key.len()).into(),
        context: Some("provider backend".into()),
    }
}
