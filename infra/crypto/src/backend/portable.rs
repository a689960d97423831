//! AES-256-CBC and PBKDF2 assembled from the raw block cipher and HMAC-SHA1.

use super::BLOCK_LEN;
use crate::encoding::{Endian, bytes_to_words, words_to_bytes};
use crate::error::CryptoError;
use crate::mac::{MAC_LEN, hmac_sha1};
use aes::Aes256;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};

pub(super) fn derive_key(
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    out: &mut [u8],
) -> Result<(), CryptoError> {
    for (index, chunk) in (1u32..).zip(out.chunks_mut(MAC_LEN)) {
        let mut u = hmac_sha1(password, &[salt, &index.to_be_bytes()])?;
        let mut acc = bytes_to_words(&u, Endian::Big);

        for _ in 1..iterations {
            u = hmac_sha1(password, &[&u])?;
            for (word, next) in acc.iter_mut().zip(bytes_to_words(&u, Endian::Big)) {
                *word ^= next;
            }
        }

        chunk.copy_from_slice(&words_to_bytes(&acc, chunk.len(), Endian::Big));
    }
    Ok(())
}

pub(super) fn encrypt_cbc(
    key: &[u8],
    iv: &[u8; BLOCK_LEN],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = block_cipher(key)?;
    let padded = pad(plaintext);
    let mut out = Vec::with_capacity(padded.len());
    let mut chain = *iv;

    for chunk in padded.chunks_exact(BLOCK_LEN) {
        let mut block = aes::Block::clone_from_slice(chunk);
        for (byte, prev) in block.iter_mut().zip(chain) {
            *byte ^= prev;
        }
        cipher.encrypt_block(&mut block);
        chain.copy_from_slice(&block);
        out.extend_from_slice(&block);
    }
    Ok(out)
}

pub(super) fn decrypt_cbc(
    key: &[u8],
    iv: &[u8; BLOCK_LEN],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
        return Err(CryptoError::decryption("ciphertext is not a whole number of blocks"));
    }
    let cipher = block_cipher(key)?;
    let mut out = Vec::with_capacity(ciphertext.len());
    let mut chain = *iv;

    for chunk in ciphertext.chunks_exact(BLOCK_LEN) {
        let mut block = aes::Block::clone_from_slice(chunk);
        cipher.decrypt_block(&mut block);
        for (byte, prev) in block.iter_mut().zip(chain) {
            *byte ^= prev;
        }
        chain.copy_from_slice(chunk);
        out.extend_from_slice(&block);
    }

    unpad(&mut out)?;
    Ok(out)
}

fn block_cipher(key: &[u8]) -> Result<Aes256, CryptoError> {
    Aes256::new_from_slice(key).map_err(|_| CryptoError::InvalidConfiguration {
        message: format!("Invalid key length {}, must be 32 bytes", key.len()).into(),
        context: Some("portable backend".into()),
    })
}

fn pad(data: &[u8]) -> Vec<u8> {
    let fill = BLOCK_LEN - data.len() % BLOCK_LEN;
    let mut padded = Vec::with_capacity(data.len() + fill);
    padded.extend_from_slice(data);
    // `fill` is in 1..=16.
    padded.resize(data.len() + fill, u8::try_from(fill).unwrap_or(u8::MAX));
    padded
}

fn unpad(data: &mut Vec<u8>) -> Result<(), CryptoError> {
    let fill = data.last().copied().map_or(0, usize::from);
    let valid = (1..=BLOCK_LEN.min(data.len())).contains(&fill)
        && data[data.len() - fill..].iter().all(|&b| usize::from(b) == fill);
    if !valid {
        return Err(CryptoError::decryption("padding check failed"));
    }
    data.truncate(data.len() - fill);
    Ok(())
}
