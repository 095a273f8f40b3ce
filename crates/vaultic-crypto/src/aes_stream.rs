//! # Symmetric stream formats
//!
//! The authority uses two self-contained ciphertext layouts:
//!
//! - "v1": `iv(16) || AES-256-CBC(PKCS7)`, used for legacy records and the
//!   password-wrapped data-key envelope.
//! - "v2": `nonce(12) || AES-256-GCM ciphertext+tag`, used for everything
//!   current, including the SSO transmission envelope and alternate-scheme
//!   data keys.

use aes::cipher::{
    block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit,
};
use aes_gcm::{aead::Aead, AeadCore, Aes256Gcm, KeyInit, Nonce};
use rand::RngCore;

use crate::{CryptoError, Result};

pub(crate) const KEY_SIZE: usize = 32;
const IV_SIZE: usize = 16;
const NONCE_SIZE: usize = 12;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Encrypt with the v1 (AES-256-CBC) layout. The random IV is prepended.
pub fn encrypt_aes_v1(data: &[u8], key: &[u8; KEY_SIZE]) -> Vec<u8> {
    let mut iv = [0u8; IV_SIZE];
    rand::thread_rng().fill_bytes(&mut iv);

    let ciphertext =
        Aes256CbcEnc::new(key.into(), &iv.into()).encrypt_padded_vec_mut::<Pkcs7>(data);

    let mut out = Vec::with_capacity(IV_SIZE + ciphertext.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&ciphertext);
    out
}

/// Decrypt the v1 (AES-256-CBC) layout.
pub fn decrypt_aes_v1(data: &[u8], key: &[u8; KEY_SIZE]) -> Result<Vec<u8>> {
    if data.len() < IV_SIZE * 2 {
        return Err(CryptoError::InvalidLength);
    }
    let (iv, ciphertext) = data.split_at(IV_SIZE);
    let iv: [u8; IV_SIZE] = iv.try_into().map_err(|_| CryptoError::InvalidLength)?;

    Aes256CbcDec::new(key.into(), &iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CryptoError::KeyDecrypt)
}

/// Encrypt with the v2 (AES-256-GCM) layout. The random nonce is prepended.
pub fn encrypt_aes_v2(data: &[u8], key: &[u8; KEY_SIZE]) -> Vec<u8> {
    let nonce = Aes256Gcm::generate_nonce(rand::thread_rng());
    let ciphertext = Aes256Gcm::new(key.into())
        .encrypt(&nonce, data)
        .expect("encryption is infallible for in-memory buffers");

    let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    out
}

/// Decrypt the v2 (AES-256-GCM) layout, authenticating the tag.
pub fn decrypt_aes_v2(data: &[u8], key: &[u8; KEY_SIZE]) -> Result<Vec<u8>> {
    if data.len() < NONCE_SIZE {
        return Err(CryptoError::InvalidLength);
    }
    let (nonce, ciphertext) = data.split_at(NONCE_SIZE);

    Aes256Gcm::new(key.into())
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::KeyDecrypt)
}
