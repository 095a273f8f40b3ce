//! The legacy password-wrapped data-key envelope ("encryption params").
//!
//! Layout: `version(1) || iterations(3, BE) || salt(16) || iv(16) ||
//! AES-256-CBC(data_key || data_key, no padding)(64)`. The doubled data key
//! acts as an integrity check; both halves must match after decryption.

use aes::cipher::{block_padding::NoPadding, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::{kdf::derive_key_v1, CryptoError, Result};

const SALT_SIZE: usize = 16;
const IV_SIZE: usize = 16;
const WRAPPED_SIZE: usize = 64;
const ENVELOPE_SIZE: usize = 1 + 3 + SALT_SIZE + IV_SIZE + WRAPPED_SIZE;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Wrap a 32-byte data key under a password.
pub fn create_encryption_params(
    password: &str,
    salt: &[u8; SALT_SIZE],
    iterations: u32,
    data_key: &[u8; 32],
) -> Vec<u8> {
    let key = derive_key_v1(password, salt, iterations);

    let mut iv = [0u8; IV_SIZE];
    rand::thread_rng().fill_bytes(&mut iv);

    let mut doubled = Zeroizing::new([0u8; WRAPPED_SIZE]);
    doubled[..32].copy_from_slice(data_key);
    doubled[32..].copy_from_slice(data_key);

    let wrapped = Aes256CbcEnc::new(&key.into(), &iv.into())
        .encrypt_padded_vec_mut::<NoPadding>(doubled.as_slice());

    let mut out = Vec::with_capacity(ENVELOPE_SIZE);
    out.push(1);
    out.extend_from_slice(&iterations.to_be_bytes()[1..]);
    out.extend_from_slice(salt);
    out.extend_from_slice(&iv);
    out.extend_from_slice(&wrapped);
    out
}

/// Recover the data key from a password-wrapped envelope.
pub fn decrypt_encryption_params(params: &[u8], password: &str) -> Result<Zeroizing<Vec<u8>>> {
    if params.len() != ENVELOPE_SIZE || params[0] != 1 {
        return Err(CryptoError::InvalidKeyEnvelope);
    }

    let iterations = u32::from_be_bytes([0, params[1], params[2], params[3]]);
    let salt = &params[4..4 + SALT_SIZE];
    let iv: [u8; IV_SIZE] = params[20..20 + IV_SIZE]
        .try_into()
        .map_err(|_| CryptoError::InvalidKeyEnvelope)?;

    let key = derive_key_v1(password, salt, iterations);

    let doubled = Zeroizing::new(
        Aes256CbcDec::new(&key.into(), &iv.into())
            .decrypt_padded_vec_mut::<NoPadding>(&params[36..])
            .map_err(|_| CryptoError::KeyDecrypt)?,
    );

    if doubled[..32] != doubled[32..] {
        return Err(CryptoError::KeyDecrypt);
    }

    Ok(Zeroizing::new(doubled[..32].to_vec()))
}
