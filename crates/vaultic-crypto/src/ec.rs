//! ECIES over P-256.
//!
//! Device keys and enterprise keys use the authority's hybrid scheme: an
//! ephemeral P-256 keypair performs ECDH against the recipient's public key,
//! the SHA-256 of the shared secret becomes an AES-256-GCM key, and the
//! ciphertext is `ephemeral_public(65, uncompressed) || v2 stream`.

use p256::{ecdh::diffie_hellman, elliptic_curve::sec1::ToEncodedPoint, PublicKey, SecretKey};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::{aes_stream, decrypt_aes_v2, encrypt_aes_v2, CryptoError, Result};

const POINT_SIZE: usize = 65;

/// A P-256 private key. Scalar bytes are zeroized on drop by the `p256` crate.
#[derive(Clone)]
pub struct EcPrivateKey(SecretKey);

/// A P-256 public key.
#[derive(Clone)]
pub struct EcPublicKey(PublicKey);

/// A P-256 keypair.
#[derive(Clone)]
pub struct EcKeyPair {
    /// The private half, persisted locally and never transmitted.
    pub private: EcPrivateKey,
    /// The public half, registered with the authority.
    pub public: EcPublicKey,
}

/// Generate a fresh P-256 keypair.
pub fn generate_ec_keypair() -> EcKeyPair {
    let private = SecretKey::random(&mut rand::thread_rng());
    let public = private.public_key();
    EcKeyPair {
        private: EcPrivateKey(private),
        public: EcPublicKey(public),
    }
}

impl EcPrivateKey {
    /// Load a private key from its 32-byte scalar representation.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        SecretKey::from_slice(bytes)
            .map(Self)
            .map_err(|_| CryptoError::InvalidKey)
    }

    /// The 32-byte scalar representation, for local persistence.
    pub fn to_bytes(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(self.0.to_bytes().to_vec())
    }

    /// The corresponding public key.
    pub fn public_key(&self) -> EcPublicKey {
        EcPublicKey(self.0.public_key())
    }

    /// Decrypt an ECIES ciphertext produced by [`EcPublicKey::encrypt`].
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.len() <= POINT_SIZE {
            return Err(CryptoError::InvalidLength);
        }
        let (point, ciphertext) = data.split_at(POINT_SIZE);
        let ephemeral =
            PublicKey::from_sec1_bytes(point).map_err(|_| CryptoError::KeyDecrypt)?;
        let key = shared_key(&self.0, &ephemeral);
        decrypt_aes_v2(ciphertext, &key)
    }
}

impl EcPublicKey {
    /// Load a public key from its SEC1 representation.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        PublicKey::from_sec1_bytes(bytes)
            .map(Self)
            .map_err(|_| CryptoError::InvalidKey)
    }

    /// The 65-byte uncompressed SEC1 representation.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_encoded_point(false).as_bytes().to_vec()
    }

    /// Encrypt `data` so only the holder of the private key can recover it.
    pub fn encrypt(&self, data: &[u8]) -> Vec<u8> {
        let ephemeral = SecretKey::random(&mut rand::thread_rng());
        let key = shared_key(&ephemeral, &self.0);

        let point = ephemeral.public_key().to_encoded_point(false);
        let ciphertext = encrypt_aes_v2(data, &key);

        let mut out = Vec::with_capacity(POINT_SIZE + ciphertext.len());
        out.extend_from_slice(point.as_bytes());
        out.extend_from_slice(&ciphertext);
        out
    }
}

fn shared_key(private: &SecretKey, public: &PublicKey) -> [u8; aes_stream::KEY_SIZE] {
    let shared = diffie_hellman(private.to_nonzero_scalar(), public.as_affine());
    Sha256::digest(shared.raw_secret_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_round_trip() {
        let pair = generate_ec_keypair();
        let plaintext = b"vault data key";
        let encrypted = pair.public.encrypt(plaintext);
        assert_eq!(pair.private.decrypt(&encrypted).unwrap(), plaintext);
    }

    #[test]
    fn test_wrong_key_fails() {
        let pair = generate_ec_keypair();
        let other = generate_ec_keypair();
        let encrypted = pair.public.encrypt(b"vault data key");
        assert!(other.private.decrypt(&encrypted).is_err());
    }

    #[test]
    fn test_private_key_persistence_round_trip() {
        let pair = generate_ec_keypair();
        let restored = EcPrivateKey::from_bytes(&pair.private.to_bytes()).unwrap();
        let encrypted = pair.public.encrypt(b"data");
        assert_eq!(restored.decrypt(&encrypted).unwrap(), b"data");
    }

    #[test]
    fn test_public_key_is_uncompressed_sec1() {
        let pair = generate_ec_keypair();
        let bytes = pair.public.to_bytes();
        assert_eq!(bytes.len(), 65);
        assert_eq!(bytes[0], 0x04);
        assert!(EcPublicKey::from_bytes(&bytes).is_ok());
    }
}
