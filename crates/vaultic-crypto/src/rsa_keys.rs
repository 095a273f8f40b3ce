//! RSA-2048 operations for the on-site SSO round-trip and pinned server keys.
//!
//! The authority encrypts SSO-returned passwords to an ephemeral RSA public
//! key with PKCS#1 v1.5 padding, and some regions still pin RSA transmission
//! keys. Public keys travel as PKCS#1 DER, private keys as PKCS#8 DER.

use rsa::{
    pkcs1::{DecodeRsaPublicKey, EncodeRsaPublicKey},
    pkcs8::{DecodePrivateKey, EncodePrivateKey},
    Pkcs1v15Encrypt,
};
use zeroize::Zeroizing;

use crate::{CryptoError, Result};

/// An RSA private key.
#[derive(Clone)]
pub struct RsaPrivateKey(rsa::RsaPrivateKey);

/// An RSA public key.
#[derive(Clone)]
pub struct RsaPublicKey(rsa::RsaPublicKey);

/// An RSA keypair.
#[derive(Clone)]
pub struct RsaKeyPair {
    /// The private half. For SSO this is ephemeral and never persisted.
    pub private: RsaPrivateKey,
    /// The public half, sent to the identity provider.
    pub public: RsaPublicKey,
}

/// Generate a new RSA keypair of 2048 bits.
pub fn generate_rsa_keypair() -> RsaKeyPair {
    let mut rng = rand::thread_rng();
    let private =
        rsa::RsaPrivateKey::new(&mut rng, 2048).expect("failed to generate a key");
    let public = rsa::RsaPublicKey::from(&private);
    RsaKeyPair {
        private: RsaPrivateKey(private),
        public: RsaPublicKey(public),
    }
}

impl RsaPrivateKey {
    /// Load a private key from PKCS#8 DER.
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self> {
        rsa::RsaPrivateKey::from_pkcs8_der(der)
            .map(Self)
            .map_err(|_| CryptoError::InvalidKey)
    }

    /// The PKCS#8 DER representation.
    pub fn to_pkcs8_der(&self) -> Result<Zeroizing<Vec<u8>>> {
        self.0
            .to_pkcs8_der()
            .map(|der| Zeroizing::new(der.as_bytes().to_vec()))
            .map_err(|_| CryptoError::InvalidKey)
    }

    /// Decrypt a PKCS#1 v1.5 ciphertext.
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.0
            .decrypt(Pkcs1v15Encrypt, data)
            .map_err(|_| CryptoError::KeyDecrypt)
    }
}

impl RsaPublicKey {
    /// Load a public key from PKCS#1 DER.
    pub fn from_pkcs1_der(der: &[u8]) -> Result<Self> {
        rsa::RsaPublicKey::from_pkcs1_der(der)
            .map(Self)
            .map_err(|_| CryptoError::InvalidKey)
    }

    /// The PKCS#1 DER representation.
    pub fn to_pkcs1_der(&self) -> Result<Vec<u8>> {
        self.0
            .to_pkcs1_der()
            .map(|der| der.as_bytes().to_vec())
            .map_err(|_| CryptoError::InvalidKey)
    }

    /// Encrypt `data` with PKCS#1 v1.5 padding.
    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut rng = rand::thread_rng();
        Ok(self.0.encrypt(&mut rng, Pkcs1v15Encrypt, data)?)
    }
}
