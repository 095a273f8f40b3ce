//! Cryptographic primitives for the vaultic login flow.
//!
//! The remote authority uses two symmetric stream formats ("v1" AES-256-CBC
//! and "v2" AES-256-GCM), ECIES over P-256 for device and enterprise keys,
//! RSA-2048 PKCS#1 v1.5 for SSO payloads, and PBKDF2-based key hashes for
//! password verification. This crate wraps those operations behind typed
//! keys so the rest of the SDK never touches raw primitives.

mod aes_stream;
pub use aes_stream::{decrypt_aes_v1, decrypt_aes_v2, encrypt_aes_v1, encrypt_aes_v2};
mod ec;
pub use ec::{generate_ec_keypair, EcKeyPair, EcPrivateKey, EcPublicKey};
mod error;
pub(crate) use error::Result;
pub use error::CryptoError;
mod envelope;
pub use envelope::{create_encryption_params, decrypt_encryption_params};
mod kdf;
pub use kdf::{create_auth_verifier, derive_key_v1, derive_keyhash_v1, derive_keyhash_v2};
mod rsa_keys;
pub use rsa_keys::{generate_rsa_keypair, RsaKeyPair, RsaPrivateKey, RsaPublicKey};
mod util;
pub use util::{generate_aes_key, generate_salt};
