//! Password-derived key hashes.
//!
//! The authority verifies passwords without ever seeing them: the client
//! derives a keyed hash over a server-issued salt and iteration count and
//! submits only that. Two derivations exist; v1 feeds the auth verifier,
//! v2 feeds the alternate (master-password) data-key scheme.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha512};

use crate::aes_stream::KEY_SIZE;

type PbkdfSha256Hmac = Hmac<Sha256>;
type PbkdfSha512Hmac = Hmac<Sha512>;

/// PBKDF2-HMAC-SHA256 of the password over the server salt.
pub fn derive_key_v1(password: &str, salt: &[u8], iterations: u32) -> [u8; KEY_SIZE] {
    pbkdf2::pbkdf2_array::<PbkdfSha256Hmac, KEY_SIZE>(password.as_bytes(), salt, iterations)
        .expect("hash is a valid fixed size")
}

/// The v1 auth verifier: SHA-256 of the derived key. This is what gets
/// submitted to `validate_auth_hash`.
pub fn derive_keyhash_v1(password: &str, salt: &[u8], iterations: u32) -> Vec<u8> {
    let derived = derive_key_v1(password, salt, iterations);
    Sha256::digest(derived).to_vec()
}

/// The v2 domain-separated key hash used by the alternate data-key scheme.
///
/// A 64-byte PBKDF2-HMAC-SHA512 stretch of the password keys an HMAC-SHA256
/// over the domain label, yielding the AES key for that domain.
pub fn derive_keyhash_v2(
    domain: &str,
    password: &str,
    salt: &[u8],
    iterations: u32,
) -> [u8; KEY_SIZE] {
    let stretched =
        pbkdf2::pbkdf2_array::<PbkdfSha512Hmac, 64>(password.as_bytes(), salt, iterations)
            .expect("hash is a valid fixed size");

    let mut mac = PbkdfSha256Hmac::new_from_slice(&stretched)
        .expect("HMAC accepts any key length");
    mac.update(domain.as_bytes());
    mac.finalize().into_bytes().into()
}

/// Build the auth-verifier blob submitted when changing the master password:
/// `version(1) || iterations(3, BE) || salt || derived_key(32)`.
pub fn create_auth_verifier(password: &str, salt: &[u8], iterations: u32) -> Vec<u8> {
    let derived = derive_key_v1(password, salt, iterations);

    let mut out = Vec::with_capacity(1 + 3 + salt.len() + derived.len());
    out.push(1);
    out.extend_from_slice(&iterations.to_be_bytes()[1..]);
    out.extend_from_slice(salt);
    out.extend_from_slice(&derived);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SALT: &[u8] = &[0x5a; 16];

    #[test]
    fn test_derive_key_v1_is_deterministic() {
        let a = derive_key_v1("password", SALT, 1000);
        let b = derive_key_v1("password", SALT, 1000);
        assert_eq!(a, b);
        assert_ne!(a, derive_key_v1("password", SALT, 1001));
        assert_ne!(a, derive_key_v1("Password", SALT, 1000));
    }

    #[test]
    fn test_keyhash_v1_differs_from_raw_key() {
        let key = derive_key_v1("password", SALT, 1000);
        let hash = derive_keyhash_v1("password", SALT, 1000);
        assert_eq!(hash.len(), 32);
        assert_ne!(hash.as_slice(), key.as_slice());
    }

    #[test]
    fn test_keyhash_v2_domain_separation() {
        let data = derive_keyhash_v2("data_key", "password", SALT, 1000);
        let other = derive_keyhash_v2("other", "password", SALT, 1000);
        assert_ne!(data, other);
    }

    #[test]
    fn test_auth_verifier_layout() {
        let verifier = create_auth_verifier("password", SALT, 1_000_000);
        assert_eq!(verifier.len(), 1 + 3 + 16 + 32);
        assert_eq!(verifier[0], 1);
        assert_eq!(&verifier[1..4], &[0x0f, 0x42, 0x40]);
        assert_eq!(&verifier[4..20], SALT);
    }
}
