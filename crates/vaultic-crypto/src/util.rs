use rand::RngCore;
use zeroize::Zeroizing;

use crate::aes_stream::KEY_SIZE;

/// Generate a random AES-256 key.
///
/// Used for the vault data key and the one-shot SSO transmission key.
pub fn generate_aes_key() -> Zeroizing<[u8; KEY_SIZE]> {
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    rand::thread_rng().fill_bytes(key.as_mut());
    key
}

/// Generate a random 16-byte KDF salt.
pub fn generate_salt() -> [u8; 16] {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_distinct() {
        assert_ne!(*generate_aes_key(), *generate_aes_key());
    }

    #[test]
    fn test_salts_are_distinct() {
        assert_ne!(generate_salt(), generate_salt());
    }
}
