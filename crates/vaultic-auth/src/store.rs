//! Local persisted configuration.
//!
//! The login flow persists exactly three secrets-adjacent values per account:
//! the opaque device token, the device private key, and the clone code. The
//! plaintext data key and the raw password are never written here under any
//! exit path.

use std::{
    collections::HashMap,
    sync::Mutex,
};

/// Well-known configuration keys.
pub mod config_keys {
    /// The encrypted device token issued at registration, base64url.
    pub const DEVICE_TOKEN: &str = "device_token";
    /// The device EC private key scalar, base64url.
    pub const DEVICE_PRIVATE_KEY: &str = "device_private_key";
    /// The persisted fast-login clone code, base64url.
    pub const CLONE_CODE: &str = "clone_code";
    /// Present when an SSO user prefers master-password login.
    pub const SSO_MASTER_PASSWORD: &str = "sso_master_password";
    /// The user's preferred two-factor trust duration.
    pub const TWO_FACTOR_DURATION: &str = "two_factor_duration";
}

/// Get/set access to the local configuration file.
pub trait CredentialStore: Send + Sync {
    /// Read a value.
    fn get(&self, key: &str) -> Option<String>;
    /// Write a value. Not durable until [`CredentialStore::persist`].
    fn set(&self, key: &str, value: &str);
    /// Delete a value.
    fn remove(&self, key: &str);
    /// Flush pending writes to durable storage.
    fn persist(&self);
}

/// An in-memory [`CredentialStore`], used by tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryCredentialStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryCredentialStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .expect("store mutex poisoned")
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values
            .lock()
            .expect("store mutex poisoned")
            .insert(key.to_owned(), value.to_owned());
    }

    fn remove(&self, key: &str) {
        self.values.lock().expect("store mutex poisoned").remove(key);
    }

    fn persist(&self) {}
}
