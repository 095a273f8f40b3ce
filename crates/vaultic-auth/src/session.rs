//! Mutable state for one login attempt.
//!
//! A [`LoginSession`] is created per account, threaded through the state
//! machine, and populated as the authority answers. Secret material lives in
//! zeroizing containers and is dropped as early as the protocol allows; the
//! password in particular is cleared the moment the data key is resolved.

use std::collections::VecDeque;

use vaultic_crypto::{CryptoError, EcPrivateKey, EcPublicKey, RsaPrivateKey, RsaPublicKey};
use vaultic_encoding::B64Url;
use zeroize::Zeroizing;

/// The plaintext vault data key. Held only in memory, never persisted.
pub struct DataKey(Zeroizing<Vec<u8>>);

impl DataKey {
    /// Wrap recovered key bytes.
    pub fn new(bytes: Zeroizing<Vec<u8>>) -> Self {
        Self(bytes)
    }

    /// Borrow the raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The key as a fixed-size AES-256 key.
    pub fn to_aes_key(&self) -> Result<Zeroizing<[u8; 32]>, CryptoError> {
        let key: [u8; 32] = self
            .0
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidLength)?;
        Ok(Zeroizing::new(key))
    }
}

/// State carried across an SSO detour.
pub struct SsoSession {
    /// True for cloud SSO, false for on-site.
    pub is_cloud: bool,
    /// The identity provider's display name, when reported.
    pub provider_name: Option<String>,
    /// The IdP session id, used for single logout.
    pub idp_session_id: Option<String>,
    /// The service-provider URL the user was sent to.
    pub sso_url: String,
    passwords: VecDeque<Zeroizing<String>>,
}

impl SsoSession {
    /// Create a session for a completed redirect.
    pub fn new(is_cloud: bool, sso_url: String) -> Self {
        Self {
            is_cloud,
            provider_name: None,
            idp_session_id: None,
            sso_url,
            passwords: VecDeque::new(),
        }
    }

    /// Queue a password returned by the identity provider.
    pub fn push_password(&mut self, password: Zeroizing<String>) {
        self.passwords.push_back(password);
    }

    /// Take the oldest queued password, if any. Queued passwords are
    /// consumed in the order the provider returned them.
    pub fn pop_password(&mut self) -> Option<Zeroizing<String>> {
        self.passwords.pop_front()
    }
}

/// Everything the client knows about one login attempt.
///
/// Fields fill in as the state machine advances; [`LoginSession::clear_session`]
/// is the single teardown path for every terminal failure.
pub struct LoginSession {
    /// The account username. May be rewritten by the authority
    /// (`primary_username`, SSO-returned email).
    pub username: String,
    /// The region host, once a redirect pinned one.
    pub server: Option<String>,
    /// The password for the current attempt. Cleared after key resolution.
    pub password: Option<Zeroizing<String>>,
    /// The selected KDF salt bytes.
    pub salt: Vec<u8>,
    /// The selected KDF iteration count.
    pub iterations: u32,
    /// The issued session token.
    pub session_token: Option<String>,
    /// The account identifier.
    pub account_uid: Option<B64Url>,
    /// The fast-login clone code for the next attempt.
    pub clone_code: Option<B64Url>,
    /// The resolved vault data key.
    pub data_key: Option<DataKey>,
    /// The decrypted client key.
    pub client_key: Option<Zeroizing<Vec<u8>>>,
    /// The user's RSA private key, from the account summary.
    pub rsa_private_key: Option<RsaPrivateKey>,
    /// The user's EC private key, from the account summary.
    pub ec_private_key: Option<EcPrivateKey>,
    /// The enterprise RSA public key, for managed accounts.
    pub enterprise_rsa_key: Option<RsaPublicKey>,
    /// The enterprise EC public key, for managed accounts.
    pub enterprise_ec_key: Option<EcPublicKey>,
    /// Raw enforcement policies from the account summary.
    pub enforcements: Option<serde_json::Value>,
    /// Raw account settings from the account summary.
    pub settings: Option<serde_json::Value>,
    /// Raw license information from the account summary.
    pub license: Option<serde_json::Value>,
    /// Inactivity logout timer in minutes, after enforcement.
    pub logout_timer: u64,
    /// Present while the attempt is routed through SSO.
    pub sso: Option<SsoSession>,
}

impl LoginSession {
    /// Start a fresh session for `username`.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            server: None,
            password: None,
            salt: Vec::new(),
            iterations: 0,
            session_token: None,
            account_uid: None,
            clone_code: None,
            data_key: None,
            client_key: None,
            rsa_private_key: None,
            ec_private_key: None,
            enterprise_rsa_key: None,
            enterprise_ec_key: None,
            enforcements: None,
            settings: None,
            license: None,
            logout_timer: 0,
            sso: None,
        }
    }

    /// Drop all authenticated state and secrets. Called on every terminal
    /// failure so a dead session can never be mistaken for a live one.
    pub fn clear_session(&mut self) {
        self.password = None;
        self.session_token = None;
        self.data_key = None;
        self.client_key = None;
        self.rsa_private_key = None;
        self.ec_private_key = None;
        self.enterprise_rsa_key = None;
        self.enterprise_ec_key = None;
        self.enforcements = None;
        self.settings = None;
        self.license = None;
        self.sso = None;
    }

    /// True once a data key and session token are both held.
    pub fn is_authenticated(&self) -> bool {
        self.data_key.is_some() && self.session_token.is_some()
    }
}
