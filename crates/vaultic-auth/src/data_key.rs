//! Data key resolution.
//!
//! A `LoggedIn` answer carries the vault data key wrapped under one of
//! several schemes; which one decides both the decryption path and the
//! human-readable method label reported to the user.

use vaultic_crypto::{decrypt_aes_v2, decrypt_encryption_params, derive_keyhash_v2};
use zeroize::Zeroizing;

use crate::{
    api::{EncryptedDataKeyType, LoginResponse},
    client::LoginClient,
    error::LoginError,
    require,
    session::{DataKey, LoginSession},
};

impl LoginClient {
    /// Decrypt the data key from a `LoggedIn` response into the session.
    /// Returns the label of the login method that unlocked it.
    pub(crate) fn resolve_data_key(
        &self,
        session: &mut LoginSession,
        response: &LoginResponse,
    ) -> Result<&'static str, LoginError> {
        let scheme_raw = require!(response.encrypted_data_key_type);
        let encrypted = require!(response.encrypted_data_key.as_ref());

        match EncryptedDataKeyType::from_raw(scheme_raw) {
            Some(EncryptedDataKeyType::ByDevicePublicKey) => {
                let device_key = self.device_private_key()?;
                let data_key = device_key.decrypt(encrypted.as_bytes())?;
                session.data_key = Some(DataKey::new(Zeroizing::new(data_key)));
                Ok(if session.sso.is_some() {
                    "SSO Login"
                } else {
                    "Persistent Login"
                })
            }
            Some(EncryptedDataKeyType::ByPassword) => {
                let password = session
                    .password
                    .as_ref()
                    .ok_or(LoginError::MissingPassword)?;
                let data_key = decrypt_encryption_params(encrypted.as_bytes(), password)?;
                session.data_key = Some(DataKey::new(data_key));
                Ok("Password")
            }
            Some(EncryptedDataKeyType::ByAlternate) => {
                let password = session
                    .password
                    .as_ref()
                    .ok_or(LoginError::MissingPassword)?;
                let key =
                    derive_keyhash_v2("data_key", password, &session.salt, session.iterations);
                let data_key = decrypt_aes_v2(encrypted.as_bytes(), &key)?;
                session.data_key = Some(DataKey::new(Zeroizing::new(data_key)));
                Ok("Master Password")
            }
            // NoKey and biometric unlock never reach this client.
            _ => Err(LoginError::UnsupportedKeyScheme(scheme_raw)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use vaultic_crypto::{
        create_encryption_params, derive_keyhash_v2, encrypt_aes_v2, generate_ec_keypair,
    };
    use vaultic_encoding::B64Url;

    use super::*;
    use crate::{
        client::{ClientSettings, LoginClient},
        store::{config_keys, CredentialStore, MemoryCredentialStore},
        testing::{NoHardwareKeys, ScriptedTransport, ScriptedUi, StaticSummaryProvider},
    };

    fn client_with_store(store: Arc<MemoryCredentialStore>) -> LoginClient {
        LoginClient::new(
            Arc::new(ScriptedTransport::new()),
            store,
            Arc::new(ScriptedUi::new()),
            Arc::new(NoHardwareKeys),
            Arc::new(StaticSummaryProvider::default()),
            ClientSettings::new("test/1.0"),
        )
    }

    fn response(scheme: EncryptedDataKeyType, encrypted: Vec<u8>) -> LoginResponse {
        LoginResponse {
            login_state: 99,
            encrypted_data_key: Some(B64Url::from(encrypted)),
            encrypted_data_key_type: Some(scheme as i32),
            ..LoginResponse::default()
        }
    }

    #[test]
    fn test_device_key_scheme_labels_depend_on_sso() {
        let store = Arc::new(MemoryCredentialStore::new());
        let device_keys = generate_ec_keypair();
        store.set(
            config_keys::DEVICE_PRIVATE_KEY,
            &B64Url::from(device_keys.private.to_bytes().to_vec()).to_string(),
        );
        let client = client_with_store(store);

        let data_key = [0x11u8; 32];
        let response = response(
            EncryptedDataKeyType::ByDevicePublicKey,
            device_keys.public.encrypt(&data_key),
        );

        let mut session = LoginSession::new("user@example.com");
        let label = client.resolve_data_key(&mut session, &response).unwrap();
        assert_eq!(label, "Persistent Login");
        assert_eq!(session.data_key.as_ref().unwrap().as_bytes(), &data_key);

        let mut sso_session = LoginSession::new("user@example.com");
        sso_session.sso = Some(crate::session::SsoSession::new(true, "https://idp".into()));
        let label = client
            .resolve_data_key(&mut sso_session, &response)
            .unwrap();
        assert_eq!(label, "SSO Login");
    }

    #[test]
    fn test_password_scheme_unwraps_envelope() {
        let client = client_with_store(Arc::new(MemoryCredentialStore::new()));
        let data_key = [0x22u8; 32];
        let params = create_encryption_params("hunter2", &[9u8; 16], 1000, &data_key);
        let response = response(EncryptedDataKeyType::ByPassword, params);

        let mut session = LoginSession::new("user@example.com");
        session.password = Some(zeroize::Zeroizing::new("hunter2".into()));
        let label = client.resolve_data_key(&mut session, &response).unwrap();
        assert_eq!(label, "Password");
        assert_eq!(session.data_key.as_ref().unwrap().as_bytes(), &data_key);
    }

    #[test]
    fn test_password_scheme_without_password_fails() {
        let client = client_with_store(Arc::new(MemoryCredentialStore::new()));
        let params = create_encryption_params("hunter2", &[9u8; 16], 1000, &[0u8; 32]);
        let response = response(EncryptedDataKeyType::ByPassword, params);

        let mut session = LoginSession::new("user@example.com");
        assert!(matches!(
            client.resolve_data_key(&mut session, &response),
            Err(LoginError::MissingPassword)
        ));
    }

    #[test]
    fn test_alternate_scheme_uses_domain_separated_hash() {
        let client = client_with_store(Arc::new(MemoryCredentialStore::new()));
        let salt = [3u8; 16];
        let data_key = [0x33u8; 32];
        let key = derive_keyhash_v2("data_key", "hunter2", &salt, 1000);
        let response = response(
            EncryptedDataKeyType::ByAlternate,
            encrypt_aes_v2(&data_key, &key),
        );

        let mut session = LoginSession::new("user@example.com");
        session.password = Some(zeroize::Zeroizing::new("hunter2".into()));
        session.salt = salt.to_vec();
        session.iterations = 1000;
        let label = client.resolve_data_key(&mut session, &response).unwrap();
        assert_eq!(label, "Master Password");
        assert_eq!(session.data_key.as_ref().unwrap().as_bytes(), &data_key);
    }

    #[test]
    fn test_unsupported_schemes_are_rejected() {
        let client = client_with_store(Arc::new(MemoryCredentialStore::new()));
        let mut session = LoginSession::new("user@example.com");
        for raw in [0, 4, 17] {
            let response = LoginResponse {
                login_state: 99,
                encrypted_data_key: Some(B64Url::from(vec![0u8; 16])),
                encrypted_data_key_type: Some(raw),
                ..LoginResponse::default()
            };
            assert!(matches!(
                client.resolve_data_key(&mut session, &response),
                Err(LoginError::UnsupportedKeyScheme(r)) if r == raw
            ));
        }
    }
}
