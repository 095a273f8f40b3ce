//! End-to-end exercises of the login state machine over scripted
//! capabilities.

use std::sync::Arc;

use vaultic_auth::{
    api::{LoginResponse, Salt, TwoFactorChannelInfo},
    config_keys,
    testing::{NoHardwareKeys, ScriptedTransport, ScriptedUi, StaticSummaryProvider},
    ApiError, ClientSettings, CredentialStore, LoginClient, LoginError, LoginOptions,
    LoginSession, MemoryCredentialStore, endpoint,
};
use vaultic_crypto::{
    create_encryption_params, derive_keyhash_v1, generate_ec_keypair, EcKeyPair,
};
use vaultic_encoding::B64Url;

struct Harness {
    client: LoginClient,
    transport: Arc<ScriptedTransport>,
    ui: Arc<ScriptedUi>,
    store: Arc<MemoryCredentialStore>,
    device_keys: EcKeyPair,
}

/// A client over scripted capabilities, with a registered device identity
/// already persisted.
fn harness() -> Harness {
    let transport = Arc::new(ScriptedTransport::new());
    let ui = Arc::new(ScriptedUi::new());
    let store = Arc::new(MemoryCredentialStore::new());

    let device_keys = generate_ec_keypair();
    store.set(
        config_keys::DEVICE_TOKEN,
        &B64Url::from(b"device-token".as_slice()).to_string(),
    );
    store.set(
        config_keys::DEVICE_PRIVATE_KEY,
        &B64Url::from(device_keys.private.to_bytes().to_vec()).to_string(),
    );

    let client = LoginClient::new(
        transport.clone(),
        store.clone(),
        ui.clone(),
        Arc::new(NoHardwareKeys),
        Arc::new(StaticSummaryProvider::default()),
        ClientSettings::new("test/1.0.0"),
    );
    Harness {
        client,
        transport,
        ui,
        store,
        device_keys,
    }
}

fn api_error(code: &str, message: &str) -> ApiError {
    ApiError {
        code: code.to_owned(),
        message: message.to_owned(),
        additional_info: None,
        region_host: None,
    }
}

fn login_token() -> B64Url {
    B64Url::from(b"login-token-0001".as_slice())
}

fn master_salt() -> ([u8; 16], u32) {
    ([0x5a; 16], 100_000)
}

fn auth_hash_response() -> LoginResponse {
    let (salt, iterations) = master_salt();
    LoginResponse {
        login_state: 13,
        encrypted_login_token: Some(login_token()),
        salt: vec![Salt {
            name: Some("Master".to_owned()),
            salt: B64Url::from(salt.to_vec()),
            iterations,
        }],
        ..LoginResponse::default()
    }
}

fn logged_in_password_response(password: &str, data_key: &[u8; 32]) -> LoginResponse {
    let (salt, iterations) = master_salt();
    LoginResponse {
        login_state: 99,
        encrypted_session_token: Some(B64Url::from(b"session-token".as_slice())),
        session_token_type: Some(0),
        encrypted_data_key: Some(B64Url::from(create_encryption_params(
            password, &salt, iterations, data_key,
        ))),
        encrypted_data_key_type: Some(2),
        clone_code: Some(B64Url::from(b"clone-code-next".as_slice())),
        ..LoginResponse::default()
    }
}

#[tokio::test]
async fn unknown_login_state_aborts() {
    let h = harness();
    h.transport.expect_payload(
        endpoint::START_LOGIN,
        &LoginResponse {
            login_state: 55,
            ..LoginResponse::default()
        },
    );

    let mut session = LoginSession::new("user@example.com");
    let err = h
        .client
        .login(&mut session, LoginOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LoginError::UnknownState(55)));
}

#[tokio::test]
async fn locked_account_clears_session_and_names_user() {
    let h = harness();
    h.transport.expect_payload(
        endpoint::START_LOGIN,
        &LoginResponse {
            login_state: 4,
            ..LoginResponse::default()
        },
    );

    let mut session = LoginSession::new("user@example.com");
    session.session_token = Some("stale".to_owned());
    let err = h
        .client
        .login(&mut session, LoginOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LoginError::AccountLocked(user) if user == "user@example.com"));
    assert!(session.session_token.is_none());
}

#[tokio::test]
async fn region_redirect_registers_device_before_restarting() {
    let h = harness();
    h.transport.expect_payload(
        endpoint::START_LOGIN,
        &LoginResponse {
            login_state: 8,
            state_specific_value: Some("eu.vaultic.example".to_owned()),
            ..LoginResponse::default()
        },
    );
    h.transport
        .expect_payload(endpoint::REGISTER_DEVICE_IN_REGION, &serde_json::json!({}));
    h.transport.expect_payload(
        endpoint::START_LOGIN,
        &LoginResponse {
            login_state: 15,
            ..LoginResponse::default()
        },
    );

    let mut session = LoginSession::new("user@example.com");
    let err = h
        .client
        .login(&mut session, LoginOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LoginError::AccountNotProvisioned));

    assert_eq!(
        h.transport.calls(),
        vec![
            endpoint::START_LOGIN.to_owned(),
            "set_region:eu.vaultic.example".to_owned(),
            endpoint::REGISTER_DEVICE_IN_REGION.to_owned(),
            endpoint::START_LOGIN.to_owned(),
        ]
    );
    assert_eq!(session.server.as_deref(), Some("eu.vaultic.example"));
    assert!(h.transport.script_exhausted());
}

#[tokio::test]
async fn auth_hash_without_salt_requires_recovery() {
    let h = harness();
    h.transport.expect_payload(
        endpoint::START_LOGIN,
        &LoginResponse {
            login_state: 13,
            encrypted_login_token: Some(login_token()),
            ..LoginResponse::default()
        },
    );

    let mut session = LoginSession::new("user@example.com");
    let err = h
        .client
        .login(&mut session, LoginOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LoginError::RecoveryRequired));
    assert!(h.ui.prompts().is_empty());
}

#[tokio::test]
async fn password_login_end_to_end() {
    let h = harness();
    let data_key = [0x42u8; 32];
    h.transport
        .expect_payload(endpoint::START_LOGIN, &auth_hash_response());
    h.transport.expect_payload(
        endpoint::VALIDATE_AUTH_HASH,
        &logged_in_password_response("hunter2", &data_key),
    );
    h.ui.push_secret("hunter2");

    let mut session = LoginSession::new("user@example.com");
    h.client
        .login(&mut session, LoginOptions::default())
        .await
        .unwrap();

    assert!(session.is_authenticated());
    assert_eq!(session.data_key.as_ref().unwrap().as_bytes(), &data_key);
    assert!(session.password.is_none());
    assert_eq!(
        h.store.get(config_keys::CLONE_CODE),
        Some(B64Url::from(b"clone-code-next".as_slice()).to_string())
    );
    assert!(h
        .ui
        .messages()
        .iter()
        .any(|m| m == "Successfully authenticated with Password"));

    // The submitted verifier is the v1 keyhash over the offered salt.
    let (salt, iterations) = master_salt();
    let request = h.transport.request_json(1);
    assert_eq!(
        request["authResponse"],
        B64Url::from(derive_keyhash_v1("hunter2", &salt, iterations)).to_string()
    );
}

#[tokio::test]
async fn wrong_password_warns_and_reprompts() {
    let h = harness();
    let data_key = [0x42u8; 32];
    h.transport
        .expect_payload(endpoint::START_LOGIN, &auth_hash_response());
    h.transport.expect_error(
        endpoint::VALIDATE_AUTH_HASH,
        api_error("auth_failed", "invalid credentials"),
    );
    h.transport.expect_payload(
        endpoint::VALIDATE_AUTH_HASH,
        &logged_in_password_response("hunter2", &data_key),
    );
    h.ui.push_secret("wrong-password");
    h.ui.push_secret("hunter2");

    let mut session = LoginSession::new("user@example.com");
    h.client
        .login(&mut session, LoginOptions::default())
        .await
        .unwrap();

    assert!(session.is_authenticated());
    assert!(h
        .ui
        .messages()
        .iter()
        .any(|m| m.contains("Invalid email or password combination")));
}

#[tokio::test]
async fn sms_two_factor_resumes_with_fresh_token() {
    let h = harness();
    h.transport.expect_payload(
        endpoint::START_LOGIN,
        &LoginResponse {
            login_state: 12,
            encrypted_login_token: Some(login_token()),
            channels: vec![TwoFactorChannelInfo {
                channel_type: 3,
                channel_uid: Some(B64Url::from(b"sms-channel".as_slice())),
                channel_name: None,
                phone_number: Some("+1 (555) 555-0100".to_owned()),
                challenge: None,
            }],
            ..LoginResponse::default()
        },
    );
    h.transport
        .expect_payload(endpoint::TWO_FA_SEND_PUSH, &serde_json::json!({}));
    h.transport.expect_payload(
        endpoint::TWO_FA_VALIDATE,
        &serde_json::json!({
            "encryptedLoginToken": B64Url::from(b"login-token-0002".as_slice()).to_string(),
        }),
    );
    h.transport.expect_payload(
        endpoint::START_LOGIN,
        &LoginResponse {
            login_state: 15,
            ..LoginResponse::default()
        },
    );
    h.ui.push_line("1");
    h.ui.push_line("123456");

    let mut session = LoginSession::new("user@example.com");
    let err = h
        .client
        .login(&mut session, LoginOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LoginError::AccountNotProvisioned));

    // The resume carries the token minted by 2FA validation, not the
    // original one.
    let resume = h.transport.request_json(3);
    assert_eq!(
        resume["encryptedLoginToken"],
        B64Url::from(b"login-token-0002".as_slice()).to_string()
    );
    assert_eq!(resume["loginType"], 0);
    assert!(h
        .ui
        .messages()
        .iter()
        .any(|m| m == "Successfully verified 2FA Code."));
}

#[tokio::test]
async fn device_approval_restarts_login_without_stale_token() {
    let h = harness();
    h.transport.expect_payload(
        endpoint::START_LOGIN,
        &LoginResponse {
            login_state: 2,
            encrypted_login_token: Some(login_token()),
            ..LoginResponse::default()
        },
    );
    h.transport.expect_payload(
        endpoint::START_LOGIN,
        &LoginResponse {
            login_state: 15,
            ..LoginResponse::default()
        },
    );
    // <Enter> at the approval menu resumes once approved elsewhere.
    h.ui.push_line("");

    let mut session = LoginSession::new("user@example.com");
    let err = h
        .client
        .login(&mut session, LoginOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LoginError::AccountNotProvisioned));

    // The attempt after approval is a fresh start, not a resume: no login
    // token, no clone code, the username spelled out.
    let restart = h.transport.request_json(1);
    assert_eq!(restart["username"], "user@example.com");
    assert!(restart.get("encryptedLoginToken").is_none());
    assert!(restart.get("cloneCode").is_none());
    assert!(h.transport.script_exhausted());
}

#[tokio::test]
async fn resolved_transfer_restarts_with_refreshed_clone_code() {
    let h = harness();
    let data_key = [0x42u8; 32];
    h.transport
        .expect_payload(endpoint::START_LOGIN, &auth_hash_response());
    let mut response = logged_in_password_response("hunter2", &data_key);
    response.session_token_type = Some(2);
    h.transport
        .expect_payload(endpoint::VALIDATE_AUTH_HASH, &response);
    h.transport.expect_payload(
        endpoint::START_LOGIN,
        &LoginResponse {
            login_state: 15,
            ..LoginResponse::default()
        },
    );
    h.ui.push_secret("hunter2");
    h.ui.push_line("yes");

    let mut session = LoginSession::new("user@example.com");
    let err = h
        .client
        .login(&mut session, LoginOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LoginError::AccountNotProvisioned));

    // The restart after the accepted transfer carries the clone code the
    // finished attempt minted, not whatever the attempt started with.
    let restart = h.transport.request_json(2);
    assert_eq!(
        restart["cloneCode"],
        B64Url::from(b"clone-code-next".as_slice()).to_string()
    );
    assert!(restart.get("encryptedLoginToken").is_none());
}

#[tokio::test]
async fn clone_code_login_sends_empty_username() {
    let h = harness();
    h.store.set(
        config_keys::CLONE_CODE,
        &B64Url::from(b"clone-code-prev".as_slice()).to_string(),
    );
    h.transport.expect_payload(
        endpoint::START_LOGIN,
        &LoginResponse {
            login_state: 15,
            ..LoginResponse::default()
        },
    );

    let mut session = LoginSession::new("user@example.com");
    let err = h
        .client
        .login(&mut session, LoginOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LoginError::AccountNotProvisioned));

    let start = h.transport.request_json(0);
    assert_eq!(start["username"], "");
    assert_eq!(
        start["cloneCode"],
        B64Url::from(b"clone-code-prev".as_slice()).to_string()
    );
    assert!(start.get("encryptedLoginToken").is_none());
}

#[tokio::test]
async fn new_login_ignores_persisted_clone_code() {
    let h = harness();
    h.store.set(
        config_keys::CLONE_CODE,
        &B64Url::from(b"clone-code-prev".as_slice()).to_string(),
    );
    h.transport.expect_payload(
        endpoint::START_LOGIN,
        &LoginResponse {
            login_state: 15,
            ..LoginResponse::default()
        },
    );

    let mut session = LoginSession::new("user@example.com");
    let _ = h
        .client
        .login(
            &mut session,
            LoginOptions {
                new_login: true,
                ..LoginOptions::default()
            },
        )
        .await;

    let start = h.transport.request_json(0);
    assert_eq!(start["username"], "user@example.com");
    assert!(start.get("cloneCode").is_none());
}

#[tokio::test]
async fn persistent_login_decrypts_device_wrapped_data_key() {
    let h = harness();
    let data_key = [0x7fu8; 32];
    h.transport.expect_payload(
        endpoint::START_LOGIN,
        &LoginResponse {
            login_state: 99,
            encrypted_session_token: Some(B64Url::from(b"session-token".as_slice())),
            session_token_type: Some(0),
            encrypted_data_key: Some(B64Url::from(h.device_keys.public.encrypt(&data_key))),
            encrypted_data_key_type: Some(1),
            primary_username: Some("primary@example.com".to_owned()),
            ..LoginResponse::default()
        },
    );

    let mut session = LoginSession::new("user@example.com");
    h.client
        .login(&mut session, LoginOptions::default())
        .await
        .unwrap();

    assert!(session.is_authenticated());
    assert_eq!(session.username, "primary@example.com");
    assert_eq!(session.data_key.as_ref().unwrap().as_bytes(), &data_key);
    assert!(h
        .ui
        .messages()
        .iter()
        .any(|m| m == "Successfully authenticated with Persistent Login"));
}

#[tokio::test]
async fn restricted_purchase_token_fails_with_account_expired() {
    let h = harness();
    let data_key = [0x42u8; 32];
    h.transport
        .expect_payload(endpoint::START_LOGIN, &auth_hash_response());
    let mut response = logged_in_password_response("hunter2", &data_key);
    response.session_token_type = Some(3);
    h.transport
        .expect_payload(endpoint::VALIDATE_AUTH_HASH, &response);
    h.ui.push_secret("hunter2");

    let mut session = LoginSession::new("user@example.com");
    let err = h
        .client
        .login(&mut session, LoginOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LoginError::AccountExpired));
    assert!(session.session_token.is_none());
}
