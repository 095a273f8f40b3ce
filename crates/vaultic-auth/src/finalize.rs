//! Post-login finalization.
//!
//! A `LoggedIn` answer is not yet a usable session: the data key must be
//! unwrapped, token restrictions honored, the account summary absorbed, and
//! enterprise key material fetched for managed accounts. Restricted tokens
//! either abort or resolve into a fresh full login.

use log::debug;
use regex::Regex;
use vaultic_crypto::{
    create_auth_verifier, create_encryption_params, decrypt_aes_v1, decrypt_aes_v2,
    generate_salt, EcPublicKey, RsaPrivateKey, RsaPublicKey,
};
use vaultic_encoding::B64Url;
use zeroize::Zeroizing;

use crate::{
    api::{
        AccountSummary, ChangeMasterPasswordRequest, DomainPasswordRulesRequest,
        EnterprisePublicKeyRequest, EnterprisePublicKeyResponse, LoginResponse,
        NewUserMinimumParams, SessionTokenType,
    },
    client::LoginClient,
    error::LoginError,
    interact::Severity,
    require,
    session::LoginSession,
    store::config_keys,
    transport::{endpoint, round_trip, round_trip_unit},
};

/// The floor applied to KDF iterations whenever a new password is minted.
const MIN_ITERATIONS: u32 = 1_000_000;

impl LoginClient {
    /// Finish a `LoggedIn` response. Returns `true` when the session is
    /// ready, `false` when a restriction was resolved and the whole login
    /// must run again.
    pub(crate) async fn post_login_processing(
        &self,
        session: &mut LoginSession,
        response: &LoginResponse,
    ) -> Result<bool, LoginError> {
        if let Some(username) = response.primary_username.clone() {
            session.username = username;
        }
        session.account_uid = response.account_uid.clone();
        let session_token = require!(response.encrypted_session_token.as_ref());
        session.session_token = Some(session_token.to_string());

        let method_label = self.resolve_data_key(session, response)?;
        // The data key is resolved; the password has no further use.
        session.password = None;

        if let Some(clone_code) = response.clone_code.clone() {
            self.store
                .set(config_keys::CLONE_CODE, &clone_code.to_string());
            self.store.persist();
            session.clone_code = Some(clone_code);
        }

        let token_type = response.session_token_type.unwrap_or(0);
        match SessionTokenType::from_raw(token_type) {
            Some(SessionTokenType::NoRestriction) => {}
            Some(SessionTokenType::Purchase) | Some(SessionTokenType::Restrict) => {
                session.session_token = None;
                return Err(LoginError::AccountExpired);
            }
            Some(SessionTokenType::AccountRecovery) => {
                self.ui.message(
                    "Your account requires a master password change before you can continue.",
                    Severity::Warning,
                );
                return if self.change_master_password(session).await? {
                    Ok(false)
                } else {
                    session.clear_session();
                    Err(LoginError::PasswordChangeFailed)
                };
            }
            Some(SessionTokenType::ShareAccount) => {
                self.ui.message(
                    "Your administrator requires this account to be transferred. \
                     Declining will lock the account.",
                    Severity::Warning,
                );
                let answer = self.ui.prompt_line("Accept the transfer? (yes/no)").await;
                return match answer.trim().to_lowercase().as_str() {
                    "yes" | "y" => Ok(false),
                    _ => {
                        session.clear_session();
                        Err(LoginError::AccountTransferDeclined)
                    }
                };
            }
            None => return Err(LoginError::RestrictedSession),
        }

        self.populate_account_summary(session).await;
        self.fetch_enterprise_keys(session).await;

        self.ui.message(
            &format!("Successfully authenticated with {method_label}"),
            Severity::Info,
        );
        Ok(true)
    }

    /// Absorb the account summary into the session. Best-effort: a missing
    /// or partially undecryptable summary degrades the session rather than
    /// failing the login.
    async fn populate_account_summary(&self, session: &mut LoginSession) {
        let summary: AccountSummary = match self.summary.fetch().await {
            Ok(summary) => summary,
            Err(err) => {
                debug!("account summary unavailable: {err}");
                return;
            }
        };

        let aes_key = session
            .data_key
            .as_ref()
            .and_then(|key| key.to_aes_key().ok());

        if let (Some(key), Some(client_key)) = (&aes_key, &summary.client_key) {
            match decrypt_aes_v1(client_key.as_bytes(), key) {
                Ok(decrypted) => session.client_key = Some(Zeroizing::new(decrypted)),
                Err(err) => debug!("client key decryption failed: {err}"),
            }
        }

        if let (Some(key), Some(keys_info)) = (&aes_key, &summary.keys_info) {
            if let Some(wrapped) = &keys_info.encrypted_private_key {
                match decrypt_aes_v1(wrapped.as_bytes(), key)
                    .map(Zeroizing::new)
                    .and_then(|der| RsaPrivateKey::from_pkcs8_der(&der))
                {
                    Ok(private) => session.rsa_private_key = Some(private),
                    Err(err) => debug!("RSA private key decryption failed: {err}"),
                }
            }
            if let Some(wrapped) = &keys_info.encrypted_ecc_private_key {
                match decrypt_aes_v2(wrapped.as_bytes(), key)
                    .map(Zeroizing::new)
                    .and_then(|scalar| vaultic_crypto::EcPrivateKey::from_bytes(&scalar))
                {
                    Ok(private) => session.ec_private_key = Some(private),
                    Err(err) => debug!("EC private key decryption failed: {err}"),
                }
            }
        }

        if let Some(enforcements) = &summary.enforcements {
            if let Some(minutes) = enforcements
                .get("logout_timer_desktop")
                .and_then(|value| value.as_u64())
            {
                if minutes > 0 {
                    session.logout_timer = minutes;
                }
            }
        }
        session.enforcements = summary.enforcements;
        session.settings = summary.settings;
        session.license = summary.license;

        if session.session_token.is_none() {
            session.session_token = summary.session_token;
        }
    }

    /// Fetch enterprise public keys for managed accounts. Best-effort.
    async fn fetch_enterprise_keys(&self, session: &mut LoginSession) {
        let is_enterprise = session
            .license
            .as_ref()
            .and_then(|license| license.get("account_type"))
            .and_then(|value| value.as_i64())
            == Some(2);
        if !is_enterprise {
            return;
        }

        let keys: EnterprisePublicKeyResponse = match round_trip(
            self.transport.as_ref(),
            endpoint::GET_ENTERPRISE_PUBLIC_KEY,
            &EnterprisePublicKeyRequest::default(),
        )
        .await
        {
            Ok(Ok(keys)) => keys,
            Ok(Err(err)) => {
                debug!("enterprise public key rejected: {err}");
                return;
            }
            Err(err) => {
                debug!("enterprise public key unavailable: {err}");
                return;
            }
        };

        if let Some(der) = &keys.enterprise_public_key {
            match RsaPublicKey::from_pkcs1_der(der.as_bytes()) {
                Ok(key) => session.enterprise_rsa_key = Some(key),
                Err(err) => debug!("enterprise RSA key unparsable: {err}"),
            }
        }
        if let Some(sec1) = &keys.enterprise_ecc_public_key {
            match EcPublicKey::from_bytes(sec1.as_bytes()) {
                Ok(key) => session.enterprise_ec_key = Some(key),
                Err(err) => debug!("enterprise EC key unparsable: {err}"),
            }
        }
    }

    /// Walk the user through a master password change. Returns `false`
    /// when the user backs out.
    pub(crate) async fn change_master_password(
        &self,
        session: &mut LoginSession,
    ) -> Result<bool, LoginError> {
        let rules: NewUserMinimumParams = round_trip(
            self.transport.as_ref(),
            endpoint::GET_DOMAIN_PASSWORD_RULES,
            &DomainPasswordRulesRequest {
                username: session.username.clone(),
            },
        )
        .await?
        .map_err(LoginError::Api)?;

        loop {
            let password = self.ui.prompt_secret("New master password").await;
            if password.is_empty() {
                self.ui.message("Canceled", Severity::Info);
                return Ok(false);
            }
            let password = Zeroizing::new(password);
            let confirmation =
                Zeroizing::new(self.ui.prompt_secret("Re-enter new master password").await);
            if *password != *confirmation {
                self.ui
                    .message("Passwords do not match.", Severity::Warning);
                continue;
            }

            let failures = failing_rules(&rules, &password);
            if !failures.is_empty() {
                let mut text =
                    String::from("The password does not meet the following requirements:");
                for description in &failures {
                    text.push_str("\n  ");
                    text.push_str(description);
                }
                self.ui.message(&text, Severity::Warning);
                continue;
            }

            let iterations = session.iterations.max(MIN_ITERATIONS);
            let verifier_salt = generate_salt();
            let params_salt = generate_salt();
            let data_key = require!(session.data_key.as_ref());
            let aes_key = data_key.to_aes_key()?;

            let request = ChangeMasterPasswordRequest {
                auth_verifier: B64Url::from(create_auth_verifier(
                    &password,
                    &verifier_salt,
                    iterations,
                )),
                encryption_params: B64Url::from(create_encryption_params(
                    &password,
                    &params_salt,
                    iterations,
                    &aes_key,
                )),
            };
            round_trip_unit(
                self.transport.as_ref(),
                endpoint::CHANGE_MASTER_PASSWORD,
                &request,
            )
            .await?
            .map_err(LoginError::Api)?;

            session.salt = verifier_salt.to_vec();
            session.iterations = iterations;
            session.password = Some(password);
            self.ui
                .message("Master password successfully changed.", Severity::Info);
            return Ok(true);
        }
    }
}

/// Descriptions of the rules `password` fails. Rules are anchored at the
/// start of the candidate, and an unparsable rule is skipped rather than
/// failing every password.
pub(crate) fn failing_rules(rules: &NewUserMinimumParams, password: &str) -> Vec<String> {
    rules
        .password_match_regex
        .iter()
        .zip(rules.password_match_description.iter())
        .filter_map(|(pattern, description)| {
            let anchored = format!("\\A(?:{pattern})");
            match Regex::new(&anchored) {
                Ok(regex) => (!regex.is_match(password)).then(|| description.clone()),
                Err(err) => {
                    debug!("skipping unparsable password rule {pattern:?}: {err}");
                    None
                }
            }
        })
        .collect()
}
