//! The server-driven login state machine.
//!
//! The authority owns the flow: every start/resume answer names the next
//! state, and this module dispatches on it until the attempt reaches
//! `LoggedIn` or a terminal failure. The client never invents transitions;
//! an unrecognized state aborts rather than guessing.

use std::str::FromStr;

use log::info;
use vaultic_crypto::derive_keyhash_v1;
use vaultic_encoding::B64Url;
use zeroize::Zeroizing;

use crate::{
    api::{
        LoginMethod, LoginResponse, LoginState, LoginType, PasswordMethod, Salt,
        StartLoginRequest, ValidateAuthHashRequest,
    },
    client::LoginClient,
    error::{LoginError, MissingFieldError},
    interact::Severity,
    require,
    session::LoginSession,
    store::config_keys,
    transport::{endpoint, round_trip},
};

/// Guidance appended to `restricted_client_type` rejections.
const RESTRICTED_CLIENT_HINT: &str =
    "\nTo resolve, an administrator must allow this client type in the admin console.";

/// Knobs for one login attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoginOptions {
    /// Discard the persisted device identity and register a new one.
    pub new_device: bool,
    /// Ignore the persisted clone code; force a full interactive login.
    pub new_login: bool,
}

impl LoginClient {
    /// Log `session` in, driving every interactive step through the
    /// injected capabilities. On success the session holds a session token
    /// and the plaintext data key; on terminal failure it is cleared.
    pub async fn login(
        &self,
        session: &mut LoginSession,
        options: LoginOptions,
    ) -> Result<(), LoginError> {
        let device_token = self.device_token(options.new_device).await?;
        session.sso = None;

        let clone_code = if options.new_login {
            None
        } else {
            session.clone_code.clone().or_else(|| {
                self.store
                    .get(config_keys::CLONE_CODE)
                    .and_then(|value| B64Url::from_str(&value).ok())
            })
        };

        // An SSO user who opted into master-password login authenticates
        // with the alternate derivation from the start.
        let mut login_type = if self.store.get(config_keys::SSO_MASTER_PASSWORD).is_some() {
            LoginType::Alternate
        } else {
            LoginType::Normal
        };

        let mut response = self
            .start_login(session, &device_token, login_type, clone_code.clone(), None)
            .await?;

        loop {
            let state = LoginState::from_raw(response.login_state)
                .ok_or(LoginError::UnknownState(response.login_state))?;

            match state {
                LoginState::DeviceApprovalRequired => {
                    let login_token = require!(response.encrypted_login_token.clone());
                    while !self
                        .verify_device(session, &device_token, &login_token)
                        .await?
                    {}
                    self.ui
                        .message("Verifying device approval, resuming login", Severity::Info);
                    // An approved device gets a fresh attempt; the token
                    // issued before approval is dead.
                    response = self
                        .start_login(session, &device_token, login_type, None, None)
                        .await?;
                }

                LoginState::Requires2fa => {
                    let login_token = loop {
                        if let Some(token) = self.handle_two_factor(&response).await? {
                            break token;
                        }
                    };
                    response = self
                        .resume_login(session, &device_token, login_type, login_token, LoginMethod::ExistingAccount)
                        .await?;
                }

                LoginState::RequiresUsername => {
                    loop {
                        let entered = self.ui.prompt_line("Enter username or email").await;
                        let entered = entered.trim();
                        if !entered.is_empty() {
                            session.username = entered.to_lowercase();
                            break;
                        }
                    }
                    let login_token = require!(response.encrypted_login_token.clone());
                    response = self
                        .resume_login(session, &device_token, login_type, login_token, LoginMethod::ExistingAccount)
                        .await?;
                }

                LoginState::RedirectCloudSso | LoginState::RedirectOnsiteSso => {
                    let sso_url = require!(response.url.clone());
                    let is_cloud = state == LoginState::RedirectCloudSso;
                    match self
                        .handle_sso_redirect(
                            session,
                            is_cloud,
                            &sso_url,
                            response.encrypted_login_token.clone(),
                        )
                        .await?
                    {
                        Some(login_token) => {
                            response = self
                                .resume_login(
                                    session,
                                    &device_token,
                                    login_type,
                                    login_token,
                                    LoginMethod::AfterSso,
                                )
                                .await?;
                        }
                        None => {
                            // The user chose the master-password route.
                            self.ui.message(
                                "Attempting to authenticate with a master password.",
                                Severity::Info,
                            );
                            login_type = LoginType::Alternate;
                            response = self
                                .start_login(session, &device_token, login_type, None, None)
                                .await?;
                        }
                    }
                }

                LoginState::RequiresDeviceEncryptedDataKey => {
                    let login_token = require!(response.encrypted_login_token.clone());
                    self.approve_device_for_data_key(session, &device_token, &login_token)
                        .await?;
                    response = self
                        .resume_login(session, &device_token, login_type, login_token, LoginMethod::ExistingAccount)
                        .await?;
                }

                LoginState::RequiresAccountCreation => {
                    return Err(LoginError::AccountNotProvisioned);
                }

                LoginState::RegionRedirect => {
                    let host = require!(response.state_specific_value.clone());
                    info!("redirecting login to region {host}");
                    self.transport.set_region(&host);
                    session.server = Some(host);
                    // The device must exist in the new region before the
                    // attempt can restart there.
                    self.register_device_in_region(&device_token).await?;
                    response = self
                        .start_login(session, &device_token, login_type, clone_code.clone(), None)
                        .await?;
                }

                LoginState::RequiresAuthHash => {
                    response = self.validate_password(session, &response).await?;
                }

                LoginState::LoggedIn => {
                    if self.post_login_processing(session, &response).await? {
                        return Ok(());
                    }
                    // A restricted session was resolved (password changed,
                    // transfer accepted); authenticate again from scratch
                    // with the clone code the finished attempt just minted.
                    response = self
                        .start_login(
                            session,
                            &device_token,
                            login_type,
                            session.clone_code.clone(),
                            None,
                        )
                        .await?;
                }

                LoginState::DeviceLocked => {
                    session.clear_session();
                    return Err(LoginError::DeviceLocked);
                }
                LoginState::DeviceAccountLocked => {
                    session.clear_session();
                    return Err(LoginError::DeviceAccountLocked);
                }
                LoginState::AccountLocked => {
                    session.clear_session();
                    return Err(LoginError::AccountLocked(session.username.clone()));
                }
                LoginState::LicenseExpired => {
                    session.clear_session();
                    return Err(LoginError::LicenseExpired);
                }
                LoginState::Upgrade => {
                    return Err(LoginError::UpgradeRequired);
                }
            }
        }
    }

    /// Open a fresh attempt. A clone code replaces the username entirely;
    /// the two never travel together with a login token.
    pub(crate) async fn start_login(
        &self,
        session: &mut LoginSession,
        device_token: &B64Url,
        login_type: LoginType,
        clone_code: Option<B64Url>,
        login_token: Option<B64Url>,
    ) -> Result<LoginResponse, LoginError> {
        let username = if clone_code.is_some() && login_token.is_none() {
            String::new()
        } else {
            session.username.clone()
        };
        let request = StartLoginRequest {
            client_version: self.settings.client_version.clone(),
            username,
            encrypted_device_token: device_token.clone(),
            login_type,
            login_method: LoginMethod::ExistingAccount,
            encrypted_login_token: login_token,
            clone_code,
        };
        self.send_start_login(session, request).await
    }

    /// Resume an attempt with a server-issued login token.
    pub(crate) async fn resume_login(
        &self,
        session: &mut LoginSession,
        device_token: &B64Url,
        login_type: LoginType,
        login_token: B64Url,
        login_method: LoginMethod,
    ) -> Result<LoginResponse, LoginError> {
        let request = StartLoginRequest {
            client_version: self.settings.client_version.clone(),
            username: session.username.clone(),
            encrypted_device_token: device_token.clone(),
            login_type,
            login_method,
            encrypted_login_token: Some(login_token),
            clone_code: None,
        };
        self.send_start_login(session, request).await
    }

    /// Execute a start/resume request, absorbing the recoverable
    /// rejections: a region redirect moves the attempt and re-registers the
    /// device there, and a not-registered-in-region verdict just registers
    /// and retries. Each recovery is attempted at most once per request so
    /// a misbehaving server cannot loop us.
    async fn send_start_login(
        &self,
        session: &mut LoginSession,
        request: StartLoginRequest,
    ) -> Result<LoginResponse, LoginError> {
        let mut redirected = false;
        let mut registered = false;
        loop {
            match round_trip::<_, LoginResponse>(
                self.transport.as_ref(),
                endpoint::START_LOGIN,
                &request,
            )
            .await?
            {
                Ok(response) => return Ok(response),
                Err(err) if err.code == "region_redirect" && !redirected => {
                    redirected = true;
                    let host = err
                        .region_host
                        .ok_or(MissingFieldError("region_host"))?;
                    info!("redirecting login to region {host}");
                    self.transport.set_region(&host);
                    session.server = Some(host);
                    self.register_device_in_region(&request.encrypted_device_token)
                        .await?;
                }
                Err(err)
                    if !registered
                        && Self::needs_regional_registration(
                            &err.code,
                            err.additional_info.as_deref(),
                        ) =>
                {
                    registered = true;
                    self.register_device_in_region(&request.encrypted_device_token)
                        .await?;
                }
                Err(err) if err.code == "device_not_registered" => {
                    return Err(LoginError::InvalidDeviceToken);
                }
                Err(mut err) => {
                    if err.code == "restricted_client_type" {
                        err.message.push_str(RESTRICTED_CLIENT_HINT);
                    } else if let Some(info) = err.additional_info.take() {
                        err.message.push_str(": ");
                        err.message.push_str(&info);
                    }
                    return Err(LoginError::Api(err));
                }
            }
        }
    }

    /// Derive and submit the password verifier until the authority accepts
    /// one. SSO-queued passwords are tried silently before the user is
    /// prompted; a failed interactive attempt warns and re-prompts, and an
    /// empty entry cancels the login.
    async fn validate_password(
        &self,
        session: &mut LoginSession,
        response: &LoginResponse,
    ) -> Result<LoginResponse, LoginError> {
        let login_token = require!(response.encrypted_login_token.clone());

        // No salt means the account has no password credential to verify
        // against; only account recovery can mint one.
        let salt = match pick_salt(&response.salt) {
            Some(salt) => salt,
            None => return Err(LoginError::RecoveryRequired),
        };
        session.salt = salt.salt.as_bytes().to_vec();
        session.iterations = salt.iterations;

        loop {
            let password = match session.password.clone() {
                Some(password) => password,
                None => {
                    let queued = match session.sso.as_mut() {
                        Some(sso) => sso.pop_password(),
                        None => None,
                    };
                    match queued {
                        Some(password) => password,
                        None => {
                            let entered = self
                                .ui
                                .prompt_secret(&format!("Enter password for {}", session.username))
                                .await;
                            if entered.is_empty() {
                                return Err(LoginError::Cancelled);
                            }
                            Zeroizing::new(entered)
                        }
                    }
                }
            };
            session.password = Some(password.clone());

            let verifier = derive_keyhash_v1(&password, &session.salt, session.iterations);
            let request = ValidateAuthHashRequest {
                password_method: PasswordMethod::Entered,
                auth_response: B64Url::from(verifier),
                encrypted_login_token: login_token.clone(),
            };
            match round_trip::<_, LoginResponse>(
                self.transport.as_ref(),
                endpoint::VALIDATE_AUTH_HASH,
                &request,
            )
            .await?
            {
                Ok(response) => return Ok(response),
                Err(err) if err.code == "auth_failed" => {
                    session.password = None;
                    // SSO-queued candidates fail silently; the queue may
                    // hold the right one next.
                    if session.sso.is_none() {
                        self.ui.message(
                            "Invalid email or password combination, please re-enter.",
                            Severity::Warning,
                        );
                    }
                }
                Err(err) => return Err(LoginError::Api(err)),
            }
        }
    }
}

/// Prefer the salt named "master", falling back to the first one offered.
pub(crate) fn pick_salt(salts: &[Salt]) -> Option<&Salt> {
    salts
        .iter()
        .find(|salt| {
            salt.name
                .as_deref()
                .is_some_and(|name| name.eq_ignore_ascii_case("master"))
        })
        .or_else(|| salts.first())
}
