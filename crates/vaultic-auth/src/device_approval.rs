//! Interactive device approval.
//!
//! Two distinct ceremonies land here: proving a new device to the authority
//! (email code, vault push, or an existing second factor) and getting the
//! data key onto an SSO device (push to an approved device, or admin
//! approval).

use log::warn;
use vaultic_encoding::B64Url;

use crate::{
    api::{
        DeviceStatus, DeviceVerificationRequest, DeviceVerificationResponse, TwoFactorDuration,
        TwoFactorPushType, TwoFactorSendPushRequest, TwoFactorValidateRequest,
        TwoFactorValidateResponse, ValidateDeviceVerificationCodeRequest,
    },
    client::LoginClient,
    error::LoginError,
    interact::Severity,
    session::LoginSession,
    transport::{endpoint, round_trip, round_trip_unit},
};

const DEVICE_APPROVAL_MENU: &str = "\
Device Approval Required

Approve this device with one of the following:
  \"email_send\" to send an approval email
  \"email_code=<code>\" to validate the code from the approval email
  \"vault_push\" to send an approval notification to your vault devices
  \"2fa_send\" to send a code over your two-factor channel
  \"2fa_code=<code>\" to validate a two-factor code
  <Enter> to resume once the device has been approved";

const DATA_KEY_APPROVAL_MENU: &str = "\
Approve this device to receive the encrypted data key:
  1. Send an approval notification to your vault devices
  2. Request approval from your administrator
  r. Resume login after approving elsewhere
  q. Quit";

impl LoginClient {
    /// Run one round of the device approval menu. Returns `true` when the
    /// login attempt should resume, `false` to show the menu again.
    pub(crate) async fn verify_device(
        &self,
        session: &LoginSession,
        device_token: &B64Url,
        login_token: &B64Url,
    ) -> Result<bool, LoginError> {
        self.ui.message(DEVICE_APPROVAL_MENU, Severity::Info);
        let action = self.ui.prompt_line("Selection").await;
        let action = action.trim();

        if action.is_empty() {
            return Ok(true);
        }

        if action == "email_send" || action == "es" {
            let request = DeviceVerificationRequest {
                username: session.username.clone(),
                client_version: self.settings.client_version.clone(),
                encrypted_device_token: device_token.clone(),
                verification_channel: Some("email".to_owned()),
            };
            round_trip_unit(
                self.transport.as_ref(),
                endpoint::REQUEST_DEVICE_VERIFICATION,
                &request,
            )
            .await?
            .map_err(LoginError::ChannelSendFailed)?;
            self.ui.message(
                "An email with a verification code was sent to your address.",
                Severity::Info,
            );
            return Ok(false);
        }

        if let Some(code) = action.strip_prefix("email_code=") {
            let request = ValidateDeviceVerificationCodeRequest {
                username: session.username.clone(),
                client_version: self.settings.client_version.clone(),
                verification_code: code.trim().to_owned(),
            };
            return match round_trip_unit(
                self.transport.as_ref(),
                endpoint::VALIDATE_DEVICE_VERIFICATION_CODE,
                &request,
            )
            .await?
            {
                Ok(()) => {
                    self.ui
                        .message("Device was approved.", Severity::Info);
                    Ok(true)
                }
                Err(err) => {
                    warn!("device verification code rejected: {err}");
                    self.ui
                        .message("Verification code was not accepted.", Severity::Warning);
                    Ok(false)
                }
            };
        }

        if action == "vault_push" || action == "vp" {
            self.send_approval_push(login_token, Some(TwoFactorPushType::VaultPush))
                .await?;
            self.ui.message(
                "An approval notification was sent to your vault devices.",
                Severity::Info,
            );
            return Ok(false);
        }

        if action == "2fa_send" || action == "2fs" {
            self.send_approval_push(login_token, None).await?;
            self.ui.message(
                "A code was sent over your two-factor channel.",
                Severity::Info,
            );
            return Ok(false);
        }

        if let Some(code) = action.strip_prefix("2fa_code=") {
            let request = TwoFactorValidateRequest {
                encrypted_login_token: login_token.clone(),
                value: code.trim().to_owned(),
                value_type: None,
                channel_uid: None,
                expire_in: TwoFactorDuration::EveryLogin,
            };
            return match round_trip::<_, TwoFactorValidateResponse>(
                self.transport.as_ref(),
                endpoint::TWO_FA_VALIDATE,
                &request,
            )
            .await?
            {
                Ok(_) => {
                    self.ui
                        .message("Device was approved.", Severity::Info);
                    Ok(true)
                }
                Err(err) => {
                    warn!("two-factor code rejected during device approval: {err}");
                    self.ui
                        .message("Two-factor code was not accepted.", Severity::Warning);
                    Ok(false)
                }
            };
        }

        self.ui
            .message("Action not supported.", Severity::Warning);
        Ok(false)
    }

    /// Run the data-key approval menu until the user resumes or quits.
    pub(crate) async fn approve_device_for_data_key(
        &self,
        session: &LoginSession,
        device_token: &B64Url,
        login_token: &B64Url,
    ) -> Result<(), LoginError> {
        loop {
            self.ui.message(DATA_KEY_APPROVAL_MENU, Severity::Info);
            let action = self.ui.prompt_line("Selection").await;
            match action.trim() {
                "q" => return Err(LoginError::Cancelled),
                "r" | "" => return Ok(()),
                "1" => {
                    match self
                        .send_approval_push(login_token, Some(TwoFactorPushType::VaultPush))
                        .await
                    {
                        Ok(()) => self.ui.message(
                            "An approval notification was sent to your vault devices.",
                            Severity::Info,
                        ),
                        Err(err) => {
                            warn!("data key approval push failed: {err}");
                            self.ui
                                .message("Unable to send the notification.", Severity::Warning);
                        }
                    }
                }
                "2" => {
                    let request = DeviceVerificationRequest {
                        username: session.username.clone(),
                        client_version: self.settings.client_version.clone(),
                        encrypted_device_token: device_token.clone(),
                        verification_channel: None,
                    };
                    match round_trip::<_, DeviceVerificationResponse>(
                        self.transport.as_ref(),
                        endpoint::REQUEST_DEVICE_ADMIN_APPROVAL,
                        &request,
                    )
                    .await?
                    {
                        Ok(response) if response.device_status == DeviceStatus::Ok as i32 => {
                            self.ui
                                .message("Device was approved.", Severity::Info);
                            return Ok(());
                        }
                        Ok(_) => self.ui.message(
                            "Administrator approval was requested. Resume login once approved.",
                            Severity::Info,
                        ),
                        Err(err) => {
                            warn!("admin approval request failed: {err}");
                            self.ui.message(
                                "Unable to request administrator approval.",
                                Severity::Warning,
                            );
                        }
                    }
                }
                _ => self
                    .ui
                    .message("Action not supported.", Severity::Warning),
            }
        }
    }

    async fn send_approval_push(
        &self,
        login_token: &B64Url,
        push_type: Option<TwoFactorPushType>,
    ) -> Result<(), LoginError> {
        let request = TwoFactorSendPushRequest {
            encrypted_login_token: login_token.clone(),
            push_type,
            channel_uid: None,
            expire_in: None,
        };
        round_trip_unit(self.transport.as_ref(), endpoint::TWO_FA_SEND_PUSH, &request)
            .await?
            .map_err(LoginError::ChannelSendFailed)
    }
}
