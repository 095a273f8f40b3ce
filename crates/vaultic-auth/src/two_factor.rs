//! Second-factor verification.
//!
//! The authority lists the configured channels; the user picks one, and the
//! chosen ceremony yields a fresh login token on success. Code-entry
//! channels share a single prompt loop that also understands the
//! `2fa_duration=` directive for adjusting how long the factor is trusted.

use log::warn;
use serde_json::json;
use vaultic_encoding::B64Url;

use crate::{
    api::{
        LoginResponse, TwoFactorChannelInfo, TwoFactorChannelType, TwoFactorDuration,
        TwoFactorPushType, TwoFactorSendPushRequest, TwoFactorValidateRequest,
        TwoFactorValidateResponse, TwoFactorValueType,
    },
    client::LoginClient,
    error::LoginError,
    interact::{HardwareAssertion, HardwareKeyError, Severity},
    require,
    store::config_keys,
    transport::{endpoint, round_trip, round_trip_unit},
};

const INVALID_SELECTION: &str = "Invalid entry, additional factors of authentication shown \
may be configured if not currently enabled.";

impl LoginClient {
    /// Run one round of the two-factor menu. Returns the fresh login token
    /// on success, `None` to show the menu again.
    pub(crate) async fn handle_two_factor(
        &self,
        response: &LoginResponse,
    ) -> Result<Option<B64Url>, LoginError> {
        let login_token = require!(response.encrypted_login_token.clone());

        let hide_hardware = self.hardware_keys.hardware_hidden();
        let channels: Vec<(&TwoFactorChannelInfo, TwoFactorChannelType)> = response
            .channels
            .iter()
            .filter_map(|info| {
                TwoFactorChannelType::from_raw(info.channel_type).map(|channel| (info, channel))
            })
            .filter(|(_, channel)| !(hide_hardware && channel.is_hardware()))
            .collect();

        let mut menu = String::from("This account requires 2FA Authentication\n");
        for (index, (info, channel)) in channels.iter().enumerate() {
            menu.push_str(&format!(
                "  {}. {}{}\n",
                index + 1,
                channel_description(*channel),
                channel_detail(info)
            ));
        }
        menu.push_str("  q. Quit");
        self.ui.message(&menu, Severity::Info);

        let selection = self.ui.prompt_line("Selection").await;
        let selection = selection.trim();
        if selection == "q" {
            return Err(LoginError::Cancelled);
        }
        let (info, channel) = match selection.parse::<usize>() {
            Ok(number) if (1..=channels.len()).contains(&number) => channels[number - 1],
            _ => {
                self.ui.message(INVALID_SELECTION, Severity::Warning);
                return Ok(None);
            }
        };

        match channel {
            TwoFactorChannelType::Sms => {
                let request = TwoFactorSendPushRequest {
                    encrypted_login_token: login_token.clone(),
                    push_type: Some(TwoFactorPushType::Sms),
                    channel_uid: info.channel_uid.clone(),
                    expire_in: Some(TwoFactorDuration::EveryLogin),
                };
                round_trip_unit(
                    self.transport.as_ref(),
                    endpoint::TWO_FA_SEND_PUSH,
                    &request,
                )
                .await?
                .map_err(LoginError::ChannelSendFailed)?;
                self.ui.message("Successfully sent SMS.", Severity::Info);
                self.two_factor_code_loop(&login_token, info).await
            }
            TwoFactorChannelType::U2f | TwoFactorChannelType::WebAuthn => {
                self.hardware_key_ceremony(&login_token, info, channel).await
            }
            TwoFactorChannelType::Totp
            | TwoFactorChannelType::Duo
            | TwoFactorChannelType::RsaSecurId
            | TwoFactorChannelType::Dna => self.two_factor_code_loop(&login_token, info).await,
        }
    }

    /// Prompt for codes until one validates or the user backs out.
    async fn two_factor_code_loop(
        &self,
        login_token: &B64Url,
        info: &TwoFactorChannelInfo,
    ) -> Result<Option<B64Url>, LoginError> {
        let mut duration = self.stored_duration();
        loop {
            self.ui.message(
                &format!(
                    "Two-factor authentication will be valid: {}\n\
                     Use \"2fa_duration=<login|12_hours|24_hours|30_days|forever>\" to change.",
                    duration_description(duration)
                ),
                Severity::Info,
            );
            let entry = self.ui.prompt_line("Enter 2FA Code or Duration").await;
            let entry = entry.trim().to_owned();
            if entry.is_empty() {
                return Ok(None);
            }

            if let Some(directive) = parse_duration_directive(&entry) {
                match directive {
                    Some(new_duration) => {
                        duration = new_duration;
                        self.persist_duration(duration);
                    }
                    None => self.ui.message("Invalid 2FA Duration.", Severity::Warning),
                }
                continue;
            }

            let request = TwoFactorValidateRequest {
                encrypted_login_token: login_token.clone(),
                value: entry.clone(),
                value_type: None,
                channel_uid: info.channel_uid.clone(),
                expire_in: duration,
            };
            match round_trip::<_, TwoFactorValidateResponse>(
                self.transport.as_ref(),
                endpoint::TWO_FA_VALIDATE,
                &request,
            )
            .await
            {
                Ok(Ok(validated)) => {
                    self.ui
                        .message("Successfully verified 2FA Code.", Severity::Info);
                    return Ok(Some(validated.encrypted_login_token));
                }
                Ok(Err(err)) => {
                    warn!("two-factor code rejected: {err}");
                    self.ui.message(
                        &format!(
                            "Unable to verify 2FA code '{entry}'. \
                             Regenerate the code and try again."
                        ),
                        Severity::Warning,
                    );
                    return Ok(None);
                }
                Err(LoginError::Transport(err)) => {
                    return Err(LoginError::ChannelValidationFailed(err));
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Drive the security key assertion and submit the signed envelope.
    async fn hardware_key_ceremony(
        &self,
        login_token: &B64Url,
        info: &TwoFactorChannelInfo,
        channel: TwoFactorChannelType,
    ) -> Result<Option<B64Url>, LoginError> {
        let challenge = require!(info.challenge.clone());

        let assertion = match self.hardware.authenticate(&challenge).await {
            Ok(assertion) => assertion,
            Err(HardwareKeyError::Unavailable) => {
                if self.hardware_keys.mark_unavailable() {
                    self.ui.message(
                        "No security key support is available on this system; \
                         hardware channels are hidden for the rest of this session.",
                        Severity::Warning,
                    );
                }
                return Ok(None);
            }
            Err(HardwareKeyError::Ceremony(detail)) => {
                self.ui.message(
                    &format!("Security key authentication failed: {detail}"),
                    Severity::Error,
                );
                return Ok(None);
            }
        };

        let (value, value_type) = if channel == TwoFactorChannelType::U2f {
            (u2f_envelope(&assertion), TwoFactorValueType::U2f)
        } else {
            (webauthn_envelope(&assertion), TwoFactorValueType::WebAuthn)
        };

        // A security key assertion is only ever trusted for this login.
        let request = TwoFactorValidateRequest {
            encrypted_login_token: login_token.clone(),
            value,
            value_type: Some(value_type),
            channel_uid: info.channel_uid.clone(),
            expire_in: TwoFactorDuration::EveryLogin,
        };
        match round_trip::<_, TwoFactorValidateResponse>(
            self.transport.as_ref(),
            endpoint::TWO_FA_VALIDATE,
            &request,
        )
        .await?
        {
            Ok(validated) => Ok(Some(validated.encrypted_login_token)),
            Err(err) => {
                warn!("security key assertion rejected: {err}");
                self.ui.message(
                    "The security key assertion was not accepted.",
                    Severity::Error,
                );
                Ok(None)
            }
        }
    }

    fn stored_duration(&self) -> TwoFactorDuration {
        self.store
            .get(config_keys::TWO_FACTOR_DURATION)
            .and_then(|value| parse_duration(&value))
            .unwrap_or(TwoFactorDuration::EveryLogin)
    }

    fn persist_duration(&self, duration: TwoFactorDuration) {
        self.store
            .set(config_keys::TWO_FACTOR_DURATION, duration_key(duration));
        self.store.persist();
    }
}

pub(crate) fn channel_description(channel: TwoFactorChannelType) -> &'static str {
    match channel {
        TwoFactorChannelType::Totp => "TOTP (Google and Microsoft Authenticator)",
        TwoFactorChannelType::Sms => "Send SMS Code",
        TwoFactorChannelType::Duo => "DUO",
        TwoFactorChannelType::RsaSecurId => "RSA SecurID",
        TwoFactorChannelType::U2f => "U2F (FIDO Security Key)",
        TwoFactorChannelType::WebAuthn => "WebAuthn (FIDO2 Security Key)",
        TwoFactorChannelType::Dna => "DNA (Smart Watch)",
    }
}

fn channel_detail(info: &TwoFactorChannelInfo) -> String {
    if let Some(phone) = info.phone_number.as_deref() {
        format!(" to {phone}")
    } else if let Some(name) = info.channel_name.as_deref() {
        format!(" ({name})")
    } else {
        String::new()
    }
}

/// Recognize the `2fa_duration=` directive. `None` when the entry is a
/// plain code, `Some(None)` when the directive names an unknown duration.
pub(crate) fn parse_duration_directive(entry: &str) -> Option<Option<TwoFactorDuration>> {
    let lowered = entry.to_ascii_lowercase();
    let rest = lowered.strip_prefix("2fa_duration")?.trim_start();
    let value = rest.strip_prefix('=')?.trim();
    Some(parse_duration(value))
}

pub(crate) fn parse_duration(value: &str) -> Option<TwoFactorDuration> {
    Some(match value {
        "login" | "every_login" => TwoFactorDuration::EveryLogin,
        "12_hours" => TwoFactorDuration::TwelveHours,
        "24_hours" => TwoFactorDuration::TwentyFourHours,
        "30_days" => TwoFactorDuration::ThirtyDays,
        "forever" => TwoFactorDuration::Forever,
        _ => return None,
    })
}

fn duration_key(duration: TwoFactorDuration) -> &'static str {
    match duration {
        TwoFactorDuration::EveryLogin => "login",
        TwoFactorDuration::TwelveHours => "12_hours",
        TwoFactorDuration::TwentyFourHours => "24_hours",
        TwoFactorDuration::ThirtyDays => "30_days",
        TwoFactorDuration::Forever => "forever",
    }
}

fn duration_description(duration: TwoFactorDuration) -> &'static str {
    match duration {
        TwoFactorDuration::EveryLogin => "every login",
        TwoFactorDuration::TwelveHours => "for 12 hours",
        TwoFactorDuration::TwentyFourHours => "for 24 hours",
        TwoFactorDuration::ThirtyDays => "for 30 days",
        TwoFactorDuration::Forever => "forever on this device",
    }
}

fn u2f_envelope(assertion: &HardwareAssertion) -> String {
    json!({
        "signatureData": B64Url::from(assertion.signature.as_slice()).to_string(),
        "clientData": B64Url::from(assertion.client_data_json.as_bytes()).to_string(),
        "keyHandle": B64Url::from(assertion.credential_id.as_slice()).to_string(),
    })
    .to_string()
}

fn webauthn_envelope(assertion: &HardwareAssertion) -> String {
    let id = B64Url::from(assertion.credential_id.as_slice()).to_string();
    json!({
        "id": id,
        "rawId": id,
        "response": {
            "authenticatorData": B64Url::from(assertion.authenticator_data.as_slice()).to_string(),
            "clientDataJSON": B64Url::from(assertion.client_data_json.as_bytes()).to_string(),
            "signature": B64Url::from(assertion.signature.as_slice()).to_string(),
        },
        "type": "public-key",
        "clientExtensionResults": assertion.extension_results.clone().unwrap_or_else(|| json!({})),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::{
        api::LoginResponse,
        client::ClientSettings,
        interact::HardwareAuthenticator,
        store::{CredentialStore, MemoryCredentialStore},
        testing::{NoHardwareKeys, ScriptedTransport, ScriptedUi, StaticSummaryProvider},
    };

    fn client(
        transport: Arc<ScriptedTransport>,
        ui: Arc<ScriptedUi>,
        store: Arc<MemoryCredentialStore>,
        hardware: Arc<dyn HardwareAuthenticator>,
    ) -> LoginClient {
        LoginClient::new(
            transport,
            store,
            ui,
            hardware,
            Arc::new(StaticSummaryProvider::default()),
            ClientSettings::new("test/1.0.0"),
        )
    }

    fn two_factor_response(channel_type: i32, challenge: Option<&str>) -> LoginResponse {
        LoginResponse {
            login_state: 12,
            encrypted_login_token: Some(B64Url::from(b"login-token".as_slice())),
            channels: vec![TwoFactorChannelInfo {
                channel_type,
                channel_uid: Some(B64Url::from(b"channel".as_slice())),
                channel_name: None,
                phone_number: None,
                challenge: challenge.map(str::to_owned),
            }],
            ..LoginResponse::default()
        }
    }

    struct StaticSecurityKey;

    #[async_trait]
    impl HardwareAuthenticator for StaticSecurityKey {
        async fn authenticate(
            &self,
            _challenge: &str,
        ) -> Result<HardwareAssertion, HardwareKeyError> {
            Ok(HardwareAssertion {
                credential_id: vec![1, 2, 3],
                authenticator_data: vec![4, 5],
                client_data_json: "{\"type\":\"webauthn.get\"}".into(),
                signature: vec![6, 7],
                extension_results: None,
            })
        }
    }

    #[tokio::test]
    async fn test_out_of_range_selection_reports_invalid_entry() {
        let transport = Arc::new(ScriptedTransport::new());
        let ui = Arc::new(ScriptedUi::new());
        let client = client(
            transport.clone(),
            ui.clone(),
            Arc::new(MemoryCredentialStore::new()),
            Arc::new(NoHardwareKeys),
        );
        // One channel, so "0" and "7" are both out of range.
        let response = two_factor_response(TwoFactorChannelType::Totp as i32, None);

        for selection in ["0", "7", "abc"] {
            ui.push_line(selection);
            let token = client.handle_two_factor(&response).await.unwrap();
            assert!(token.is_none());
        }
        assert_eq!(
            ui.messages()
                .iter()
                .filter(|m| m.as_str() == INVALID_SELECTION)
                .count(),
            3
        );
        assert!(transport.calls().is_empty());
    }

    #[test]
    fn test_unpersisted_duration_defaults_to_every_login() {
        let client = client(
            Arc::new(ScriptedTransport::new()),
            Arc::new(ScriptedUi::new()),
            Arc::new(MemoryCredentialStore::new()),
            Arc::new(NoHardwareKeys),
        );
        assert_eq!(client.stored_duration(), TwoFactorDuration::EveryLogin);

        client.store.set(config_keys::TWO_FACTOR_DURATION, "forever");
        assert_eq!(client.stored_duration(), TwoFactorDuration::Forever);
    }

    #[tokio::test]
    async fn test_security_key_trust_ignores_stored_duration() {
        let transport = Arc::new(ScriptedTransport::new());
        let ui = Arc::new(ScriptedUi::new());
        let store = Arc::new(MemoryCredentialStore::new());
        store.set(config_keys::TWO_FACTOR_DURATION, "30_days");
        transport.expect_payload(
            endpoint::TWO_FA_VALIDATE,
            &json!({
                "encryptedLoginToken": B64Url::from(b"fresh-token".as_slice()).to_string(),
            }),
        );
        let client = client(transport.clone(), ui.clone(), store, Arc::new(StaticSecurityKey));
        ui.push_line("1");

        let token = client
            .handle_two_factor(&two_factor_response(
                TwoFactorChannelType::WebAuthn as i32,
                Some("challenge"),
            ))
            .await
            .unwrap();
        assert_eq!(token, Some(B64Url::from(b"fresh-token".as_slice())));

        let request = transport.request_json(0);
        assert_eq!(request["expireIn"], 0);
        assert_eq!(request["valueType"], TwoFactorValueType::WebAuthn as i32);
    }

    #[test]
    fn test_duration_directive_parsing() {
        assert_eq!(
            parse_duration_directive("2fa_duration=forever"),
            Some(Some(TwoFactorDuration::Forever))
        );
        assert_eq!(
            parse_duration_directive("2FA_Duration = 12_hours"),
            Some(Some(TwoFactorDuration::TwelveHours))
        );
        assert_eq!(parse_duration_directive("2fa_duration=weekly"), Some(None));
        assert_eq!(parse_duration_directive("123456"), None);
    }

    #[test]
    fn test_duration_key_round_trip() {
        for duration in [
            TwoFactorDuration::EveryLogin,
            TwoFactorDuration::TwelveHours,
            TwoFactorDuration::TwentyFourHours,
            TwoFactorDuration::ThirtyDays,
            TwoFactorDuration::Forever,
        ] {
            assert_eq!(parse_duration(duration_key(duration)), Some(duration));
        }
    }

    #[test]
    fn test_webauthn_envelope_shape() {
        let assertion = HardwareAssertion {
            credential_id: vec![1, 2, 3],
            authenticator_data: vec![4, 5],
            client_data_json: "{\"type\":\"webauthn.get\"}".into(),
            signature: vec![6, 7],
            extension_results: None,
        };
        let envelope: serde_json::Value =
            serde_json::from_str(&webauthn_envelope(&assertion)).unwrap();
        assert_eq!(envelope["type"], "public-key");
        assert_eq!(envelope["id"], envelope["rawId"]);
        assert!(envelope["response"]["signature"].is_string());
    }
}
