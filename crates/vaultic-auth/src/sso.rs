//! SSO redirect handling.
//!
//! Cloud SSO seals the request payload under a one-time transmission key
//! encrypted to the authority's pinned public key, and the provider returns
//! a blob sealed under that same transmission key. On-site SSO instead
//! carries an ephemeral RSA public key out and gets RSA-encrypted passwords
//! back. Either way the user completes the ceremony in a browser and pastes
//! the resulting token here.

use std::str::FromStr;

use log::warn;
use url::Url;
use vaultic_crypto::{
    decrypt_aes_v2, encrypt_aes_v2, generate_aes_key, generate_rsa_keypair, RsaPrivateKey,
};
use vaultic_encoding::B64Url;
use zeroize::Zeroizing;

use crate::{
    api::{SsoCloudRequest, SsoCloudResponse, SsoRequestEnvelope},
    client::{ClientSettings, LoginClient, ServerPublicKey},
    error::{LoginError, TransportError},
    interact::Severity,
    require,
    session::{LoginSession, SsoSession},
};

/// Anything shorter than this cannot be a token; treat it as a mistyped
/// menu option rather than sending garbage to the server.
const SSO_TOKEN_MIN_LEN: usize = 10;

/// Destination marker the identity provider uses to route the completed
/// ceremony back to a command-line client.
const SSO_DEST: &str = "commander";

enum SsoMode {
    Cloud { transmission_key: Zeroizing<[u8; 32]> },
    Onsite { ephemeral_key: RsaPrivateKey },
}

impl LoginClient {
    /// Walk the user through an SSO detour. Returns the login token to
    /// resume with, or `None` when the user elects master-password login.
    pub(crate) async fn handle_sso_redirect(
        &self,
        session: &mut LoginSession,
        is_cloud: bool,
        sso_url: &str,
        login_token: Option<B64Url>,
    ) -> Result<Option<B64Url>, LoginError> {
        let (url, mode) = if is_cloud {
            let (url, transmission_key) =
                build_cloud_redirect(&self.settings, &session.username, sso_url)?;
            (url, SsoMode::Cloud { transmission_key })
        } else {
            let keypair = generate_rsa_keypair();
            let mut url = Url::parse(sso_url).map_err(|_| LoginError::InvalidSsoUrl)?;
            url.query_pairs_mut()
                .append_pair(
                    "key",
                    &B64Url::from(keypair.public.to_pkcs1_der()?).to_string(),
                )
                .append_pair("dest", SSO_DEST)
                .append_pair("embedded", "");
            (
                url,
                SsoMode::Onsite {
                    ephemeral_key: keypair.private,
                },
            )
        };

        let menu = format!(
            "SSO Login URL:\n{url}\n\n\
             Complete the sign-in in your browser, then return here.\n  \
             a. Authenticate with a master password instead\n  \
             c. Copy the login URL to the clipboard\n  \
             o. Open the login URL in a browser\n  \
             p. Paste the returned SSO token\n  \
             q. Quit\n\
             An SSO token may also be pasted directly at the prompt."
        );

        loop {
            self.ui.message(&menu, Severity::Info);
            let entry = self.ui.prompt_line("Selection").await;
            let entry = entry.trim();

            let token_text = match entry {
                "q" => return Err(LoginError::Cancelled),
                "a" => return Ok(None),
                "c" => {
                    if self.ui.copy_to_clipboard(url.as_str()) {
                        self.ui
                            .message("Login URL copied to clipboard.", Severity::Info);
                    } else {
                        self.ui
                            .message("Clipboard is not available.", Severity::Warning);
                    }
                    continue;
                }
                "o" => {
                    if !self.ui.open_url(url.as_str()) {
                        self.ui
                            .message("Unable to open a browser.", Severity::Warning);
                    }
                    continue;
                }
                "p" => {
                    let pasted = self.ui.prompt_line("SSO token").await;
                    pasted.trim().to_owned()
                }
                other if other.len() >= SSO_TOKEN_MIN_LEN => other.to_owned(),
                _ => {
                    self.ui
                        .message("Unsupported menu option.", Severity::Warning);
                    continue;
                }
            };
            if token_text.is_empty() {
                continue;
            }

            let applied = match &mode {
                SsoMode::Cloud { transmission_key } => {
                    apply_cloud_token(session, transmission_key, &token_text, sso_url)
                }
                SsoMode::Onsite { ephemeral_key } => {
                    let fallback = require!(login_token.clone());
                    apply_onsite_token(session, ephemeral_key, &token_text, sso_url, &fallback)
                }
            };
            match applied {
                Ok(token) => return Ok(Some(token)),
                Err(err) => {
                    warn!("discarding unusable SSO token: {err}");
                    self.ui.message(
                        "The SSO token could not be processed; complete the \
                         sign-in and paste the token again.",
                        Severity::Warning,
                    );
                }
            }
        }
    }
}

/// Build the cloud redirect URL, returning the transmission key that will
/// unseal the provider's answer.
pub(crate) fn build_cloud_redirect(
    settings: &ClientSettings,
    username: &str,
    sso_url: &str,
) -> Result<(Url, Zeroizing<[u8; 32]>), LoginError> {
    let transmission_key = generate_aes_key();

    let payload = SsoCloudRequest {
        client_version: settings.client_version.clone(),
        dest: SSO_DEST.to_owned(),
        username: username.to_lowercase(),
        force_login: false,
        detached: true,
    };
    let payload_bytes = serde_json::to_vec(&payload).map_err(TransportError::Serde)?;
    let encrypted_payload = encrypt_aes_v2(&payload_bytes, &transmission_key);

    let encrypted_transmission_key = match settings.server_public_keys.get(&settings.server_key_id)
    {
        Some(ServerPublicKey::Rsa(key)) => key.encrypt(transmission_key.as_ref())?,
        Some(ServerPublicKey::Ec(key)) => key.encrypt(transmission_key.as_ref()),
        None => return Err(LoginError::InvalidServerKey),
    };

    let envelope = SsoRequestEnvelope {
        locale: settings.locale.clone(),
        public_key_id: settings.server_key_id,
        encrypted_transmission_key: B64Url::from(encrypted_transmission_key),
        encrypted_payload: B64Url::from(encrypted_payload),
    };
    let envelope_bytes = serde_json::to_vec(&envelope).map_err(TransportError::Serde)?;

    let mut url = Url::parse(sso_url).map_err(|_| LoginError::InvalidSsoUrl)?;
    url.query_pairs_mut()
        .append_pair("payload", &B64Url::from(envelope_bytes).to_string());
    Ok((url, transmission_key))
}

/// Unseal a cloud SSO token and absorb it into the session.
fn apply_cloud_token(
    session: &mut LoginSession,
    transmission_key: &[u8; 32],
    token_text: &str,
    sso_url: &str,
) -> Result<B64Url, LoginError> {
    let blob = B64Url::from_str(token_text).map_err(|_| LoginError::InvalidSsoToken)?;
    let decrypted = decrypt_aes_v2(blob.as_bytes(), transmission_key)?;
    let response: SsoCloudResponse =
        serde_json::from_slice(&decrypted).map_err(|_| LoginError::InvalidSsoToken)?;

    session.username = response.email.to_lowercase();
    let mut sso = SsoSession::new(true, sso_url.to_owned());
    sso.provider_name = response.provider_name;
    sso.idp_session_id = response.idp_session_id;
    session.sso = Some(sso);

    Ok(response.encrypted_login_token)
}

/// Parse an on-site SSO token, decrypting any returned passwords with the
/// ephemeral key and queueing them in the order the provider sent them.
pub(crate) fn apply_onsite_token(
    session: &mut LoginSession,
    ephemeral_key: &RsaPrivateKey,
    token_text: &str,
    sso_url: &str,
    fallback_token: &B64Url,
) -> Result<B64Url, LoginError> {
    // Providers hand the token back either as raw JSON or base64url of it.
    let value: serde_json::Value = match serde_json::from_str(token_text) {
        Ok(value) => value,
        Err(_) => {
            let decoded =
                B64Url::from_str(token_text).map_err(|_| LoginError::InvalidSsoToken)?;
            serde_json::from_slice(decoded.as_bytes()).map_err(|_| LoginError::InvalidSsoToken)?
        }
    };

    let email = value
        .get("email")
        .and_then(|v| v.as_str())
        .ok_or(LoginError::InvalidSsoToken)?;
    session.username = email.to_lowercase();

    let mut sso = SsoSession::new(false, sso_url.to_owned());
    if let Some(provider) = value.get("provider_name").and_then(|v| v.as_str()) {
        sso.provider_name = Some(provider.to_owned());
    }
    if let Some(session_id) = value.get("session_id").and_then(|v| v.as_str()) {
        sso.idp_session_id = Some(session_id.to_owned());
    }
    for field in ["password", "new_password"] {
        if let Some(encoded) = value.get(field).and_then(|v| v.as_str()) {
            let blob = B64Url::from_str(encoded).map_err(|_| LoginError::InvalidSsoToken)?;
            let decrypted = ephemeral_key.decrypt(blob.as_bytes())?;
            let password =
                String::from_utf8(decrypted).map_err(|_| LoginError::InvalidSsoToken)?;
            sso.push_password(Zeroizing::new(password));
        }
    }
    session.sso = Some(sso);

    match value.get("login_token").and_then(|v| v.as_str()) {
        Some(token) => B64Url::from_str(token).map_err(|_| LoginError::InvalidSsoToken),
        None => Ok(fallback_token.clone()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_cloud_redirect_payload_unseals() {
        let mut settings = ClientSettings::new("c1.0.0");
        let server_keys = vaultic_crypto::generate_ec_keypair();
        settings.server_key_id = 7;
        settings
            .server_public_keys
            .insert(7, ServerPublicKey::Ec(server_keys.public));

        let (url, transmission_key) =
            build_cloud_redirect(&settings, "User@Example.com", "https://sso.example.com/login")
                .unwrap();

        let payload_param = url
            .query_pairs()
            .find(|(name, _)| name == "payload")
            .map(|(_, value)| value.into_owned())
            .unwrap();
        let envelope: SsoRequestEnvelope =
            serde_json::from_slice(B64Url::from_str(&payload_param).unwrap().as_bytes()).unwrap();
        assert_eq!(envelope.public_key_id, 7);

        let recovered_key = server_keys
            .private
            .decrypt(envelope.encrypted_transmission_key.as_bytes())
            .unwrap();
        assert_eq!(recovered_key.as_slice(), transmission_key.as_ref());

        let payload_bytes =
            decrypt_aes_v2(envelope.encrypted_payload.as_bytes(), &transmission_key).unwrap();
        let payload: SsoCloudRequest = serde_json::from_slice(&payload_bytes).unwrap();
        assert_eq!(payload.username, "user@example.com");
        assert!(payload.detached);
    }

    #[test]
    fn test_cloud_redirect_without_pinned_key_fails() {
        let settings = ClientSettings::new("c1.0.0");
        assert!(matches!(
            build_cloud_redirect(&settings, "user@example.com", "https://sso.example.com/login"),
            Err(LoginError::InvalidServerKey)
        ));
    }

    #[test]
    fn test_onsite_token_queues_passwords_in_order() {
        let keypair = generate_rsa_keypair();
        let encrypt = |text: &str| {
            B64Url::from(keypair.public.encrypt(text.as_bytes()).unwrap()).to_string()
        };
        let token = json!({
            "email": "SSO.User@Example.com",
            "password": encrypt("old-password"),
            "new_password": encrypt("new-password"),
            "provider_name": "Example IdP",
        })
        .to_string();

        let mut session = LoginSession::new("someone@example.com");
        let fallback = B64Url::from(b"fallback-token".as_slice());
        let resumed =
            apply_onsite_token(&mut session, &keypair.private, &token, "https://idp", &fallback)
                .unwrap();

        assert_eq!(resumed, fallback);
        assert_eq!(session.username, "sso.user@example.com");
        let sso = session.sso.as_mut().unwrap();
        assert!(!sso.is_cloud);
        assert_eq!(sso.provider_name.as_deref(), Some("Example IdP"));
        assert_eq!(sso.pop_password().unwrap().as_str(), "old-password");
        assert_eq!(sso.pop_password().unwrap().as_str(), "new-password");
    }

    #[test]
    fn test_onsite_token_rejects_non_json() {
        let keypair = generate_rsa_keypair();
        let mut session = LoginSession::new("someone@example.com");
        let fallback = B64Url::from(b"t".as_slice());
        assert!(matches!(
            apply_onsite_token(&mut session, &keypair.private, "???", "https://idp", &fallback),
            Err(LoginError::InvalidSsoToken)
        ));
    }
}
