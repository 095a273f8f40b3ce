use serde::{Deserialize, Serialize};
use vaultic_encoding::B64Url;

/// The authority's answer to a start/resume request. Which fields are
/// populated depends entirely on `login_state`.
#[allow(missing_docs)]
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub login_state: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_login_token: Option<B64Url>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_data_key: Option<B64Url>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_data_key_type: Option<i32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub salt: Vec<Salt>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub channels: Vec<TwoFactorChannelInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_specific_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_session_token: Option<B64Url>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_token_type: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clone_code: Option<B64Url>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_uid: Option<B64Url>,
}

/// One named KDF salt from the authority.
#[allow(missing_docs)]
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Salt {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub salt: B64Url,
    pub iterations: u32,
}

/// One configured two-factor channel. `channel_type` stays raw so unknown
/// channels deserialize cleanly and get filtered instead of failing.
#[allow(missing_docs)]
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TwoFactorChannelInfo {
    pub channel_type: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_uid: Option<B64Url>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge: Option<String>,
}

/// Result of device registration.
#[allow(missing_docs)]
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub encrypted_device_token: B64Url,
}

/// Result of a successful two-factor validation.
#[allow(missing_docs)]
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TwoFactorValidateResponse {
    pub encrypted_login_token: B64Url,
}

/// Result of an admin approval poll.
#[allow(missing_docs)]
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DeviceVerificationResponse {
    pub device_status: i32,
}

/// Password complexity rules enforced for the user's domain. The regex and
/// description lists are parallel.
#[allow(missing_docs)]
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewUserMinimumParams {
    #[serde(default)]
    pub password_match_regex: Vec<String>,
    #[serde(default)]
    pub password_match_description: Vec<String>,
}

/// Decrypted payload returned from a completed cloud SSO ceremony.
#[allow(missing_docs)]
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SsoCloudResponse {
    pub email: String,
    pub encrypted_login_token: B64Url,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idp_session_id: Option<String>,
}

/// Enterprise public keys for admin-directed sharing.
#[allow(missing_docs)]
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct EnterprisePublicKeyResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enterprise_ecc_public_key: Option<B64Url>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enterprise_public_key: Option<B64Url>,
}

/// Account summary fetched after authentication.
#[allow(missing_docs)]
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_key: Option<B64Url>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys_info: Option<KeysInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enforcements: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    #[serde(default)]
    pub is_enterprise_admin: bool,
}

/// The user's wrapped asymmetric key material from the summary.
#[allow(missing_docs)]
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct KeysInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_private_key: Option<B64Url>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_ecc_private_key: Option<B64Url>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_response_minimal_fields() {
        let response: LoginResponse =
            serde_json::from_str(r#"{"loginState": 13}"#).unwrap();
        assert_eq!(response.login_state, 13);
        assert!(response.salt.is_empty());
        assert!(response.encrypted_login_token.is_none());
    }

    #[test]
    fn test_unknown_channel_type_deserializes() {
        let info: TwoFactorChannelInfo =
            serde_json::from_str(r#"{"channelType": 77, "channelName": "future"}"#).unwrap();
        assert_eq!(info.channel_type, 77);
    }
}
