use serde::{Deserialize, Serialize};
use vaultic_encoding::B64Url;

use super::{
    LoginMethod, LoginType, PasswordMethod, TwoFactorDuration, TwoFactorPushType,
    TwoFactorValueType,
};

/// Starts or resumes a login attempt.
///
/// Clone-code fast login and login-token resumption are mutually exclusive
/// ways to enter the flow; a request never carries both, and a clone-code
/// request carries an empty username.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StartLoginRequest {
    #[allow(missing_docs)]
    pub client_version: String,
    #[allow(missing_docs)]
    pub username: String,
    #[allow(missing_docs)]
    pub encrypted_device_token: B64Url,
    #[allow(missing_docs)]
    pub login_type: LoginType,
    #[allow(missing_docs)]
    pub login_method: LoginMethod,
    #[allow(missing_docs)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_login_token: Option<B64Url>,
    #[allow(missing_docs)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clone_code: Option<B64Url>,
}

/// Registers a brand-new device with the authority.
#[allow(missing_docs)]
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRegistrationRequest {
    pub client_version: String,
    pub device_name: String,
    pub device_public_key: B64Url,
}

/// Re-registers an existing device token in another region.
#[allow(missing_docs)]
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDeviceInRegionRequest {
    pub client_version: String,
    pub device_name: String,
    pub encrypted_device_token: B64Url,
    pub device_public_key: B64Url,
}

/// Requests device verification (email channel) or admin approval.
#[allow(missing_docs)]
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DeviceVerificationRequest {
    pub username: String,
    pub client_version: String,
    pub encrypted_device_token: B64Url,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_channel: Option<String>,
}

/// Validates an emailed device verification code.
#[allow(missing_docs)]
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ValidateDeviceVerificationCodeRequest {
    pub username: String,
    pub client_version: String,
    pub verification_code: String,
}

/// Asks the server to deliver a push/SMS second factor.
#[allow(missing_docs)]
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TwoFactorSendPushRequest {
    pub encrypted_login_token: B64Url,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_type: Option<TwoFactorPushType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_uid: Option<B64Url>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_in: Option<TwoFactorDuration>,
}

/// Submits a second-factor value for validation.
#[allow(missing_docs)]
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TwoFactorValidateRequest {
    pub encrypted_login_token: B64Url,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_type: Option<TwoFactorValueType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_uid: Option<B64Url>,
    pub expire_in: TwoFactorDuration,
}

/// Submits the derived password verifier.
#[allow(missing_docs)]
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ValidateAuthHashRequest {
    pub password_method: PasswordMethod,
    pub auth_response: B64Url,
    pub encrypted_login_token: B64Url,
}

/// Stores the data key encrypted to this device's public key.
#[allow(missing_docs)]
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDeviceDataKeyRequest {
    pub encrypted_device_token: B64Url,
    pub encrypted_device_data_key: B64Url,
}

/// Renames this device.
#[allow(missing_docs)]
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DeviceUpdateRequest {
    pub client_version: String,
    pub device_name: String,
    pub encrypted_device_token: B64Url,
}

/// Updates a single account setting.
#[allow(missing_docs)]
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserSettingRequest {
    pub setting: String,
    pub value: String,
}

/// Fetches the password complexity rules for the user's domain.
#[allow(missing_docs)]
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DomainPasswordRulesRequest {
    pub username: String,
}

/// Rotates the master password: a new verifier plus a re-wrapped data key.
#[allow(missing_docs)]
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ChangeMasterPasswordRequest {
    pub auth_verifier: B64Url,
    pub encryption_params: B64Url,
}

/// Fetches the account summary.
#[allow(missing_docs)]
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummaryRequest {
    pub summary_version: i32,
}

/// Fetches the enterprise public keys (license type 2 accounts).
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct EnterprisePublicKeyRequest {}

/// The inner payload of a cloud SSO redirect.
#[allow(missing_docs)]
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SsoCloudRequest {
    pub client_version: String,
    pub dest: String,
    pub username: String,
    pub force_login: bool,
    pub detached: bool,
}

/// The outer envelope carried in the cloud SSO redirect URL: the payload is
/// sealed under a one-time transmission key, which is itself encrypted to
/// the authority's pinned public key.
#[allow(missing_docs)]
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SsoRequestEnvelope {
    pub locale: String,
    pub public_key_id: i32,
    pub encrypted_transmission_key: B64Url,
    pub encrypted_payload: B64Url,
}
