//! Errors that can occur while driving the login protocol.

use serde::Deserialize;
use thiserror::Error;
use vaultic_crypto::CryptoError;

/// A structured rejection from the remote authority.
///
/// Some codes are recognized and drive recovery (`region_redirect`,
/// `device_not_registered`, `auth_failed`, `restricted_client_type`);
/// everything else propagates verbatim.
#[derive(Debug, Clone, Error, Deserialize)]
#[error("Server rejected the request: [{code}] {message}")]
pub struct ApiError {
    /// Machine-readable error code.
    #[serde(rename = "error")]
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Optional extra detail attached by the server.
    #[serde(default)]
    pub additional_info: Option<String>,
    /// Set on `region_redirect` errors: the host of the correct region.
    #[serde(default)]
    pub region_host: Option<String>,
}

/// Failure below the protocol layer: the request never produced a server
/// verdict.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

/// Missing required field.
#[derive(Debug, Error)]
#[error("The response received was missing a required field: {0}")]
pub struct MissingFieldError(pub &'static str);

/// Errors from the login flow.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum LoginError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    MissingField(#[from] MissingFieldError),

    #[error("This device is locked")]
    DeviceLocked,
    #[error("The device for this account is locked")]
    DeviceAccountLocked,
    #[error("User account `{0}` is locked")]
    AccountLocked(String),
    #[error("The account license has expired")]
    LicenseExpired,
    #[error("The application or device is out of date and requires an update")]
    UpgradeRequired,
    #[error("This account does not exist yet and needs to be created")]
    AccountNotProvisioned,
    #[error(
        "The account requires account recovery in order to use a master password login method"
    )]
    RecoveryRequired,
    #[error("The account has expired; renew it to log in")]
    AccountExpired,
    #[error("The master password change was not completed")]
    PasswordChangeFailed,
    #[error("The account transfer was declined")]
    AccountTransferDeclined,
    #[error("Log into the web vault to update your account settings")]
    RestrictedSession,
    #[error("The server reported an unknown login state [{0}]")]
    UnknownState(i32),
    #[error("Data key scheme {0} decryption is not implemented")]
    UnsupportedKeyScheme(i32),
    #[error("The persisted device token is invalid")]
    InvalidDeviceToken,
    #[error("No device key material is persisted for this account")]
    MissingDeviceKey,
    #[error("A password is required to decrypt the data key")]
    MissingPassword,
    #[error("The server's pinned public key has an unsupported type")]
    InvalidServerKey,
    #[error("The identity provider returned an unusable URL")]
    InvalidSsoUrl,
    #[error("The SSO token could not be parsed")]
    InvalidSsoToken,
    #[error("Unable to send the verification message")]
    ChannelSendFailed(#[source] ApiError),
    #[error("Verification code validation failed")]
    ChannelValidationFailed(#[source] TransportError),
    #[error("Login cancelled")]
    Cancelled,
}

/// Require that an optional response field is present or return a
/// [`MissingFieldError`] from the enclosing function.
#[macro_export]
macro_rules! require {
    ($val:expr) => {
        match $val {
            Some(val) => val,
            None => return Err($crate::MissingFieldError(stringify!($val)).into()),
        }
    };
}
