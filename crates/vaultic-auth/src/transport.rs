//! The wire boundary.
//!
//! Request signing, message framing and region-aware routing live behind
//! [`Transport`]; this crate only decides *which* operation to call and how
//! to interpret the verdict. A call either yields the operation's payload or
//! a structured [`ApiError`]; transport failures never carry a verdict.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::{ApiError, LoginError, TransportError};

/// Remote operation names used by the login flow.
pub mod endpoint {
    #![allow(missing_docs)]

    pub const REGISTER_DEVICE: &str = "authentication/register_device";
    pub const REGISTER_DEVICE_IN_REGION: &str = "authentication/register_device_in_region";
    pub const START_LOGIN: &str = "authentication/start_login";
    pub const VALIDATE_AUTH_HASH: &str = "authentication/validate_auth_hash";
    pub const TWO_FA_SEND_PUSH: &str = "authentication/2fa_send_push";
    pub const TWO_FA_VALIDATE: &str = "authentication/2fa_validate";
    pub const REQUEST_DEVICE_VERIFICATION: &str = "authentication/request_device_verification";
    pub const VALIDATE_DEVICE_VERIFICATION_CODE: &str =
        "authentication/validate_device_verification_code";
    pub const REQUEST_DEVICE_ADMIN_APPROVAL: &str =
        "authentication/request_device_admin_approval";
    pub const REGISTER_ENCRYPTED_DATA_KEY: &str =
        "authentication/register_encrypted_data_key_for_device";
    pub const UPDATE_DEVICE: &str = "authentication/update_device";
    pub const GET_DOMAIN_PASSWORD_RULES: &str = "authentication/get_domain_password_rules";
    pub const CHANGE_MASTER_PASSWORD: &str = "authentication/change_master_password";
    pub const SET_USER_SETTING: &str = "setting/set_user_setting";
    pub const ACCOUNT_SUMMARY: &str = "login/account_summary";
    pub const GET_ENTERPRISE_PUBLIC_KEY: &str = "enterprise/get_enterprise_public_key";
}

/// The two shapes a completed round-trip can take.
#[derive(Debug)]
pub enum RawResponse {
    /// The operation's serialized response payload.
    Payload(Vec<u8>),
    /// A structured rejection.
    Remote(ApiError),
}

/// Executes a named remote operation against the current region.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` to `endpoint` and return the server's verdict.
    async fn execute(&self, endpoint: &str, request: &[u8]) -> Result<RawResponse, TransportError>;

    /// Point subsequent requests at a different region host.
    fn set_region(&self, host: &str);
}

/// A server verdict: either the typed payload or a structured rejection.
pub(crate) type ApiResult<T> = Result<T, ApiError>;

/// Serialize `request`, execute it, and decode the payload as `Rs`.
///
/// The outer `Result` is for failures that never produced a verdict
/// (network, serialization); the inner one is the server's answer.
pub(crate) async fn round_trip<Rq, Rs>(
    transport: &dyn Transport,
    endpoint: &str,
    request: &Rq,
) -> Result<ApiResult<Rs>, LoginError>
where
    Rq: Serialize + Sync,
    Rs: DeserializeOwned,
{
    let body = serde_json::to_vec(request).map_err(TransportError::Serde)?;
    match transport.execute(endpoint, &body).await? {
        RawResponse::Payload(bytes) => {
            let response = serde_json::from_slice(&bytes).map_err(TransportError::Serde)?;
            Ok(Ok(response))
        }
        RawResponse::Remote(err) => Ok(Err(err)),
    }
}

/// Like [`round_trip`] for operations whose success payload is opaque or
/// empty: only the verdict matters.
pub(crate) async fn round_trip_unit<Rq>(
    transport: &dyn Transport,
    endpoint: &str,
    request: &Rq,
) -> Result<ApiResult<()>, LoginError>
where
    Rq: Serialize + Sync,
{
    let body = serde_json::to_vec(request).map_err(TransportError::Serde)?;
    match transport.execute(endpoint, &body).await? {
        RawResponse::Payload(_) => Ok(Ok(())),
        RawResponse::Remote(err) => Ok(Err(err)),
    }
}
