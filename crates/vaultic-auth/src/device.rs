//! Device identity: registration, regional re-registration, and the small
//! device-scoped maintenance operations.

use std::str::FromStr;

use log::debug;
use vaultic_crypto::{generate_ec_keypair, EcPrivateKey};
use vaultic_encoding::B64Url;

use crate::{
    api::{
        Device, DeviceRegistrationRequest, DeviceUpdateRequest, RegisterDeviceDataKeyRequest,
        RegisterDeviceInRegionRequest, UserSettingRequest,
    },
    client::LoginClient,
    error::LoginError,
    require,
    session::LoginSession,
    store::config_keys,
    transport::{endpoint, round_trip, round_trip_unit},
};

/// Server error code returned when the data key is already registered for
/// this device, which callers treat as a no-op.
const DATA_KEY_EXISTS: &str = "device_data_key_exists";

/// Additional info marking a token that merely needs regional registration,
/// as opposed to one that is unusable.
const NOT_REGISTERED_IN_REGION: &str = "invalid device token, not registered in this region";

impl LoginClient {
    /// Resolve the encrypted device token, registering a new device when
    /// none is persisted (or when `new_device` forces a fresh identity).
    pub(crate) async fn device_token(&self, new_device: bool) -> Result<B64Url, LoginError> {
        if new_device {
            self.store.remove(config_keys::DEVICE_TOKEN);
            self.store.remove(config_keys::DEVICE_PRIVATE_KEY);
        } else if let Some(token) = self.store.get(config_keys::DEVICE_TOKEN) {
            if let Ok(token) = B64Url::from_str(&token) {
                return Ok(token);
            }
            debug!("discarding unparsable persisted device token");
        }

        let keypair = generate_ec_keypair();
        let request = DeviceRegistrationRequest {
            client_version: self.settings.client_version.clone(),
            device_name: self.settings.device_name.clone(),
            device_public_key: B64Url::from(keypair.public.to_bytes()),
        };
        let device: Device =
            round_trip(self.transport.as_ref(), endpoint::REGISTER_DEVICE, &request)
                .await?
                .map_err(LoginError::Api)?;

        self.store.set(
            config_keys::DEVICE_TOKEN,
            &device.encrypted_device_token.to_string(),
        );
        self.store.set(
            config_keys::DEVICE_PRIVATE_KEY,
            &B64Url::from(keypair.private.to_bytes().to_vec()).to_string(),
        );
        self.store.persist();

        Ok(device.encrypted_device_token)
    }

    /// Load the persisted device private key.
    pub(crate) fn device_private_key(&self) -> Result<EcPrivateKey, LoginError> {
        let encoded = self
            .store
            .get(config_keys::DEVICE_PRIVATE_KEY)
            .ok_or(LoginError::MissingDeviceKey)?;
        let bytes = B64Url::from_str(&encoded).map_err(|_| LoginError::MissingDeviceKey)?;
        EcPrivateKey::from_bytes(bytes.as_bytes()).map_err(LoginError::Crypto)
    }

    /// Register the existing device token in the current region. Called
    /// after a region redirect, before the login attempt restarts there.
    pub(crate) async fn register_device_in_region(
        &self,
        device_token: &B64Url,
    ) -> Result<(), LoginError> {
        let public_key = self.device_private_key()?.public_key();
        let request = RegisterDeviceInRegionRequest {
            client_version: self.settings.client_version.clone(),
            device_name: self.settings.device_name.clone(),
            encrypted_device_token: device_token.clone(),
            device_public_key: B64Url::from(public_key.to_bytes()),
        };
        match round_trip_unit(
            self.transport.as_ref(),
            endpoint::REGISTER_DEVICE_IN_REGION,
            &request,
        )
        .await?
        {
            Ok(()) => Ok(()),
            // An "exists" verdict means a previous attempt already
            // registered us here.
            Err(err) if err.code == "exists" => Ok(()),
            Err(err) => {
                debug!("regional registration rejected: {err}");
                Err(LoginError::InvalidDeviceToken)
            }
        }
    }

    /// Store the data key encrypted to this device's public key, enabling
    /// persistent login. Returns `false` when the server already holds one.
    pub async fn register_encrypted_data_key_for_device(
        &self,
        session: &LoginSession,
    ) -> Result<bool, LoginError> {
        let data_key = require!(session.data_key.as_ref());
        let device_token = self.device_token(false).await?;
        let public_key = self.device_private_key()?.public_key();

        let request = RegisterDeviceDataKeyRequest {
            encrypted_device_token: device_token,
            encrypted_device_data_key: B64Url::from(public_key.encrypt(data_key.as_bytes())),
        };
        match round_trip_unit(
            self.transport.as_ref(),
            endpoint::REGISTER_ENCRYPTED_DATA_KEY,
            &request,
        )
        .await?
        {
            Ok(()) => Ok(true),
            Err(err) if err.code == DATA_KEY_EXISTS => Ok(false),
            Err(err) => Err(LoginError::Api(err)),
        }
    }

    /// Rename this device.
    pub async fn rename_device(&self, new_name: &str) -> Result<(), LoginError> {
        let device_token = self.device_token(false).await?;
        let request = DeviceUpdateRequest {
            client_version: self.settings.client_version.clone(),
            device_name: new_name.to_owned(),
            encrypted_device_token: device_token,
        };
        round_trip_unit(self.transport.as_ref(), endpoint::UPDATE_DEVICE, &request)
            .await?
            .map_err(LoginError::Api)
    }

    /// Update a single account setting.
    pub async fn set_user_setting(&self, setting: &str, value: &str) -> Result<(), LoginError> {
        let request = UserSettingRequest {
            setting: setting.to_owned(),
            value: value.to_owned(),
        };
        round_trip_unit(self.transport.as_ref(), endpoint::SET_USER_SETTING, &request)
            .await?
            .map_err(LoginError::Api)
    }

    /// True when a rejected request only needs the device registered in the
    /// region it was sent to.
    pub(crate) fn needs_regional_registration(code: &str, additional_info: Option<&str>) -> bool {
        code == "device_not_registered" && additional_info == Some(NOT_REGISTERED_IN_REGION)
    }
}
