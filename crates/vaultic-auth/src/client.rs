//! The login client: capabilities plus static settings.

use std::{collections::BTreeMap, sync::Arc};

use vaultic_crypto::{EcPublicKey, RsaPublicKey};

use crate::{
    interact::{HardwareAuthenticator, HardwareKeyAvailability, UserInteraction},
    store::CredentialStore,
    summary::AccountSummaryProvider,
    transport::Transport,
};

/// A pinned public key the authority publishes for sealing SSO transmission
/// keys. Which variant applies depends on the key id the region advertises.
pub enum ServerPublicKey {
    /// An RSA-2048 key, PKCS#1 form.
    Rsa(RsaPublicKey),
    /// A P-256 key, SEC1 form.
    Ec(EcPublicKey),
}

/// Static client configuration.
pub struct ClientSettings {
    /// The client version string sent with every request.
    pub client_version: String,
    /// The device display name used at registration.
    pub device_name: String,
    /// The locale advertised to identity providers.
    pub locale: String,
    /// Which pinned server key to seal SSO payloads with.
    pub server_key_id: i32,
    /// The pinned server keys, by id.
    pub server_public_keys: BTreeMap<i32, ServerPublicKey>,
}

impl ClientSettings {
    /// Settings with conventional defaults for `client_version`.
    pub fn new(client_version: impl Into<String>) -> Self {
        Self {
            client_version: client_version.into(),
            device_name: format!("Vaultic CLI on {}", std::env::consts::OS),
            locale: "en_US".to_owned(),
            server_key_id: 7,
            server_public_keys: BTreeMap::new(),
        }
    }
}

/// Drives the login protocol.
///
/// Everything effectful is injected: the wire boundary, the persisted
/// configuration, interactive I/O, the hardware key ceremony, and the
/// post-login summary fetch. The client itself holds no mutable state;
/// per-attempt state lives in [`LoginSession`].
///
/// [`LoginSession`]: crate::LoginSession
pub struct LoginClient {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) store: Arc<dyn CredentialStore>,
    pub(crate) ui: Arc<dyn UserInteraction>,
    pub(crate) hardware: Arc<dyn HardwareAuthenticator>,
    pub(crate) summary: Arc<dyn AccountSummaryProvider>,
    pub(crate) hardware_keys: Arc<HardwareKeyAvailability>,
    pub(crate) settings: ClientSettings,
}

impl LoginClient {
    /// Assemble a client from its capabilities.
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn CredentialStore>,
        ui: Arc<dyn UserInteraction>,
        hardware: Arc<dyn HardwareAuthenticator>,
        summary: Arc<dyn AccountSummaryProvider>,
        settings: ClientSettings,
    ) -> Self {
        Self {
            transport,
            store,
            ui,
            hardware,
            summary,
            hardware_keys: Arc::new(HardwareKeyAvailability::new()),
            settings,
        }
    }

    /// Replace the process-wide hardware key availability record. Multiple
    /// clients in one process should share a single record.
    pub fn with_hardware_key_availability(
        mut self,
        availability: Arc<HardwareKeyAvailability>,
    ) -> Self {
        self.hardware_keys = availability;
        self
    }

    /// The static settings.
    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }
}
