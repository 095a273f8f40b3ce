//! Client-side implementation of the server-driven login protocol.
//!
//! The remote authority owns the flow: every request is answered with a
//! login state, and [`LoginClient::login`] dispatches on those states until
//! the session holds a token and the plaintext data key. Device identity,
//! two-factor ceremonies, SSO detours, and post-login finalization all hang
//! off the same client; effectful concerns (wire, persisted config,
//! interactive I/O, security keys) are injected as traits.

pub mod api;
mod client;
mod data_key;
mod device;
mod device_approval;
mod error;
mod finalize;
mod interact;
mod login;
mod session;
mod sso;
mod store;
mod summary;
pub mod testing;
mod transport;
mod two_factor;

pub use client::{ClientSettings, LoginClient, ServerPublicKey};
pub use error::{ApiError, LoginError, MissingFieldError, TransportError};
pub use interact::{
    HardwareAssertion, HardwareAuthenticator, HardwareKeyAvailability, HardwareKeyError,
    Severity, UserInteraction,
};
pub use login::LoginOptions;
pub use session::{DataKey, LoginSession, SsoSession};
pub use store::{config_keys, CredentialStore, MemoryCredentialStore};
pub use summary::{AccountSummaryProvider, RemoteAccountSummaryProvider};
pub use transport::{endpoint, RawResponse, Transport};
