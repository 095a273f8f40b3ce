//! User-facing capabilities.
//!
//! All interactive I/O is funneled through [`UserInteraction`] so the state
//! machine and key resolution stay testable without a live terminal, and the
//! hardware security key ceremony sits behind [`HardwareAuthenticator`].

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use thiserror::Error;

/// How a message should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Routine progress output.
    Info,
    /// Something went wrong but the flow continues.
    Warning,
    /// A failure the user must act on.
    Error,
}

/// Interactive I/O capability.
#[async_trait]
pub trait UserInteraction: Send + Sync {
    /// Prompt for a visible line of input.
    async fn prompt_line(&self, label: &str) -> String;
    /// Prompt for a secret; input must not be echoed.
    async fn prompt_secret(&self, label: &str) -> String;
    /// Show a message to the user.
    fn message(&self, text: &str, severity: Severity);
    /// Copy text to the system clipboard. Returns false when unavailable.
    fn copy_to_clipboard(&self, text: &str) -> bool;
    /// Open a URL in the default browser. Returns false when unavailable.
    fn open_url(&self, url: &str) -> bool;
}

/// A completed hardware security key assertion.
#[derive(Debug, Clone)]
pub struct HardwareAssertion {
    /// The credential (key handle) the authenticator used.
    pub credential_id: Vec<u8>,
    /// Raw authenticator data.
    pub authenticator_data: Vec<u8>,
    /// The client data JSON, exactly as signed.
    pub client_data_json: String,
    /// The assertion signature.
    pub signature: Vec<u8>,
    /// Client extension results, if any.
    pub extension_results: Option<serde_json::Value>,
}

/// Errors from the hardware key ceremony.
#[derive(Debug, Error)]
pub enum HardwareKeyError {
    /// No security key support is present on this system.
    #[error("No security key support is available")]
    Unavailable,
    /// The ceremony ran but failed.
    #[error("Security key ceremony failed: {0}")]
    Ceremony(String),
}

/// Drives the FIDO U2F / WebAuthn ceremony against a physical key.
#[async_trait]
pub trait HardwareAuthenticator: Send + Sync {
    /// Perform an assertion over the server-issued challenge.
    async fn authenticate(&self, challenge: &str) -> Result<HardwareAssertion, HardwareKeyError>;
}

/// Process-wide record of hardware security key availability.
///
/// Set once on the first missing-capability detection and read-only
/// thereafter; once set, hardware channels are hidden from every later
/// two-factor prompt in this process. Injected rather than a bare static so
/// tests can construct their own lifecycle.
#[derive(Debug, Default)]
pub struct HardwareKeyAvailability {
    unavailable: AtomicBool,
}

impl HardwareKeyAvailability {
    /// Create a fresh (available) record.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when hardware channels should be hidden.
    pub fn hardware_hidden(&self) -> bool {
        self.unavailable.load(Ordering::Relaxed)
    }

    /// Record that the capability is missing. Returns true only on the
    /// first call, which is when the one-time warning should be shown.
    pub(crate) fn mark_unavailable(&self) -> bool {
        !self.unavailable.swap(true, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_availability_set_once() {
        let availability = HardwareKeyAvailability::new();
        assert!(!availability.hardware_hidden());
        assert!(availability.mark_unavailable());
        assert!(!availability.mark_unavailable());
        assert!(availability.hardware_hidden());
    }
}
