//! Scripted capability implementations for tests.
//!
//! These doubles let the whole state machine run in-process: the transport
//! replays a scripted sequence of verdicts and records every call, the UI
//! replays queued input, and the remaining capabilities are inert.

use std::{
    collections::VecDeque,
    sync::Mutex,
};

use async_trait::async_trait;
use serde::Serialize;

use crate::{
    api::AccountSummary,
    error::{ApiError, LoginError, TransportError},
    interact::{HardwareAssertion, HardwareAuthenticator, HardwareKeyError, Severity, UserInteraction},
    summary::AccountSummaryProvider,
    transport::{RawResponse, Transport},
};

/// Marker recorded in the call log when the region changes.
pub const SET_REGION_CALL: &str = "set_region";

/// A [`Transport`] that replays a scripted sequence of responses.
///
/// Each scripted entry names the endpoint it expects; a request to any
/// other endpoint, or one past the end of the script, fails the round-trip.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<(String, RawResponse)>>,
    calls: Mutex<Vec<(String, Vec<u8>)>>,
}

impl ScriptedTransport {
    /// An empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Expect `endpoint` next and answer with a serialized payload.
    pub fn expect_payload<T: Serialize>(&self, endpoint: &str, response: &T) {
        let bytes = serde_json::to_vec(response).expect("scripted response serializes");
        self.script
            .lock()
            .expect("script mutex poisoned")
            .push_back((endpoint.to_owned(), RawResponse::Payload(bytes)));
    }

    /// Expect `endpoint` next and answer with a structured rejection.
    pub fn expect_error(&self, endpoint: &str, error: ApiError) {
        self.script
            .lock()
            .expect("script mutex poisoned")
            .push_back((endpoint.to_owned(), RawResponse::Remote(error)));
    }

    /// The endpoints called so far, in order, including [`SET_REGION_CALL`]
    /// markers of the form `set_region:<host>`.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .expect("call mutex poisoned")
            .iter()
            .map(|(endpoint, _)| endpoint.clone())
            .collect()
    }

    /// The request body of call `index`, parsed as JSON.
    pub fn request_json(&self, index: usize) -> serde_json::Value {
        let calls = self.calls.lock().expect("call mutex poisoned");
        let (endpoint, body) = calls.get(index).expect("recorded call exists");
        serde_json::from_slice(body)
            .unwrap_or_else(|err| panic!("call {index} to {endpoint} is not JSON: {err}"))
    }

    /// True when every scripted response was consumed.
    pub fn script_exhausted(&self) -> bool {
        self.script.lock().expect("script mutex poisoned").is_empty()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(
        &self,
        endpoint: &str,
        request: &[u8],
    ) -> Result<RawResponse, TransportError> {
        self.calls
            .lock()
            .expect("call mutex poisoned")
            .push((endpoint.to_owned(), request.to_vec()));

        let next = self
            .script
            .lock()
            .expect("script mutex poisoned")
            .pop_front();
        match next {
            Some((expected, response)) if expected == endpoint => Ok(response),
            Some((expected, _)) => Err(TransportError::Network(format!(
                "unexpected endpoint {endpoint}, script expected {expected}"
            ))),
            None => Err(TransportError::Network(format!(
                "unexpected endpoint {endpoint}, script is exhausted"
            ))),
        }
    }

    fn set_region(&self, host: &str) {
        self.calls
            .lock()
            .expect("call mutex poisoned")
            .push((format!("{SET_REGION_CALL}:{host}"), Vec::new()));
    }
}

/// A [`UserInteraction`] that replays queued input and records output.
///
/// Exhausted queues answer with an empty string, which every prompt loop
/// treats as cancel/resume, so an over-eager flow terminates instead of
/// hanging.
#[derive(Default)]
pub struct ScriptedUi {
    lines: Mutex<VecDeque<String>>,
    secrets: Mutex<VecDeque<String>>,
    messages: Mutex<Vec<(String, Severity)>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedUi {
    /// An empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an answer for the next visible prompt.
    pub fn push_line(&self, line: &str) {
        self.lines
            .lock()
            .expect("ui mutex poisoned")
            .push_back(line.to_owned());
    }

    /// Queue an answer for the next secret prompt.
    pub fn push_secret(&self, secret: &str) {
        self.secrets
            .lock()
            .expect("ui mutex poisoned")
            .push_back(secret.to_owned());
    }

    /// All messages shown so far.
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .expect("ui mutex poisoned")
            .iter()
            .map(|(text, _)| text.clone())
            .collect()
    }

    /// All prompt labels issued so far, visible and secret.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("ui mutex poisoned").clone()
    }
}

#[async_trait]
impl UserInteraction for ScriptedUi {
    async fn prompt_line(&self, label: &str) -> String {
        self.prompts
            .lock()
            .expect("ui mutex poisoned")
            .push(label.to_owned());
        self.lines
            .lock()
            .expect("ui mutex poisoned")
            .pop_front()
            .unwrap_or_default()
    }

    async fn prompt_secret(&self, label: &str) -> String {
        self.prompts
            .lock()
            .expect("ui mutex poisoned")
            .push(label.to_owned());
        self.secrets
            .lock()
            .expect("ui mutex poisoned")
            .pop_front()
            .unwrap_or_default()
    }

    fn message(&self, text: &str, severity: Severity) {
        self.messages
            .lock()
            .expect("ui mutex poisoned")
            .push((text.to_owned(), severity));
    }

    fn copy_to_clipboard(&self, _text: &str) -> bool {
        false
    }

    fn open_url(&self, _url: &str) -> bool {
        false
    }
}

/// A [`HardwareAuthenticator`] for systems with no security key support.
pub struct NoHardwareKeys;

#[async_trait]
impl HardwareAuthenticator for NoHardwareKeys {
    async fn authenticate(
        &self,
        _challenge: &str,
    ) -> Result<HardwareAssertion, HardwareKeyError> {
        Err(HardwareKeyError::Unavailable)
    }
}

/// An [`AccountSummaryProvider`] that returns a fixed summary.
#[derive(Default)]
pub struct StaticSummaryProvider {
    summary: AccountSummary,
}

impl StaticSummaryProvider {
    /// Serve `summary` to every caller.
    pub fn new(summary: AccountSummary) -> Self {
        Self { summary }
    }
}

#[async_trait]
impl AccountSummaryProvider for StaticSummaryProvider {
    async fn fetch(&self) -> Result<AccountSummary, LoginError> {
        Ok(self.summary.clone())
    }
}
