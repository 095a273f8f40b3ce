//! Post-login account summary.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    api::{AccountSummary, AccountSummaryRequest},
    error::LoginError,
    transport::{endpoint, round_trip, Transport},
};

const SUMMARY_VERSION: i32 = 1;

/// Fetches the account summary once a session token is held. Behind a trait
/// so finalization is testable without a live backend.
#[async_trait]
pub trait AccountSummaryProvider: Send + Sync {
    /// Fetch the summary for the authenticated account.
    async fn fetch(&self) -> Result<AccountSummary, LoginError>;
}

/// The production provider: asks the authority.
pub struct RemoteAccountSummaryProvider {
    transport: Arc<dyn Transport>,
}

impl RemoteAccountSummaryProvider {
    /// Build a provider over the given transport.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl AccountSummaryProvider for RemoteAccountSummaryProvider {
    async fn fetch(&self) -> Result<AccountSummary, LoginError> {
        let request = AccountSummaryRequest {
            summary_version: SUMMARY_VERSION,
        };
        round_trip(self.transport.as_ref(), endpoint::ACCOUNT_SUMMARY, &request)
            .await?
            .map_err(LoginError::Api)
    }
}
