// vigil-providers/src/paging.rs
// ============================================================================
// Module: Paging Adapter
// Description: Triggers and resolves pages (§6).
// Purpose: Keep paging dedup keyed by `vigil-{incident_id}` so re-triggering
//          an already-open page never double-pages an on-call.
// ============================================================================

use reqwest::blocking::Client;
use vigil_config::CredentialState;
use vigil_config::PagingCredentials;

use crate::client::build_client;
use crate::error::IntegrationError;
use crate::harness::IntegrationHarness;
use crate::mock::MockReceipt;

const INTEGRATION_NAME: &str = "paging";
const PAGING_API_BASE: &str = "https://paging.internal/api/v1";

/// Outcome of a paging call, real or mocked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PagingOutcome {
    /// The page was (or would have been) triggered/resolved under this key.
    Acked {
        /// Dedup key the event was filed under.
        dedup_key: String,
    },
    /// Credentials were absent.
    Mocked(MockReceipt),
}

/// Adapter for the paging integration (§6).
pub struct PagingAdapter {
    state: CredentialState<PagingCredentials>,
    client: Option<Client>,
}

impl PagingAdapter {
    /// Builds an adapter from resolved credentials.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError`] when the HTTP client cannot be built.
    pub fn new(state: CredentialState<PagingCredentials>, timeout_ms: u64) -> Result<Self, IntegrationError> {
        let client = match &state {
            CredentialState::Configured(_) => Some(build_client(timeout_ms)?),
            CredentialState::Mock => None,
        };
        Ok(Self { state, client })
    }

    fn dedup_key(incident_id: &str) -> String {
        format!("vigil-{incident_id}")
    }

    fn call(&self, harness: &IntegrationHarness<'_>, path: &str, incident_id: &str, summary: &str) -> Result<PagingOutcome, IntegrationError> {
        let dedup_key = Self::dedup_key(incident_id);
        match &self.state {
            CredentialState::Mock => Ok(PagingOutcome::Mocked(MockReceipt::new(INTEGRATION_NAME, format!("{path} {dedup_key}: {summary}")))),
            CredentialState::Configured(creds) => {
                let client = self.client.as_ref().ok_or_else(|| IntegrationError::Call {
                    message: "paging adapter configured without an http client".to_string(),
                    retryable: false,
                })?;
                harness.call(INTEGRATION_NAME, |_attempt| {
                    let response = client
                        .post(format!("{PAGING_API_BASE}/{path}"))
                        .bearer_auth(&creds.routing_key)
                        .json(&serde_json::json!({ "dedup_key": dedup_key, "summary": summary }))
                        .send()
                        .map_err(|err| IntegrationError::Call { message: err.to_string(), retryable: true })?;
                    let status = response.status().as_u16();
                    if response.status().is_success() {
                        Ok(())
                    } else {
                        Err(IntegrationError::from_status(status, format!("paging {path} returned {status}")))
                    }
                })?;
                Ok(PagingOutcome::Acked { dedup_key })
            }
        }
    }

    /// Triggers a page for `incident_id`.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError`] when the configured HTTP call fails.
    pub fn trigger(&self, harness: &IntegrationHarness<'_>, incident_id: &str, summary: &str) -> Result<PagingOutcome, IntegrationError> {
        self.call(harness, "trigger", incident_id, summary)
    }

    /// Resolves the page for `incident_id`.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError`] when the configured HTTP call fails.
    pub fn resolve(&self, harness: &IntegrationHarness<'_>, incident_id: &str) -> Result<PagingOutcome, IntegrationError> {
        self.call(harness, "resolve", incident_id, "resolved")
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test fixtures use explicit asserts and unwraps for clarity."
    )]

    use vigil_core::time::SystemClock;

    use super::*;
    use crate::breaker::BreakerConfig;
    use crate::breaker::CircuitBreakerRegistry;
    use crate::harness::RetryConfig;

    #[test]
    fn dedup_key_is_namespaced_by_incident_id() {
        assert_eq!(PagingAdapter::dedup_key("INC-2026-00001"), "vigil-INC-2026-00001");
    }

    #[test]
    fn mock_trigger_reports_the_dedup_key() {
        let adapter = PagingAdapter::new(CredentialState::Mock, 10_000).expect("adapter must build");
        let breaker = CircuitBreakerRegistry::new(BreakerConfig::default());
        let clock = SystemClock;
        let harness = IntegrationHarness::new(RetryConfig::default(), &breaker, &clock);
        let outcome = adapter.trigger(&harness, "INC-2026-00002", "containment breach").expect("mock cannot fail");
        assert!(matches!(outcome, PagingOutcome::Mocked(_)));
    }
}
