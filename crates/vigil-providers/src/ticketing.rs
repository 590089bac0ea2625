// vigil-providers/src/ticketing.rs
// ============================================================================
// Module: Ticketing Adapter
// Description: Creates and updates incident tickets (§6).
// Purpose: Idempotent ticket creation keyed by `incident-{id}` so a retried
//          create never files a duplicate.
// ============================================================================

use reqwest::blocking::Client;
use vigil_config::CredentialState;
use vigil_config::TicketingCredentials;

use crate::client::build_client;
use crate::error::IntegrationError;
use crate::harness::IntegrationHarness;
use crate::mock::MockReceipt;

const INTEGRATION_NAME: &str = "ticketing";

/// A created or located ticket reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketRef {
    /// Ticket identifier assigned by the ticketing system.
    pub ticket_id: String,
    /// The idempotency label this ticket is keyed by.
    pub incident_label: String,
}

/// Outcome of a ticketing call, real or mocked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketOutcome {
    /// A real ticket reference.
    Ticket(TicketRef),
    /// Credentials were absent.
    Mocked(MockReceipt),
}

/// Adapter for the ticketing integration (§6).
pub struct TicketingAdapter {
    state: CredentialState<TicketingCredentials>,
    client: Option<Client>,
}

impl TicketingAdapter {
    /// Builds an adapter from resolved credentials.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError`] when the HTTP client cannot be built.
    pub fn new(state: CredentialState<TicketingCredentials>, timeout_ms: u64) -> Result<Self, IntegrationError> {
        let client = match &state {
            CredentialState::Configured(_) => Some(build_client(timeout_ms)?),
            CredentialState::Mock => None,
        };
        Ok(Self { state, client })
    }

    /// Creates a ticket for `incident_id`, idempotent by the
    /// `incident-{id}` label (§6).
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError`] when the configured HTTP call fails.
    pub fn create_incident_ticket(
        &self,
        harness: &IntegrationHarness<'_>,
        incident_id: &str,
        summary: &str,
    ) -> Result<TicketOutcome, IntegrationError> {
        let label = format!("incident-{incident_id}");
        match &self.state {
            CredentialState::Mock => {
                Ok(TicketOutcome::Mocked(MockReceipt::new(INTEGRATION_NAME, format!("create ticket {label}: {summary}"))))
            }
            CredentialState::Configured(creds) => {
                let client = self.require_client()?;
                let ticket_id = harness.call(INTEGRATION_NAME, |_attempt| {
                    let response = client
                        .post(format!("{}/projects/{}/tickets", creds.base_url, creds.project_key))
                        .bearer_auth(&creds.auth)
                        .json(&serde_json::json!({ "label": label, "summary": summary, "idempotency_key": label }))
                        .send()
                        .map_err(|err| IntegrationError::Call { message: err.to_string(), retryable: true })?;
                    let status = response.status().as_u16();
                    if !response.status().is_success() {
                        return Err(IntegrationError::from_status(status, format!("ticket create returned {status}")));
                    }
                    response
                        .json::<serde_json::Value>()
                        .ok()
                        .and_then(|body| body.get("ticket_id").and_then(|v| v.as_str()).map(str::to_string))
                        .ok_or_else(|| IntegrationError::Call {
                            message: "ticket create response missing ticket_id".to_string(),
                            retryable: false,
                        })
                })?;
                Ok(TicketOutcome::Ticket(TicketRef { ticket_id, incident_label: label }))
            }
        }
    }

    /// Updates a ticket's status.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError`] when the configured HTTP call fails.
    pub fn update_status(&self, harness: &IntegrationHarness<'_>, ticket_id: &str, status: &str) -> Result<(), IntegrationError> {
        match &self.state {
            CredentialState::Mock => Ok(()),
            CredentialState::Configured(creds) => {
                let client = self.require_client()?;
                harness.call(INTEGRATION_NAME, |_attempt| {
                    let response = client
                        .post(format!("{}/tickets/{ticket_id}/status", creds.base_url))
                        .bearer_auth(&creds.auth)
                        .json(&serde_json::json!({ "status": status }))
                        .send()
                        .map_err(|err| IntegrationError::Call { message: err.to_string(), retryable: true })?;
                    let status_code = response.status().as_u16();
                    if response.status().is_success() {
                        Ok(())
                    } else {
                        Err(IntegrationError::from_status(status_code, format!("ticket status update returned {status_code}")))
                    }
                })
            }
        }
    }

    /// Adds a comment to an existing ticket.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError`] when the configured HTTP call fails.
    pub fn add_comment(&self, harness: &IntegrationHarness<'_>, ticket_id: &str, comment: &str) -> Result<(), IntegrationError> {
        match &self.state {
            CredentialState::Mock => Ok(()),
            CredentialState::Configured(creds) => {
                let client = self.require_client()?;
                harness.call(INTEGRATION_NAME, |_attempt| {
                    let response = client
                        .post(format!("{}/tickets/{ticket_id}/comments", creds.base_url))
                        .bearer_auth(&creds.auth)
                        .json(&serde_json::json!({ "body": comment }))
                        .send()
                        .map_err(|err| IntegrationError::Call { message: err.to_string(), retryable: true })?;
                    let status_code = response.status().as_u16();
                    if response.status().is_success() {
                        Ok(())
                    } else {
                        Err(IntegrationError::from_status(status_code, format!("ticket comment returned {status_code}")))
                    }
                })
            }
        }
    }

    fn require_client(&self) -> Result<&Client, IntegrationError> {
        self.client.as_ref().ok_or_else(|| IntegrationError::Call {
            message: "ticketing adapter configured without an http client".to_string(),
            retryable: false,
        })
    }
}
