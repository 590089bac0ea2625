// vigil-providers/src/identity.rs
// ============================================================================
// Module: Identity Adapter
// Description: Suspends/unsuspends users and looks them up by login (§6).
// Purpose: Give the executor account-containment actions a single
//          narrow surface, since suspension is one of the approval-required
//          triggers in the plan builder (§4.6 Commander).
// ============================================================================

use reqwest::blocking::Client;
use vigil_config::CredentialState;
use vigil_config::IdentityCredentials;

use crate::client::build_client;
use crate::error::IntegrationError;
use crate::harness::IntegrationHarness;
use crate::mock::MockReceipt;

const INTEGRATION_NAME: &str = "identity";

/// A looked-up identity record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityRecord {
    /// The login that was looked up.
    pub login: String,
    /// Whether the account is currently suspended.
    pub suspended: bool,
}

/// Outcome of a suspend/unsuspend call, real or mocked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuspensionOutcome {
    /// The account's suspension state was changed for real.
    Changed {
        /// The login that was changed.
        login: String,
    },
    /// Credentials were absent.
    Mocked(MockReceipt),
}

/// Adapter for the identity integration (§6).
pub struct IdentityAdapter {
    state: CredentialState<IdentityCredentials>,
    client: Option<Client>,
}

impl IdentityAdapter {
    /// Builds an adapter from resolved credentials.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError`] when the HTTP client cannot be built.
    pub fn new(state: CredentialState<IdentityCredentials>, timeout_ms: u64) -> Result<Self, IntegrationError> {
        let client = match &state {
            CredentialState::Configured(_) => Some(build_client(timeout_ms)?),
            CredentialState::Mock => None,
        };
        Ok(Self { state, client })
    }

    fn set_suspended(&self, harness: &IntegrationHarness<'_>, login: &str, suspended: bool) -> Result<SuspensionOutcome, IntegrationError> {
        match &self.state {
            CredentialState::Mock => {
                let verb = if suspended { "suspend" } else { "unsuspend" };
                Ok(SuspensionOutcome::Mocked(MockReceipt::new(INTEGRATION_NAME, format!("{verb} {login}"))))
            }
            CredentialState::Configured(creds) => {
                let client = self.require_client()?;
                harness.call(INTEGRATION_NAME, |_attempt| {
                    let response = client
                        .post(format!("https://{}/users/{login}/suspension", creds.domain))
                        .bearer_auth(&creds.token)
                        .json(&serde_json::json!({ "suspended": suspended }))
                        .send()
                        .map_err(|err| IntegrationError::Call { message: err.to_string(), retryable: true })?;
                    let status = response.status().as_u16();
                    if response.status().is_success() {
                        Ok(())
                    } else {
                        Err(IntegrationError::from_status(status, format!("identity suspension update returned {status}")))
                    }
                })?;
                Ok(SuspensionOutcome::Changed { login: login.to_string() })
            }
        }
    }

    /// Suspends `login`.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError`] when the configured HTTP call fails.
    pub fn suspend(&self, harness: &IntegrationHarness<'_>, login: &str) -> Result<SuspensionOutcome, IntegrationError> {
        self.set_suspended(harness, login, true)
    }

    /// Unsuspends `login`.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError`] when the configured HTTP call fails.
    pub fn unsuspend(&self, harness: &IntegrationHarness<'_>, login: &str) -> Result<SuspensionOutcome, IntegrationError> {
        self.set_suspended(harness, login, false)
    }

    /// Looks up an identity record by login.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError`] when the configured HTTP call fails.
    pub fn lookup(&self, harness: &IntegrationHarness<'_>, login: &str) -> Result<IdentityRecord, IntegrationError> {
        match &self.state {
            CredentialState::Mock => Ok(IdentityRecord { login: login.to_string(), suspended: false }),
            CredentialState::Configured(creds) => {
                let client = self.require_client()?;
                harness.call(INTEGRATION_NAME, |_attempt| {
                    let response = client
                        .get(format!("https://{}/users/{login}", creds.domain))
                        .bearer_auth(&creds.token)
                        .send()
                        .map_err(|err| IntegrationError::Call { message: err.to_string(), retryable: true })?;
                    let status = response.status().as_u16();
                    if !response.status().is_success() {
                        return Err(IntegrationError::from_status(status, format!("identity lookup returned {status}")));
                    }
                    let suspended = response
                        .json::<serde_json::Value>()
                        .ok()
                        .and_then(|body| body.get("suspended").and_then(serde_json::Value::as_bool))
                        .unwrap_or(false);
                    Ok(IdentityRecord { login: login.to_string(), suspended })
                })
            }
        }
    }

    fn require_client(&self) -> Result<&Client, IntegrationError> {
        self.client.as_ref().ok_or_else(|| IntegrationError::Call {
            message: "identity adapter configured without an http client".to_string(),
            retryable: false,
        })
    }
}
