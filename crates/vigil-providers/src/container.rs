// vigil-providers/src/container.rs
// ============================================================================
// Module: Container Orchestrator Adapter
// Description: Restarts, rolls back, scales, and reads status of
//              deployments (§6).
// Purpose: Give the executor operational-remediation actions; a rollback
//          targeting this integration is one of the approval-required
//          triggers in the plan builder (§4.6 Commander).
// ============================================================================

use reqwest::blocking::Client;
use vigil_config::ContainerCredentials;
use vigil_config::CredentialState;

use crate::client::build_client;
use crate::error::IntegrationError;
use crate::harness::IntegrationHarness;
use crate::mock::MockReceipt;

const INTEGRATION_NAME: &str = "container-orchestrator";

/// A deployment's observed status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentStatus {
    /// Deployment name.
    pub deployment: String,
    /// Currently running revision.
    pub revision: String,
    /// Number of ready replicas.
    pub ready_replicas: u32,
    /// Desired replica count.
    pub desired_replicas: u32,
}

/// Outcome of a mutating orchestrator call, real or mocked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorOutcome {
    /// The action was applied for real.
    Applied,
    /// Credentials were absent.
    Mocked(MockReceipt),
}

/// Adapter for the container orchestrator integration (§6).
pub struct ContainerAdapter {
    state: CredentialState<ContainerCredentials>,
    client: Option<Client>,
}

impl ContainerAdapter {
    /// Builds an adapter from resolved credentials.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError`] when the HTTP client cannot be built.
    pub fn new(state: CredentialState<ContainerCredentials>, timeout_ms: u64) -> Result<Self, IntegrationError> {
        let client = match &state {
            CredentialState::Configured(_) => Some(build_client(timeout_ms)?),
            CredentialState::Mock => None,
        };
        Ok(Self { state, client })
    }

    fn mutate(
        &self,
        harness: &IntegrationHarness<'_>,
        path: &str,
        deployment: &str,
        body: serde_json::Value,
    ) -> Result<OrchestratorOutcome, IntegrationError> {
        match &self.state {
            CredentialState::Mock => Ok(OrchestratorOutcome::Mocked(MockReceipt::new(INTEGRATION_NAME, format!("{path} {deployment}")))),
            CredentialState::Configured(creds) => {
                let client = self.require_client()?;
                harness.call(INTEGRATION_NAME, |_attempt| {
                    let response = client
                        .post(format!("{}/contexts/{}/deployments/{deployment}/{path}", orchestrator_api_base(), creds.context))
                        .json(&body)
                        .send()
                        .map_err(|err| IntegrationError::Call { message: err.to_string(), retryable: true })?;
                    let status = response.status().as_u16();
                    if response.status().is_success() {
                        Ok(())
                    } else {
                        Err(IntegrationError::from_status(status, format!("orchestrator {path} returned {status}")))
                    }
                })?;
                Ok(OrchestratorOutcome::Applied)
            }
        }
    }

    /// Restarts `deployment`.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError`] when the configured HTTP call fails.
    pub fn restart(&self, harness: &IntegrationHarness<'_>, deployment: &str) -> Result<OrchestratorOutcome, IntegrationError> {
        self.mutate(harness, "restart", deployment, serde_json::json!({}))
    }

    /// Rolls `deployment` back to `revision`, defaulting to the previous
    /// revision when `None` (§6).
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError`] when the configured HTTP call fails.
    pub fn rollback(&self, harness: &IntegrationHarness<'_>, deployment: &str, revision: Option<&str>) -> Result<OrchestratorOutcome, IntegrationError> {
        let target = revision.unwrap_or("previous");
        self.mutate(harness, "rollback", deployment, serde_json::json!({ "revision": target }))
    }

    /// Scales `deployment` to `replicas`.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError`] when the configured HTTP call fails.
    pub fn scale(&self, harness: &IntegrationHarness<'_>, deployment: &str, replicas: u32) -> Result<OrchestratorOutcome, IntegrationError> {
        self.mutate(harness, "scale", deployment, serde_json::json!({ "replicas": replicas }))
    }

    /// Reads a deployment's current status.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError`] when the configured HTTP call fails.
    pub fn status(&self, harness: &IntegrationHarness<'_>, deployment: &str) -> Result<DeploymentStatus, IntegrationError> {
        match &self.state {
            CredentialState::Mock => Ok(DeploymentStatus {
                deployment: deployment.to_string(),
                revision: "mock-revision".to_string(),
                ready_replicas: 1,
                desired_replicas: 1,
            }),
            CredentialState::Configured(creds) => {
                let client = self.require_client()?;
                harness.call(INTEGRATION_NAME, |_attempt| {
                    let response = client
                        .get(format!("{}/contexts/{}/deployments/{deployment}", orchestrator_api_base(), creds.context))
                        .send()
                        .map_err(|err| IntegrationError::Call { message: err.to_string(), retryable: true })?;
                    let status_code = response.status().as_u16();
                    if !response.status().is_success() {
                        return Err(IntegrationError::from_status(status_code, format!("orchestrator status returned {status_code}")));
                    }
                    let body: serde_json::Value = response
                        .json()
                        .map_err(|err| IntegrationError::Call { message: err.to_string(), retryable: false })?;
                    let replica_count = |field: &str| -> u32 {
                        body.get(field)
                            .and_then(serde_json::Value::as_u64)
                            .and_then(|value| u32::try_from(value).ok())
                            .unwrap_or(0)
                    };
                    Ok(DeploymentStatus {
                        deployment: deployment.to_string(),
                        revision: body.get("revision").and_then(|v| v.as_str()).unwrap_or("unknown").to_string(),
                        ready_replicas: replica_count("ready_replicas"),
                        desired_replicas: replica_count("desired_replicas"),
                    })
                })
            }
        }
    }

    fn require_client(&self) -> Result<&Client, IntegrationError> {
        self.client.as_ref().ok_or_else(|| IntegrationError::Call {
            message: "container adapter configured without an http client".to_string(),
            retryable: false,
        })
    }
}

fn orchestrator_api_base() -> &'static str {
    "https://orchestrator.internal/api/v1"
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
    fn rollback_defaults_to_the_previous_revision() {
        let adapter = ContainerAdapter::new(CredentialState::Mock, 10_000).expect("adapter must build");
        let breaker = CircuitBreakerRegistry::new(BreakerConfig::default());
        let clock = SystemClock;
        let harness = IntegrationHarness::new(RetryConfig::default(), &breaker, &clock);
        let outcome = adapter.rollback(&harness, "checkout-api", None).expect("mock cannot fail");
        match outcome {
            OrchestratorOutcome::Mocked(receipt) => assert!(receipt.intended_effect.contains("rollback")),
            OrchestratorOutcome::Applied => unreachable!("mock mode always yields Mocked"),
        }
    }
}
