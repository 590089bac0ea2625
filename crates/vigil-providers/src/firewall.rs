// vigil-providers/src/firewall.rs
// ============================================================================
// Module: Firewall Adapter
// Description: Blocks and unblocks IP addresses/CIDRs (§6).
// Purpose: Give the executor containment actions a single, revertible
//          effect: every block returns a `rule_id` the plan can later
//          remove.
// ============================================================================

use reqwest::blocking::Client;
use vigil_config::CredentialState;
use vigil_config::FirewallCredentials;

use crate::client::build_client;
use crate::error::IntegrationError;
use crate::harness::IntegrationHarness;
use crate::mock::MockReceipt;

const INTEGRATION_NAME: &str = "firewall";

/// A firewall block rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirewallRule {
    /// Rule identifier assigned by the firewall, used later to remove it.
    pub rule_id: String,
}

/// Outcome of a block call, real or mocked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockOutcome {
    /// A real rule was created.
    Blocked(FirewallRule),
    /// Credentials were absent.
    Mocked(MockReceipt),
}

/// Adapter for the firewall integration (§6).
pub struct FirewallAdapter {
    state: CredentialState<FirewallCredentials>,
    client: Option<Client>,
}

impl FirewallAdapter {
    /// Builds an adapter from resolved credentials.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError`] when the HTTP client cannot be built.
    pub fn new(state: CredentialState<FirewallCredentials>, timeout_ms: u64) -> Result<Self, IntegrationError> {
        let client = match &state {
            CredentialState::Configured(_) => Some(build_client(timeout_ms)?),
            CredentialState::Mock => None,
        };
        Ok(Self { state, client })
    }

    /// Blocks `ip_or_cidr`, returning the rule id the executor must keep to
    /// later call [`Self::remove_rule`].
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError`] when the configured HTTP call fails.
    pub fn block(&self, harness: &IntegrationHarness<'_>, ip_or_cidr: &str) -> Result<BlockOutcome, IntegrationError> {
        match &self.state {
            CredentialState::Mock => Ok(BlockOutcome::Mocked(MockReceipt::new(INTEGRATION_NAME, format!("block {ip_or_cidr}")))),
            CredentialState::Configured(creds) => {
                let client = self.require_client()?;
                let rule_id = harness.call(INTEGRATION_NAME, |_attempt| {
                    let response = client
                        .post(format!("{}/zones/{}/rulesets/{}/rules", firewall_api_base(), creds.zone, creds.ruleset))
                        .bearer_auth(&creds.api_token)
                        .json(&serde_json::json!({ "action": "block", "target": ip_or_cidr }))
                        .send()
                        .map_err(|err| IntegrationError::Call { message: err.to_string(), retryable: true })?;
                    let status = response.status().as_u16();
                    if !response.status().is_success() {
                        return Err(IntegrationError::from_status(status, format!("firewall block returned {status}")));
                    }
                    response
                        .json::<serde_json::Value>()
                        .ok()
                        .and_then(|body| body.get("rule_id").and_then(|v| v.as_str()).map(str::to_string))
                        .ok_or_else(|| IntegrationError::Call {
                            message: "firewall block response missing rule_id".to_string(),
                            retryable: false,
                        })
                })?;
                Ok(BlockOutcome::Blocked(FirewallRule { rule_id }))
            }
        }
    }

    /// Removes a previously created rule.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError`] when the configured HTTP call fails.
    pub fn remove_rule(&self, harness: &IntegrationHarness<'_>, rule_id: &str) -> Result<(), IntegrationError> {
        match &self.state {
            CredentialState::Mock => Ok(()),
            CredentialState::Configured(creds) => {
                let client = self.require_client()?;
                harness.call(INTEGRATION_NAME, |_attempt| {
                    let response = client
                        .delete(format!("{}/zones/{}/rulesets/{}/rules/{rule_id}", firewall_api_base(), creds.zone, creds.ruleset))
                        .bearer_auth(&creds.api_token)
                        .send()
                        .map_err(|err| IntegrationError::Call { message: err.to_string(), retryable: true })?;
                    let status = response.status().as_u16();
                    if response.status().is_success() {
                        Ok(())
                    } else {
                        Err(IntegrationError::from_status(status, format!("firewall rule removal returned {status}")))
                    }
                })
            }
        }
    }

    fn require_client(&self) -> Result<&Client, IntegrationError> {
        self.client.as_ref().ok_or_else(|| IntegrationError::Call {
            message: "firewall adapter configured without an http client".to_string(),
            retryable: false,
        })
    }
}

fn firewall_api_base() -> &'static str {
    "https://firewall.internal/api/v1"
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
    fn mock_block_never_reaches_the_network() {
        let adapter = FirewallAdapter::new(CredentialState::Mock, 10_000).expect("adapter must build");
        let breaker = CircuitBreakerRegistry::new(BreakerConfig::default());
        let clock = SystemClock;
        let harness = IntegrationHarness::new(RetryConfig::default(), &breaker, &clock);
        let outcome = adapter.block(&harness, "10.0.0.7/32").expect("mock cannot fail");
        assert!(matches!(outcome, BlockOutcome::Mocked(_)));
    }
}
