// vigil-providers/src/chat.rs
// ============================================================================
// Module: Chat Notification Adapter
// Description: Posts structured notifications, approval requests,
//              resolutions, and escalations to the chat integration (§6).
// Purpose: Give the coordinator and approval gate one narrow surface for
//          outbound chat traffic, with signature verification for inbound
//          approval webhooks.
// Dependencies: vigil-config, reqwest, sha2
// ============================================================================

use reqwest::blocking::Client;
use sha2::Digest as _;
use sha2::Sha256;
use vigil_config::ChatCredentials;
use vigil_config::CredentialState;

use crate::client::build_client;
use crate::error::IntegrationError;
use crate::harness::IntegrationHarness;
use crate::mock::MockReceipt;

const INTEGRATION_NAME: &str = "chat";
const CHAT_API_BASE: &str = "https://chat.internal/api/v1";

/// Outcome of a chat post, real or mocked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatPostOutcome {
    /// The message was (or would have been) delivered to these channels.
    Delivered {
        /// Channels the message reached.
        channels: Vec<String>,
    },
    /// Credentials were absent; see the embedded receipt for what would
    /// have happened.
    Mocked(MockReceipt),
}

/// Adapter for the chat notification integration (§6).
pub struct ChatAdapter {
    state: CredentialState<ChatCredentials>,
    client: Option<Client>,
}

impl ChatAdapter {
    /// Builds an adapter from resolved credentials, constructing an HTTP
    /// client only when credentials are present.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError`] when the HTTP client cannot be built.
    pub fn new(state: CredentialState<ChatCredentials>, timeout_ms: u64) -> Result<Self, IntegrationError> {
        let client = match &state {
            CredentialState::Configured(_) => Some(build_client(timeout_ms)?),
            CredentialState::Mock => None,
        };
        Ok(Self { state, client })
    }

    fn post(&self, harness: &IntegrationHarness<'_>, kind: &str, message: &str) -> Result<ChatPostOutcome, IntegrationError> {
        match &self.state {
            CredentialState::Mock => {
                Ok(ChatPostOutcome::Mocked(MockReceipt::new(INTEGRATION_NAME, format!("{kind}: {message}"))))
            }
            CredentialState::Configured(creds) => {
                let client = self.client.as_ref().ok_or_else(|| IntegrationError::Call {
                    message: "chat adapter configured without an http client".to_string(),
                    retryable: false,
                })?;
                harness.call(INTEGRATION_NAME, |_attempt| {
                    let response = client
                        .post(format!("{CHAT_API_BASE}/{kind}"))
                        .bearer_auth(&creds.bot_token)
                        .json(&serde_json::json!({ "message": message, "channels": creds.channels }))
                        .send()
                        .map_err(|err| IntegrationError::Call { message: err.to_string(), retryable: true })?;
                    let status = response.status().as_u16();
                    if response.status().is_success() {
                        Ok(())
                    } else {
                        Err(IntegrationError::from_status(status, format!("chat post returned {status}")))
                    }
                })?;
                Ok(ChatPostOutcome::Delivered { channels: creds.channels.clone() })
            }
        }
    }

    /// Posts a structured triage/investigation notification.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError`] when the configured HTTP call fails.
    pub fn post_notification(&self, harness: &IntegrationHarness<'_>, message: &str) -> Result<ChatPostOutcome, IntegrationError> {
        self.post(harness, "notify", message)
    }

    /// Posts an approval request carrying `action_id` so the approval gate
    /// can correlate the eventual response (§4.9).
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError`] when the configured HTTP call fails.
    pub fn post_approval_request(
        &self,
        harness: &IntegrationHarness<'_>,
        action_id: &str,
        message: &str,
    ) -> Result<ChatPostOutcome, IntegrationError> {
        self.post(harness, "approval", &format!("[{action_id}] {message}"))
    }

    /// Posts a resolution notice.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError`] when the configured HTTP call fails.
    pub fn post_resolution(&self, harness: &IntegrationHarness<'_>, message: &str) -> Result<ChatPostOutcome, IntegrationError> {
        self.post(harness, "resolution", message)
    }

    /// Posts an escalation notice.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError`] when the configured HTTP call fails.
    pub fn post_escalation(&self, harness: &IntegrationHarness<'_>, message: &str) -> Result<ChatPostOutcome, IntegrationError> {
        self.post(harness, "escalation", message)
    }

    /// Verifies an inbound webhook signature against the configured signing
    /// secret using HMAC-style SHA-256 of `body` keyed by the secret.
    /// Always returns `true` in mock mode, since there is no real secret to
    /// check against.
    #[must_use]
    pub fn verify_signature(&self, body: &[u8], signature: &str) -> bool {
        match &self.state {
            CredentialState::Mock => true,
            CredentialState::Configured(creds) => {
                let mut hasher = Sha256::new();
                hasher.update(creds.signing_secret.as_bytes());
                hasher.update(body);
                let digest = hasher.finalize();
                let expected = digest.iter().fold(String::new(), |mut acc, byte| {
                    acc.push_str(&format!("{byte:02x}"));
                    acc
                });
                expected == signature
            }
        }
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
    fn mock_mode_never_reaches_the_network() {
        let adapter = ChatAdapter::new(CredentialState::Mock, 10_000).expect("adapter must build");
        let breaker = CircuitBreakerRegistry::new(BreakerConfig::default());
        let clock = SystemClock;
        let harness = IntegrationHarness::new(RetryConfig::default(), &breaker, &clock);
        let outcome = adapter.post_notification(&harness, "incident detected").expect("mock call cannot fail");
        assert!(matches!(outcome, ChatPostOutcome::Mocked(_)));
    }

    #[test]
    fn mock_mode_verifies_every_signature() {
        let adapter = ChatAdapter::new(CredentialState::Mock, 10_000).expect("adapter must build");
        assert!(adapter.verify_signature(b"payload", "anything"));
    }

    #[test]
    fn configured_mode_rejects_a_wrong_signature() {
        let creds = ChatCredentials {
            bot_token: "token".to_string(),
            signing_secret: "secret".to_string(),
            channels: vec!["soc".to_string()],
        };
        let adapter = ChatAdapter::new(CredentialState::Configured(creds), 10_000).expect("adapter must build");
        assert!(!adapter.verify_signature(b"payload", "not-the-right-hash"));
    }
}
