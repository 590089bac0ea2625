// vigil-providers/src/client.rs
// ============================================================================
// Module: Adapter HTTP Client
// Description: Shared blocking HTTP client construction for integration
//              adapters.
// Purpose: One place to apply the per-integration timeout (§4.4 layer 1)
//          and a consistent user agent.
// Dependencies: reqwest
// ============================================================================

use std::time::Duration;

use reqwest::blocking::Client;

use crate::error::IntegrationError;

/// Builds a blocking HTTP client with `timeout_ms` as its per-request
/// deadline (§4.4's timeout layer).
///
/// # Errors
///
/// Returns [`IntegrationError::Call`] when the underlying client cannot be
/// constructed.
pub fn build_client(timeout_ms: u64) -> Result<Client, IntegrationError> {
    Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .user_agent("vigil-soc-orchestrator/0.1")
        .build()
        .map_err(|err| IntegrationError::Call { message: format!("http client build failed: {err}"), retryable: false })
}
