// vigil-providers/src/error.rs
// ============================================================================
// Module: Integration Errors
// Description: The error type every integration adapter call returns.
// Purpose: Carry a `retryable` flag so the harness can decide whether to
//          back off and retry or fail the call outright (§4.4).
// ============================================================================

use thiserror::Error;

/// Raised by an integration adapter or the harness wrapping it (§4.4).
#[derive(Debug, Error)]
pub enum IntegrationError {
    /// The per-attempt deadline elapsed before a response arrived.
    #[error("integration call timed out after {0}ms")]
    Timeout(u64),
    /// The adapter call failed; `retryable` mirrors whether this was an
    /// HTTP 429/5xx, a network reset, or another transient condition.
    #[error("integration call failed: {message}")]
    Call {
        /// Human-readable failure description.
        message: String,
        /// Whether the harness should retry this failure.
        retryable: bool,
    },
    /// The circuit breaker for this integration is open; the call was not
    /// attempted.
    #[error("circuit breaker open for integration `{0}`")]
    BreakerOpen(String),
}

impl IntegrationError {
    /// Whether the harness should retry the call that raised this error.
    #[must_use]
    pub const fn retryable(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Call { retryable, .. } => *retryable,
            Self::BreakerOpen(_) => false,
        }
    }

    /// Builds a [`IntegrationError::Call`] from an HTTP status code,
    /// classifying 429 and 5xx as retryable per §4.4.
    #[must_use]
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        Self::Call { message: message.into(), retryable: status == 429 || status >= 500 }
    }
}
