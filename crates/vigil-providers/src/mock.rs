// vigil-providers/src/mock.rs
// ============================================================================
// Module: Mock Mode
// Description: The no-op substitute every adapter falls back to when its
//              credentials are absent (§4.4).
// Purpose: Let a deployment missing one integration's credentials keep
//          running the rest of the pipeline for real.
// ============================================================================

//! ## Overview
//! "Mock mode is decided per-call; never globally" (§4.4): each adapter
//! checks its own [`vigil_config::CredentialState`] and, when absent,
//! returns a [`MockReceipt`] instead of reaching the network. The intended
//! effect is recorded on the receipt rather than emitted to a logger, so
//! callers (and tests) can assert on what would have happened.

/// Records that an adapter call ran in mock mode, and what it would have
/// done for real.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockReceipt {
    /// Integration name, e.g. `"chat"` or `"firewall"`.
    pub integration: String,
    /// Human-readable description of the effect that was skipped.
    pub intended_effect: String,
}

impl MockReceipt {
    /// Builds a mock receipt for `integration` describing `intended_effect`.
    #[must_use]
    pub fn new(integration: impl Into<String>, intended_effect: impl Into<String>) -> Self {
        Self { integration: integration.into(), intended_effect: intended_effect.into() }
    }
}
