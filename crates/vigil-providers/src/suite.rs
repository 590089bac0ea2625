// vigil-providers/src/suite.rs
// ============================================================================
// Module: Integration Suite
// Description: Wires all six adapters and the shared breaker registry from
//              a loaded configuration (§6, SPEC_FULL §11).
// Purpose: One construction point the coordinator and executor share,
//          instead of each wiring adapters by hand.
// ============================================================================

use vigil_config::VigilConfig;

use crate::breaker::BreakerConfig;
use crate::breaker::CircuitBreakerRegistry;
use crate::chat::ChatAdapter;
use crate::container::ContainerAdapter;
use crate::error::IntegrationError;
use crate::firewall::FirewallAdapter;
use crate::identity::IdentityAdapter;
use crate::paging::PagingAdapter;
use crate::ticketing::TicketingAdapter;

/// Every adapter the executor and coordinator can reach, plus the breaker
/// registry they share (§5's "circuit-breaker map ... mutated by all
/// workers").
pub struct IntegrationSuite {
    /// Chat notification adapter.
    pub chat: ChatAdapter,
    /// Ticketing adapter.
    pub ticketing: TicketingAdapter,
    /// Paging adapter.
    pub paging: PagingAdapter,
    /// Firewall adapter.
    pub firewall: FirewallAdapter,
    /// Identity adapter.
    pub identity: IdentityAdapter,
    /// Container orchestrator adapter.
    pub container: ContainerAdapter,
    /// Shared circuit-breaker registry, keyed by integration name.
    pub breaker: CircuitBreakerRegistry,
}

impl IntegrationSuite {
    /// Builds every adapter from `config`'s resolved credentials.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError`] when any adapter's HTTP client fails to
    /// build.
    pub fn from_config(config: &VigilConfig) -> Result<Self, IntegrationError> {
        let timeout_ms = config.file.harness.timeout_ms;
        let breaker_config = BreakerConfig {
            failure_threshold: config.file.harness.breaker_failure_threshold,
            reset_timeout_seconds: i64::try_from(config.file.harness.breaker_reset_timeout_seconds).unwrap_or(i64::MAX),
        };
        Ok(Self {
            chat: ChatAdapter::new(config.credentials.chat.clone(), timeout_ms)?,
            ticketing: TicketingAdapter::new(config.credentials.ticketing.clone(), timeout_ms)?,
            paging: PagingAdapter::new(config.credentials.paging.clone(), timeout_ms)?,
            firewall: FirewallAdapter::new(config.credentials.firewall.clone(), timeout_ms)?,
            identity: IdentityAdapter::new(config.credentials.identity.clone(), timeout_ms)?,
            container: ContainerAdapter::new(config.credentials.container.clone(), timeout_ms)?,
            breaker: CircuitBreakerRegistry::new(breaker_config),
        })
    }
}
