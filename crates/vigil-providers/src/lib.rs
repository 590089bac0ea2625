// vigil-providers/src/lib.rs
// ============================================================================
// Crate: vigil-providers
// Description: The integration harness (timeout/retry/circuit-breaker) and
//              the six external-system adapters it wraps (§4.4, §6).
// Purpose: Give every outbound call the same resilience policy and the same
//          per-call mock-mode fallback.
// Dependencies: vigil-core, vigil-config, reqwest, rand
// ============================================================================

//! ## Overview
//! `vigil-providers` is the only crate that reaches the network. Every
//! adapter here takes a [`vigil_config::CredentialState`] and decides mock
//! vs. real per call (§4.4); every real call goes through an
//! [`harness::IntegrationHarness`] backed by a
//! [`breaker::CircuitBreakerRegistry`] shared across the process.

pub mod breaker;
pub mod chat;
pub mod client;
pub mod container;
pub mod error;
pub mod firewall;
pub mod harness;
pub mod identity;
pub mod mock;
pub mod paging;
pub mod suite;
pub mod ticketing;

pub use breaker::BreakerConfig;
pub use breaker::BreakerState;
pub use breaker::CircuitBreakerRegistry;
pub use chat::ChatAdapter;
pub use chat::ChatPostOutcome;
pub use container::ContainerAdapter;
pub use container::DeploymentStatus;
pub use container::OrchestratorOutcome;
pub use error::IntegrationError;
pub use firewall::BlockOutcome;
pub use firewall::FirewallAdapter;
pub use firewall::FirewallRule;
pub use harness::IntegrationHarness;
pub use harness::RetryConfig;
pub use identity::IdentityAdapter;
pub use identity::IdentityRecord;
pub use identity::SuspensionOutcome;
pub use mock::MockReceipt;
pub use paging::PagingAdapter;
pub use paging::PagingOutcome;
pub use suite::IntegrationSuite;
pub use ticketing::TicketOutcome;
pub use ticketing::TicketRef;
pub use ticketing::TicketingAdapter;
