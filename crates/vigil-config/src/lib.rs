// vigil-config/src/lib.rs
// ============================================================================
// Crate: vigil-config
// Description: Canonical configuration model for Vigil.
// Purpose: Single source of truth for vigil.toml semantics plus environment-
//          sourced integration credentials (§6, SPEC_FULL §11).
// Dependencies: vigil-core, serde, toml, thiserror
// ============================================================================

//! ## Overview
//! `vigil-config` loads and validates Vigil's runtime configuration: scoring
//! thresholds, approval-gate timing, the integration harness's timeout/retry/
//! circuit-breaker constants, and the verifier and reflection-loop tunables,
//! all with sane defaults applied when a config file is absent. Integration
//! credentials never live in the TOML file; they are resolved per-integration
//! from the environment into a [`CredentialState`], so a deployment missing
//! one credential group runs that integration in mock mode without affecting
//! the others.

pub mod config;

pub use config::ApprovalGateConfig;
pub use config::ChatCredentials;
pub use config::ConfigError;
pub use config::ContainerCredentials;
pub use config::CredentialState;
pub use config::FirewallCredentials;
pub use config::HarnessConfig;
pub use config::IdentityCredentials;
pub use config::IntegrationCredentials;
pub use config::PagingCredentials;
pub use config::ReflectionConfig;
pub use config::ScoringConfig;
pub use config::TicketingCredentials;
pub use config::VerifierConfig;
pub use config::VigilConfig;
pub use config::VigilConfigFile;
