// vigil-agents/src/lib.rs
// ============================================================================
// Crate: vigil-agents
// Description: The six deterministic per-role agent handlers (§4.6).
// Purpose: Give the coordinator's A2A router a concrete
//          `vigil_broker::AgentHandler` for each of triage, investigator,
//          threat hunter, commander, executor, and verifier.
// Dependencies: vigil-core, vigil-contract, vigil-broker, vigil-providers,
//               serde, serde_json
// ============================================================================

//! ## Overview
//! Every handler here is deterministic given its inputs and the documents
//! already in the store: no handler consults wall-clock time directly
//! (always through a [`vigil_core::time::Clock`]) and no handler calls the
//! network directly except [`executor::ExecutorHandler`], which goes through
//! [`vigil_providers::suite::IntegrationSuite`]. Each handler implements
//! [`vigil_broker::registry::AgentHandler`] and is registered under its
//! canonical agent id by whoever wires the coordinator together.

pub mod commander;
pub mod executor;
pub mod investigator;
pub mod threat_hunter;
pub mod triage;
pub mod verifier;

pub use commander::CommanderHandler;
pub use executor::ExecutorHandler;
pub use investigator::InvestigatorHandler;
pub use threat_hunter::ThreatHunterHandler;
pub use triage::TriageHandler;
pub use verifier::VerifierHandler;
