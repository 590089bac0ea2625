// vigil-contract/src/lib.rs
// ============================================================================
// Crate: vigil-contract
// Description: Typed A2A envelopes, request/response payload pairs, and
//              wire-boundary schema validation (§4.1).
// Purpose: Replace the source's duck-typed agent messages with a closed,
//          validated contract every agent handler and the A2A router agree on.
// Dependencies: vigil-core, serde, serde_json, jsonschema, thiserror, uuid
// ============================================================================

//! ## Overview
//! `vigil-contract` defines the one shape every A2A call travels in
//! ([`Envelope`]), the six typed request/response payload pairs (§4.1), and
//! the schema-validation entry point the router uses to reject malformed
//! payloads before they reach a handler (§7's `ContractValidationError`).

pub mod envelope;
pub mod error;
pub mod payloads;
pub mod schemas;
pub mod task;

pub use envelope::Envelope;
pub use error::ContractValidationError;
pub use payloads::ActionExecutionResult;
pub use payloads::AlertTrigger;
pub use payloads::EnrichAndScoreRequest;
pub use payloads::ExecutePlanRequest;
pub use payloads::ExecutionStatus;
pub use payloads::ExecutionSummary;
pub use payloads::InvestigateRequest;
pub use payloads::PlanRemediationRequest;
pub use payloads::PlanResponse;
pub use payloads::SweepEnvironmentRequest;
pub use payloads::TriageResponse;
pub use payloads::VerifyResolutionRequest;
pub use task::Task;
