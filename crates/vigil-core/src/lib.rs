// vigil-core/src/lib.rs
// ============================================================================
// Crate: vigil-core
// Description: Canonical Vigil types, pure scoring, state machine, and the
//              document-store interface every other Vigil crate programs
//              against.
// Purpose: Dependency-free foundation crate; no networking, no SQL, no CLI.
// Dependencies: chrono, serde, serde_json, sha2, thiserror
// ============================================================================

//! ## Overview
//! `vigil-core` holds the parts of Vigil that have no business talking to a
//! network or a database: identifiers, the data model (§3), the pure scoring
//! function (§4.2), the incident state machine (§4.5), canonical hashing for
//! audit integrity, a deterministic clock abstraction, and the
//! [`store::DocumentStore`] trait that the out-of-scope document store (§1)
//! is expected to implement. Everything downstream — `vigil-providers`,
//! `vigil-broker`, `vigil-agents`, `vigil-coordinator`, `vigil-store-sqlite`,
//! `vigil-cli` — depends on this crate, never the other way around.

pub mod hashing;
pub mod identifiers;
pub mod model;
pub mod scoring;
pub mod state_machine;
pub mod store;
pub mod time;

pub use hashing::hash_bytes;
pub use hashing::hash_canonical_json;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use identifiers::ActionId;
pub use identifiers::AgentId;
pub use identifiers::AlertId;
pub use identifiers::AssetId;
pub use identifiers::ClaimId;
pub use identifiers::CorrelationId;
pub use identifiers::IncidentId;
pub use identifiers::InvestigationId;
pub use identifiers::MessageId;
pub use identifiers::RuleId;
pub use identifiers::RunbookId;
pub use identifiers::TicketId;
pub use scoring::disposition;
pub use scoring::priority_score;
pub use scoring::AssetCriticality;
pub use scoring::Disposition;
pub use scoring::ScoringInputs;
pub use scoring::ScoringThresholds;
pub use scoring::Severity;
pub use state_machine::apply_transition;
pub use state_machine::is_legal_transition;
pub use state_machine::IncidentStatus;
pub use state_machine::StateMachineError;
pub use state_machine::StateTimestamps;
pub use store::update_with_retry;
pub use store::DocumentStore;
pub use store::InMemoryDocumentStore;
pub use store::RetryError;
pub use store::StoreError;
pub use time::Clock;
pub use time::FixedClock;
pub use time::SystemClock;
pub use time::Timestamp;
