// vigil-contract/src/error.rs
// ============================================================================
// Module: Contract Errors
// Description: Errors raised validating envelopes and payloads on the wire.
// Purpose: The one error type §7 calls `ContractValidationError`.
// ============================================================================

use thiserror::Error;

/// Raised when an envelope or payload fails schema validation (§7).
///
/// Fatal for the A2A call it was raised on; the caller escalates (§7
/// Propagation policy).
#[derive(Debug, Error)]
pub enum ContractValidationError {
    /// The schema document itself failed to compile.
    #[error("contract schema did not compile: {0}")]
    SchemaCompilation(String),
    /// The instance failed validation against its schema.
    #[error("payload failed schema validation: {0}")]
    SchemaMismatch(String),
    /// The envelope's `task` tag did not match the payload shape supplied.
    #[error("task tag `{task}` does not match payload shape")]
    TaskMismatch {
        /// The task tag that was declared.
        task: String,
    },
    /// The payload failed to serialize to JSON for validation.
    #[error("payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
