// vigil-coordinator/src/error.rs
// ============================================================================
// Module: Coordinator Errors
// Description: The error surface of the drive loop, approval gate, and
//              alert watcher.
// Purpose: Mirror the §7 error taxonomy as a single exhaustive enum that
//          collects every sub-crate's error type behind one
//          `CoordinatorError`.
// ============================================================================

use thiserror::Error;
use vigil_broker::error::RouterError;
use vigil_contract::ContractValidationError;
use vigil_core::state_machine::StateMachineError;
use vigil_core::store::StoreError;

/// Errors raised while driving one incident through the pipeline, or while
/// running the alert watcher or approval gate (§7).
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// The document store failed for a reason other than a version conflict
    /// already absorbed by [`vigil_core::store::update_with_retry`].
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A requested state edge was not legal, or the incident was already
    /// terminal (§4.5). Fatal for the current attempt; the caller escalates.
    #[error(transparent)]
    StateMachine(#[from] StateMachineError),
    /// An A2A call failed after the router's retry-once policy was spent, or
    /// the target handler does not exist (`CardUnavailable`).
    #[error(transparent)]
    Router(#[from] RouterError),
    /// A request or response payload failed schema validation.
    #[error(transparent)]
    Contract(#[from] ContractValidationError),
    /// The CAS retry loop exhausted [`vigil_core::store::MAX_CAS_RETRIES`]
    /// attempts (§4.5's `ConcurrencyError`).
    #[error("exhausted compare-and-swap retries on {index}/{id}")]
    ConcurrencyExhausted {
        /// Index the mutation targeted.
        index: String,
        /// Document id the mutation targeted.
        id: String,
    },
    /// The incident has no document at the id the coordinator expected.
    #[error("incident {0} not found")]
    IncidentNotFound(String),
    /// The requested agent id has no registered handler.
    #[error("no handler registered for agent `{0}`")]
    CardUnavailable(String),
}

impl<E> From<vigil_core::store::RetryError<E>> for CoordinatorError
where
    E: Into<CoordinatorError>,
{
    fn from(value: vigil_core::store::RetryError<E>) -> Self {
        match value {
            vigil_core::store::RetryError::Mutation(mutation) => mutation.into(),
            vigil_core::store::RetryError::ConcurrencyExhausted { index, id, .. } => {
                Self::ConcurrencyExhausted { index, id }
            }
            vigil_core::store::RetryError::Store(err) => Self::Store(err),
        }
    }
}
