// vigil-coordinator/src/lib.rs
// ============================================================================
// Module: Coordinator Library
// Description: Public API surface for the Vigil coordinator.
// Purpose: Expose the alert watcher, approval gate, drive loop, and registry
//          wiring as one crate, atop its own interfaces module.
// Dependencies: crate::{approval, claims, drive, error, wiring}
// ============================================================================

//! ## Overview
//! The coordinator owns no business logic of its own beyond sequencing:
//! [`claims`] claims alerts off the shared store exactly once, [`drive`]
//! walks a claimed alert through triage, investigation, planning, execution,
//! and verification until it reaches a terminal incident status, and
//! [`approval`] blocks that walk on a human decision when a plan requires
//! one. [`wiring`] assembles the `vigil-broker` handler registry every drive
//! loop calls through.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod approval;
pub mod claims;
pub mod drive;
pub mod error;
pub mod wiring;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use approval::ApprovalOutcome;
pub use approval::ApprovalStatus;
pub use approval::run_approval_gate;
pub use claims::ALERTS_INDEX;
pub use claims::CLAIMS_INDEX;
pub use claims::DEFAULT_BATCH_SIZE;
pub use claims::PendingAlert;
pub use claims::claim_next_batch;
pub use claims::poll_unclaimed_alerts;
pub use claims::try_claim;
pub use drive::Drive;
pub use drive::DriveOutcome;
pub use drive::INCIDENTS_INDEX;
pub use error::CoordinatorError;
pub use wiring::build_registry;
