// vigil-core/src/model/runbook.rs
// ============================================================================
// Module: Runbook
// Description: A stored playbook the commander matches and classifies into
//              plan actions (§3 Glossary, §4.6 Commander).
// Purpose: Canonical schema for `vigil-runbooks` documents; the commander
//          reads these through the tool executor, never writes them.
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::AssetId;
use crate::identifiers::RunbookId;

/// One untyped step in a runbook, before the commander classifies it into an
/// [`crate::model::plan::ActionType`] by text matching (§4.6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunbookStep {
    /// Free-text description the commander's classifier pattern-matches on.
    pub description: String,
    /// System the step targets (e.g. `firewall`, `container-orchestrator`).
    pub target_system: String,
    /// Asset the step targets.
    pub target_asset: AssetId,
    /// Declares this step always requires approval, independent of the
    /// commander's own approval rules (§4.6 Approval required, clause e).
    #[serde(default)]
    pub approval_required: bool,
    /// Rollback steps carried over verbatim onto the derived plan action.
    #[serde(default)]
    pub rollback: Vec<crate::model::plan::RollbackStep>,
}

/// A stored playbook for a class of incident (§3 Glossary).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Runbook {
    /// Unique runbook identifier.
    pub runbook_id: RunbookId,
    /// Steps in authoring order; the commander does not reorder these before
    /// classification, only after (§4.6 Ordering).
    pub steps: Vec<RunbookStep>,
}
