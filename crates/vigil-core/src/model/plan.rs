// vigil-core/src/model/plan.rs
// ============================================================================
// Module: Remediation Plan
// Description: Plan and action shapes produced by the commander.
// Purpose: Canonical schema embedded in the incident document (§3, §4.6).
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::ActionId;
use crate::identifiers::AssetId;
use crate::identifiers::RunbookId;

/// The four action families the commander classifies steps into (§4.6),
/// in their dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Isolate or block; always ordered first.
    Containment,
    /// Fix the underlying condition; ordered second.
    Remediation,
    /// Notify stakeholders; ordered third.
    Communication,
    /// Record findings; ordered fourth.
    Documentation,
}

impl ActionType {
    /// Returns the 1-based dispatch rank for this action type (§4.6 Ordering).
    #[must_use]
    pub const fn order_rank(self) -> u32 {
        match self {
            Self::Containment => 1,
            Self::Remediation => 2,
            Self::Communication => 3,
            Self::Documentation => 4,
        }
    }
}

/// A rollback step attached to an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollbackStep {
    /// Description of the rollback action.
    pub description: String,
    /// System the rollback targets.
    pub target_system: String,
}

/// One step in a remediation plan (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanAction {
    /// Unique action identifier.
    pub action_id: ActionId,
    /// 1-based sequence position, assigned after ordering (§4.6).
    pub order: u32,
    /// Action family.
    pub action_type: ActionType,
    /// Human-readable description; the commander's dedup key uses its first
    /// word.
    pub description: String,
    /// System the action targets (e.g. `firewall`, `container-orchestrator`).
    pub target_system: String,
    /// Asset the action targets.
    pub target_asset: AssetId,
    /// Whether this action must clear the approval gate before execution.
    pub approval_required: bool,
    /// Rollback steps, if the action is reversible.
    #[serde(default)]
    pub rollback: Vec<RollbackStep>,
}

impl PlanAction {
    /// Returns the first whitespace-delimited word of the description,
    /// lowercased, used as part of the commander's dedup key (§4.6).
    #[must_use]
    pub fn first_word(&self) -> String {
        self.description
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase()
    }

    /// The dedup/uniqueness key from §4.6 and invariant P5:
    /// `(action_type, target_system, target_asset, first_word_of_description)`.
    #[must_use]
    pub fn dedup_key(&self) -> (ActionType, String, AssetId, String) {
        (self.action_type, self.target_system.clone(), self.target_asset.clone(), self.first_word())
    }
}

/// Comparison operator for a [`SuccessCriterion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonOperator {
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Equal.
    Eq,
}

impl ComparisonOperator {
    /// Evaluates `actual <op> threshold`.
    #[must_use]
    pub fn evaluate(self, actual: f64, threshold: f64) -> bool {
        match self {
            Self::Lt => actual < threshold,
            Self::Lte => actual <= threshold,
            Self::Gt => actual > threshold,
            Self::Gte => actual >= threshold,
            Self::Eq => (actual - threshold).abs() < f64::EPSILON,
        }
    }
}

/// A verifiable post-remediation health criterion (§4.6 Commander).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessCriterion {
    /// Metric name (`error_rate`, `avg_latency`, `throughput`, ...).
    pub metric: String,
    /// Comparison operator.
    pub operator: ComparisonOperator,
    /// Threshold the metric must satisfy.
    pub threshold: f64,
    /// Service the criterion applies to.
    pub service_name: String,
}

/// A remediation plan produced by the commander (§3, §4.6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemediationPlan {
    /// Ordered, deduplicated plan actions.
    pub actions: Vec<PlanAction>,
    /// Success criteria the verifier checks post-execution.
    pub success_criteria: Vec<SuccessCriterion>,
    /// True if any action in the plan requires approval.
    pub requires_approval: bool,
    /// Runbook the plan was primarily derived from, if any.
    pub runbook_used: Option<RunbookId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(action_type: ActionType, description: &str) -> PlanAction {
        PlanAction {
            action_id: ActionId::new("a1"),
            order: 0,
            action_type,
            description: description.to_string(),
            target_system: "firewall".to_string(),
            target_asset: AssetId::new("srv-1"),
            approval_required: false,
            rollback: Vec::new(),
        }
    }

    #[test]
    fn order_rank_matches_containment_first_documentation_last() {
        assert!(ActionType::Containment.order_rank() < ActionType::Remediation.order_rank());
        assert!(ActionType::Remediation.order_rank() < ActionType::Communication.order_rank());
        assert!(ActionType::Communication.order_rank() < ActionType::Documentation.order_rank());
    }

    #[test]
    fn first_word_is_lowercased() {
        let action = action(ActionType::Containment, "Block the offending IP address");
        assert_eq!(action.first_word(), "block");
    }

    #[test]
    fn dedup_key_distinguishes_on_all_four_components() {
        let a = action(ActionType::Containment, "Block offending traffic");
        let mut b = action(ActionType::Containment, "Block offending traffic");
        b.target_asset = AssetId::new("srv-2");
        assert_ne!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn comparison_operators_evaluate_correctly() {
        assert!(ComparisonOperator::Lte.evaluate(1.0, 1.0));
        assert!(!ComparisonOperator::Lt.evaluate(1.0, 1.0));
        assert!(ComparisonOperator::Gte.evaluate(80.0, 80.0));
    }
}
