// vigil-core/src/model/verification.rs
// ============================================================================
// Module: Verification Result
// Description: Output shape of the verifier agent.
// Purpose: Canonical schema appended to `verification_results` (§3, §4.6).
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::time::Timestamp;

/// Default passing threshold for `health_score` (§4.6 Verifier).
pub const DEFAULT_PASS_THRESHOLD: f64 = 0.8;

/// Result of checking one [`crate::model::plan::SuccessCriterion`] post-execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionActual {
    /// Metric name the criterion checked.
    pub metric: String,
    /// Observed value at verification time.
    pub actual: f64,
    /// Whether the criterion passed.
    pub passed: bool,
}

/// Output of one verifier attempt (§3, §4.6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Reflection iteration this verification belongs to.
    pub iteration: u32,
    /// Fraction of criteria that passed, in `[0, 1]`.
    pub health_score: f64,
    /// Whether `health_score` cleared the passing threshold.
    pub passed: bool,
    /// Per-criterion actual values.
    pub criteria: Vec<CriterionActual>,
    /// When verification completed.
    pub timestamp: Timestamp,
    /// Explanation of the shortfall; required when `!passed` (P6).
    pub failure_analysis: Option<String>,
}

impl VerificationResult {
    /// Builds a result from per-criterion pass/fail outcomes, computing
    /// `health_score` and `passed` and enforcing P6 (a failing result always
    /// carries a non-empty `failure_analysis`).
    #[must_use]
    pub fn from_criteria(
        iteration: u32,
        criteria: Vec<CriterionActual>,
        timestamp: Timestamp,
        pass_threshold: f64,
        failure_analysis: impl FnOnce() -> String,
    ) -> Self {
        let total = criteria.len().max(1);
        let passed_count = criteria.iter().filter(|c| c.passed).count();
        #[allow(clippy::cast_precision_loss, reason = "criteria counts are small, bounded by plan size")]
        let health_score = passed_count as f64 / total as f64;
        let passed = health_score >= pass_threshold;
        Self {
            iteration,
            health_score,
            passed,
            criteria,
            timestamp,
            failure_analysis: if passed { None } else { Some(failure_analysis()) },
        }
    }
}

/// Per-service verification inputs: the criteria to check, keyed by service.
pub type ServiceMetrics = BTreeMap<String, f64>;

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn failing_result_always_carries_failure_analysis() {
        let result = VerificationResult::from_criteria(
            1,
            vec![CriterionActual { metric: "error_rate".to_string(), actual: 5.0, passed: false }],
            Utc::now(),
            DEFAULT_PASS_THRESHOLD,
            || "error_rate exceeded threshold".to_string(),
        );
        assert!(!result.passed);
        assert!(result.failure_analysis.is_some());
    }

    #[test]
    fn passing_result_carries_no_failure_analysis() {
        let result = VerificationResult::from_criteria(
            1,
            vec![CriterionActual { metric: "error_rate".to_string(), actual: 0.1, passed: true }],
            Utc::now(),
            DEFAULT_PASS_THRESHOLD,
            || "unreachable".to_string(),
        );
        assert!(result.passed);
        assert!(result.failure_analysis.is_none());
    }

    #[test]
    fn health_score_below_threshold_fails_scenario_3() {
        let criteria = vec![
            CriterionActual { metric: "a".to_string(), actual: 0.0, passed: false },
            CriterionActual { metric: "b".to_string(), actual: 0.0, passed: false },
            CriterionActual { metric: "c".to_string(), actual: 1.0, passed: true },
        ];
        let result = VerificationResult::from_criteria(
            1,
            criteria,
            Utc::now(),
            DEFAULT_PASS_THRESHOLD,
            || "2 of 3 criteria failed".to_string(),
        );
        assert!((result.health_score - 0.333_333).abs() < 0.001);
        assert!(!result.passed);
    }
}
