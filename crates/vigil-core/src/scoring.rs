// vigil-core/src/scoring.rs
// ============================================================================
// Module: Vigil Scoring
// Description: Pure priority scoring and disposition rule.
// Purpose: Turn raw alert signals into a priority score and a triage verdict.
// Dependencies: none (pure functions over plain data)
// ============================================================================

//! ## Overview
//! Scoring is deliberately side-effect free: every function here is a pure
//! transformation over its inputs so triage can be replayed deterministically
//! and the calibration invariants in the test suite stay meaningful. Nothing
//! in this module touches the clock, the network, or the document store.

use serde::Deserialize;
use serde::Serialize;

/// Normalized severity bucket for an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Critical severity.
    Critical,
    /// High severity.
    High,
    /// Medium severity.
    Medium,
    /// Low severity.
    Low,
    /// Severity label absent or not recognized.
    Unknown,
}

impl Severity {
    /// Returns the scoring weight for this severity bucket.
    #[must_use]
    pub const fn weight(self) -> f64 {
        match self {
            Self::Critical => 1.0,
            Self::High => 0.8,
            Self::Medium | Self::Unknown => 0.5,
            Self::Low => 0.2,
        }
    }

    /// Parses a free-text severity label, defaulting to [`Severity::Unknown`].
    #[must_use]
    pub fn parse(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "critical" => Self::Critical,
            "high" => Self::High,
            "medium" => Self::Medium,
            "low" => Self::Low,
            _ => Self::Unknown,
        }
    }
}

/// Normalized criticality tier for an affected asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetCriticality {
    /// Tier-1: business-critical.
    Tier1,
    /// Tier-2: important but not critical.
    Tier2,
    /// Tier-3: low business impact.
    Tier3,
    /// Asset tier unknown.
    Unknown,
}

impl AssetCriticality {
    /// Returns the scoring weight for this criticality tier.
    #[must_use]
    pub const fn weight(self) -> f64 {
        match self {
            Self::Tier1 => 1.0,
            Self::Tier2 => 0.6,
            Self::Tier3 | Self::Unknown => 0.3,
        }
    }

    /// Parses a free-text tier label, defaulting to [`AssetCriticality::Unknown`].
    #[must_use]
    pub fn parse(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "tier-1" | "tier1" => Self::Tier1,
            "tier-2" | "tier2" => Self::Tier2,
            "tier-3" | "tier3" => Self::Tier3,
            _ => Self::Unknown,
        }
    }
}

/// Inputs to the priority-score formula (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringInputs {
    /// Normalized alert severity.
    pub severity: Severity,
    /// Normalized affected-asset criticality.
    pub asset_criticality: AssetCriticality,
    /// Raw risk signal from alert enrichment, expected `>= 0`.
    pub risk_signal: f64,
    /// Historical false-positive rate for the triggering rule, in `[0, 1]`.
    pub historical_fp_rate: f64,
}

/// Sigmoid steepness constant `k` used by the corroboration term.
pub const SIGMOID_K: f64 = 0.07;
/// Sigmoid midpoint `x₀` used by the corroboration term.
pub const SIGMOID_X0: f64 = 40.0;

/// Weight applied to the severity term.
pub const WEIGHT_SEVERITY: f64 = 0.30;
/// Weight applied to the asset-criticality term.
pub const WEIGHT_ASSET_CRITICALITY: f64 = 0.30;
/// Weight applied to the corroboration term.
pub const WEIGHT_CORROBORATION: f64 = 0.25;
/// Weight applied to the novelty (1 − historical FP rate) term.
pub const WEIGHT_NOVELTY: f64 = 0.15;

/// Computes the corroboration term `σ(k·(x − x₀))`, clamping negative risk
/// signals to zero before applying the sigmoid.
#[must_use]
pub fn corroboration(risk_signal: f64) -> f64 {
    let x = risk_signal.max(0.0);
    sigmoid(SIGMOID_K * (x - SIGMOID_X0))
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Computes the `priority_score` for a set of scoring inputs, rounded to four
/// decimal places.
#[must_use]
pub fn priority_score(inputs: &ScoringInputs) -> f64 {
    let severity = inputs.severity.weight();
    let criticality = inputs.asset_criticality.weight();
    let corroboration = corroboration(inputs.risk_signal);
    let fp_rate = inputs.historical_fp_rate.clamp(0.0, 1.0);
    let novelty = 1.0 - fp_rate;

    let score = WEIGHT_SEVERITY * severity
        + WEIGHT_ASSET_CRITICALITY * criticality
        + WEIGHT_CORROBORATION * corroboration
        + WEIGHT_NOVELTY * novelty;

    round_to_4_decimals(score)
}

fn round_to_4_decimals(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Triage disposition thresholds (§4.2, configurable).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringThresholds {
    /// Score at or above which an alert is escalated to `investigate`.
    pub investigate_threshold: f64,
    /// Score below which an alert is `suppress`ed.
    pub suppress_threshold: f64,
}

impl Default for ScoringThresholds {
    fn default() -> Self {
        Self { investigate_threshold: 0.7, suppress_threshold: 0.4 }
    }
}

/// Triage verdict produced by the disposition rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    /// Escalate to investigation.
    Investigate,
    /// Hold in a low-priority queue.
    Queue,
    /// Suppress without further action.
    Suppress,
}

/// Applies the disposition rule (§4.2) to a priority score.
#[must_use]
pub fn disposition(score: f64, thresholds: &ScoringThresholds) -> Disposition {
    if score >= thresholds.investigate_threshold {
        Disposition::Investigate
    } else if score < thresholds.suppress_threshold {
        Disposition::Suppress
    } else {
        Disposition::Queue
    }
}
