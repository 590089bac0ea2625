// vigil-core/src/model/investigation.rs
// ============================================================================
// Module: Investigation Report
// Description: Output shape of the investigator agent.
// Purpose: Canonical schema for `vigil-investigations` documents (§3, §4.6).
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::AssetId;
use crate::identifiers::IncidentId;
use crate::identifiers::InvestigationId;

/// One step in a reconstructed attack chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackStep {
    /// Ordinal position in the chain, starting at 1.
    pub order: u32,
    /// MITRE ATT&CK technique id (`T####`), if matched.
    pub technique_id: Option<String>,
    /// Human-readable description of the step.
    pub description: String,
}

/// One asset within the blast radius, with confidence of involvement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlastRadiusEntry {
    /// Affected asset.
    pub asset: AssetId,
    /// Confidence the asset is actually involved, in `[0, 1]`.
    pub confidence: f64,
}

/// An indicator-of-compromise match from threat intel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatIntelMatch {
    /// The indicator value (ip, hash, domain, etc.).
    pub indicator: String,
    /// Indicator kind (`ip`, `hash`, `domain`, ...).
    pub indicator_type: String,
    /// Source feed that reported the match.
    pub source: String,
}

/// Confidence that an operational anomaly correlates with a recent
/// deployment (§4.6 Investigator, operational path).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeCorrelationConfidence {
    /// Time gap under 300 seconds.
    High,
    /// Time gap between 300 and 600 seconds.
    Medium,
    /// Time gap over 600 seconds.
    Low,
}

impl ChangeCorrelationConfidence {
    /// Derives confidence from the observed time gap, in seconds (§4.6).
    #[must_use]
    pub fn from_time_gap_seconds(time_gap_seconds: f64) -> Self {
        if time_gap_seconds < 300.0 {
            Self::High
        } else if time_gap_seconds <= 600.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// Result of correlating an operational anomaly to a recent deployment event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeCorrelation {
    /// Whether a correlating deployment event was found.
    pub matched: bool,
    /// Confidence of the match, present only when `matched`.
    pub confidence: Option<ChangeCorrelationConfidence>,
    /// Commit SHA of the correlated deployment.
    pub commit: Option<String>,
    /// Author of the correlated deployment.
    pub author: Option<String>,
    /// Seconds between the deployment and the anomaly.
    pub time_gap_seconds: Option<f64>,
}

/// What the coordinator should do next, as decided by the investigator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedNext {
    /// Hand off to the threat hunter before planning.
    ThreatHunt,
    /// Go straight to the commander.
    PlanRemediation,
    /// Insufficient evidence; escalate to a human.
    Escalate,
}

/// Output of one investigation attempt (§3, §4.6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestigationReport {
    /// Unique investigation identifier.
    pub investigation_id: InvestigationId,
    /// Incident this report belongs to.
    pub incident_id: IncidentId,
    /// 1-based reflection iteration this report was produced on.
    pub iteration: u32,
    /// Root-cause narrative.
    pub root_cause: String,
    /// Reconstructed attack chain, ordered.
    #[serde(default)]
    pub attack_chain: Vec<AttackStep>,
    /// Assets plausibly affected, each with a confidence.
    #[serde(default)]
    pub blast_radius: Vec<BlastRadiusEntry>,
    /// Threat-intel indicator matches, if any.
    pub threat_intel: Option<Vec<ThreatIntelMatch>>,
    /// Change-correlation result for operational incidents.
    pub change_correlation: Option<ChangeCorrelation>,
    /// What the coordinator should do next.
    pub recommended_next: RecommendedNext,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_correlation_confidence_boundaries() {
        assert_eq!(ChangeCorrelationConfidence::from_time_gap_seconds(30.0), ChangeCorrelationConfidence::High);
        assert_eq!(
            ChangeCorrelationConfidence::from_time_gap_seconds(299.999),
            ChangeCorrelationConfidence::High
        );
        assert_eq!(ChangeCorrelationConfidence::from_time_gap_seconds(300.0), ChangeCorrelationConfidence::Medium);
        assert_eq!(ChangeCorrelationConfidence::from_time_gap_seconds(600.0), ChangeCorrelationConfidence::Medium);
        assert_eq!(ChangeCorrelationConfidence::from_time_gap_seconds(600.001), ChangeCorrelationConfidence::Low);
    }
}
