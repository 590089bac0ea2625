// vigil-core/src/model/threat_scope.rs
// ============================================================================
// Module: Threat Scope
// Description: Output shape of the threat-hunter agent.
// Purpose: Canonical schema for the optional, security-only sweep result
//          (§3, §4.6 Threat hunter).
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::AssetId;

/// A host or user flagged as confirmed compromised, ranked by hit count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmedCompromise {
    /// Asset or identity flagged.
    pub subject: AssetId,
    /// Number of corroborating hits (IoC matches, anomaly signals, ...).
    pub hit_count: u32,
}

/// A host or user flagged as suspected compromised, ranked by anomaly score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuspectedCompromise {
    /// Asset or identity flagged.
    pub subject: AssetId,
    /// Behavioral anomaly score, higher is more suspicious.
    pub anomaly_score: f64,
}

/// Result of sweeping the environment for indicators of compromise (§3, §4.6).
///
/// Optional and security-only: operational incidents never produce one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatScope {
    /// Subjects confirmed compromised, sorted by `hit_count` descending.
    pub confirmed_compromised: Vec<ConfirmedCompromise>,
    /// Subjects suspected compromised, sorted by `anomaly_score` descending.
    pub suspected_compromised: Vec<SuspectedCompromise>,
    /// Total number of assets scanned during the sweep.
    pub total_assets_scanned: u32,
    /// Assets scanned with no indicators found.
    pub clean_assets: u32,
}

impl ThreatScope {
    /// Sorts confirmed subjects by hit count (desc) and suspected subjects by
    /// anomaly score (desc), per §4.6's Threat hunter ordering rule.
    pub fn sort_rankings(&mut self) {
        self.confirmed_compromised.sort_by(|a, b| b.hit_count.cmp(&a.hit_count));
        self.suspected_compromised.sort_by(|a, b| {
            b.anomaly_score.partial_cmp(&a.anomaly_score).unwrap_or(std::cmp::Ordering::Equal)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_rankings_orders_both_lists_descending() {
        let mut scope = ThreatScope {
            confirmed_compromised: vec![
                ConfirmedCompromise { subject: AssetId::new("a"), hit_count: 2 },
                ConfirmedCompromise { subject: AssetId::new("b"), hit_count: 9 },
            ],
            suspected_compromised: vec![
                SuspectedCompromise { subject: AssetId::new("c"), anomaly_score: 0.2 },
                SuspectedCompromise { subject: AssetId::new("d"), anomaly_score: 0.8 },
            ],
            total_assets_scanned: 10,
            clean_assets: 8,
        };
        scope.sort_rankings();
        assert_eq!(scope.confirmed_compromised[0].subject.as_str(), "b");
        assert_eq!(scope.suspected_compromised[0].subject.as_str(), "d");
    }
}
