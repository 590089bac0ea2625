// vigil-core/src/model/alert.rs
// ============================================================================
// Module: Alert
// Description: Ingested alert document shape.
// Purpose: Canonical schema for `vigil-alerts-*` documents (§3, §6).
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::identifiers::AlertId;
use crate::identifiers::AssetId;
use crate::identifiers::RuleId;
use crate::time::Timestamp;

/// An ingested security or operational alert (§3).
///
/// Claimed exactly once by the alert watcher (I: each alert is claimed at
/// most once); claim bookkeeping lives in `vigil-alert-claims`, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Unique alert identifier.
    pub alert_id: AlertId,
    /// Rule identifier that produced this alert.
    pub rule_id: RuleId,
    /// Original severity label as reported by the source system.
    pub severity_label: String,
    /// Source host or user.
    pub source: String,
    /// Destination host, if applicable.
    pub destination: Option<String>,
    /// Affected asset reference.
    pub asset: AssetId,
    /// Free-form enrichment attached by ingestion or by triage.
    #[serde(default)]
    pub enrichment: BTreeMap<String, Value>,
    /// When the alert was created.
    pub created_at: Timestamp,
    /// Set once the watcher has dispatched this alert to a coordinator.
    #[serde(default)]
    pub processed: bool,
}

impl Alert {
    /// Classifies the alert's incident type by rule-id prefix (§4.8 step 1):
    /// `sentinel-`, `anomaly-`, or `ops-` prefixes are operational; anything
    /// else is security.
    #[must_use]
    pub fn classify(&self) -> IncidentType {
        let rule = self.rule_id.as_str();
        if rule.starts_with("sentinel-") || rule.starts_with("anomaly-") || rule.starts_with("ops-") {
            IncidentType::Operational
        } else {
            IncidentType::Security
        }
    }
}

/// The two incident families the coordinator recognizes (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentType {
    /// A security incident (intrusion, compromise, policy violation).
    Security,
    /// An operational anomaly (deployment regression, infra fault).
    Operational,
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn sample_alert(rule_id: &str) -> Alert {
        Alert {
            alert_id: AlertId::new("alert-1"),
            rule_id: RuleId::new(rule_id),
            severity_label: "high".to_string(),
            source: "203.0.113.42".to_string(),
            destination: None,
            asset: AssetId::new("srv-payment-01"),
            enrichment: BTreeMap::new(),
            created_at: Utc::now(),
            processed: false,
        }
    }

    #[test]
    fn classifies_sentinel_rules_as_operational() {
        assert_eq!(sample_alert("sentinel-deploy-regression").classify(), IncidentType::Operational);
    }

    #[test]
    fn classifies_unprefixed_rules_as_security() {
        assert_eq!(sample_alert("geo-anomaly-login").classify(), IncidentType::Security);
    }
}
