// vigil-core/src/identifiers.rs
// ============================================================================
// Module: Vigil Identifiers
// Description: Canonical opaque identifiers for incidents, alerts, and agents.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Identifiers are opaque, newtype string wrappers. They serialize as plain
//! strings so they slot directly into document-store fields. Validation of
//! format (e.g. the `INC-YYYY-XXXXX` shape) is left to whoever mints the id;
//! these wrappers only guarantee the value travels intact end to end.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the identifier, returning the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

identifier!(
    /// Alert identifier, unique per ingested alert document.
    AlertId
);
identifier!(
    /// Incident identifier in the `INC-YYYY-XXXXX` shape.
    IncidentId
);
identifier!(
    /// Investigation report identifier, unique per investigation attempt.
    InvestigationId
);
identifier!(
    /// Action identifier, unique within a remediation plan and its audit trail.
    ActionId
);
identifier!(
    /// Message identifier for an A2A envelope (a UUID in string form).
    MessageId
);
identifier!(
    /// Correlation identifier threading an incident or alert through telemetry.
    CorrelationId
);
identifier!(
    /// Asset identifier for an affected system or service.
    AssetId
);
identifier!(
    /// Rule identifier that produced an alert.
    RuleId
);
identifier!(
    /// Agent identifier used as a registry key in the A2A router.
    AgentId
);
identifier!(
    /// Ticketing-system ticket key.
    TicketId
);
identifier!(
    /// Runbook identifier referenced by the commander when planning.
    RunbookId
);
identifier!(
    /// Alert-claim identifier used for exactly-once ingestion.
    ClaimId
);

impl From<IncidentId> for CorrelationId {
    fn from(value: IncidentId) -> Self {
        Self::new(value.into_inner())
    }
}

impl From<AlertId> for CorrelationId {
    fn from(value: AlertId) -> Self {
        Self::new(value.into_inner())
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test fixtures use explicit asserts and unwraps for clarity."
    )]

    use super::*;

    #[test]
    fn round_trips_through_json() {
        let id = IncidentId::new("INC-2026-00042");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"INC-2026-00042\"");
        let back: IncidentId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);
    }

    #[test]
    fn correlation_id_from_incident_or_alert() {
        let incident = IncidentId::new("INC-2026-00042");
        let alert = AlertId::new("alert-9");
        assert_eq!(CorrelationId::from(incident.clone()).as_str(), incident.as_str());
        assert_eq!(CorrelationId::from(alert.clone()).as_str(), alert.as_str());
    }
}
