// vigil-contract/src/envelope.rs
// ============================================================================
// Module: Message Envelope
// Description: The generic envelope every A2A call is wrapped in.
// Purpose: Carry correlation metadata alongside a typed payload (§4.1).
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use vigil_core::identifiers::AgentId;
use vigil_core::identifiers::CorrelationId;
use vigil_core::identifiers::MessageId;
use vigil_core::time::Timestamp;

/// A message envelope carrying a typed payload between agents (§4.1).
///
/// `Envelope<T>` is the one shape every A2A call travels in, whether `T` is a
/// request payload the router dispatches on or a response payload a handler
/// returns. Correlation metadata lives outside `T` so routing and telemetry
/// never need to know the payload's shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Unique id for this message.
    pub message_id: MessageId,
    /// The incident id, or the alert id before an incident exists (§4.1).
    pub correlation_id: CorrelationId,
    /// Sending agent.
    pub from_agent: AgentId,
    /// Receiving agent.
    pub to_agent: AgentId,
    /// When the envelope was created.
    pub created_at: Timestamp,
    /// The typed payload.
    pub payload: T,
}

impl<T> Envelope<T> {
    /// Wraps `payload` in a new envelope with a freshly minted message id.
    #[must_use]
    pub fn new(
        correlation_id: CorrelationId,
        from_agent: AgentId,
        to_agent: AgentId,
        created_at: Timestamp,
        payload: T,
    ) -> Self {
        Self {
            message_id: MessageId::new(uuid::Uuid::new_v4().to_string()),
            correlation_id,
            from_agent,
            to_agent,
            created_at,
            payload,
        }
    }

    /// Maps the payload to a different type, preserving envelope metadata.
    pub fn map_payload<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        Envelope {
            message_id: self.message_id,
            correlation_id: self.correlation_id,
            from_agent: self.from_agent,
            to_agent: self.to_agent,
            created_at: self.created_at,
            payload: f(self.payload),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn map_payload_preserves_metadata() {
        let envelope = Envelope::new(
            CorrelationId::new("INC-2026-00001"),
            AgentId::new("triage"),
            AgentId::new("investigator"),
            Utc::now(),
            42_u32,
        );
        let message_id = envelope.message_id.clone();
        let mapped = envelope.map_payload(|n| n.to_string());
        assert_eq!(mapped.payload, "42");
        assert_eq!(mapped.message_id, message_id);
    }
}
