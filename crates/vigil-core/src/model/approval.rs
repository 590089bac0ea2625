// vigil-core/src/model/approval.rs
// ============================================================================
// Module: Approval Response
// Description: Human decision recorded against a pending approval request.
// Purpose: Canonical schema for `vigil-approval-responses` documents (§3, §4.9).
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::ActionId;
use crate::identifiers::IncidentId;
use crate::time::Timestamp;

/// The raw value an approver may submit, before normalization (§4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalValue {
    /// Approve the pending action.
    Approve,
    /// Approved (alternate spelling accepted from the integration).
    Approved,
    /// Reject the pending action.
    Reject,
    /// Rejected (alternate spelling accepted from the integration).
    Rejected,
    /// Request more information; the gate keeps polling (§4.9, §9 open question).
    Info,
    /// More-information alias for [`ApprovalValue::Info`].
    MoreInfo,
}

/// The normalized decision a poll of the approval-responses index can yield.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizedApproval {
    /// `approve`/`approved` normalize here.
    Approve,
    /// `reject`/`rejected` normalize here.
    Reject,
    /// `info`/`more_info` normalize here; the gate continues polling without
    /// extending `timeout_minutes` (§9 open question decision).
    KeepPolling,
}

impl ApprovalValue {
    /// Normalizes the raw approver value (§4.9).
    #[must_use]
    pub const fn normalize(self) -> NormalizedApproval {
        match self {
            Self::Approve | Self::Approved => NormalizedApproval::Approve,
            Self::Reject | Self::Rejected => NormalizedApproval::Reject,
            Self::Info | Self::MoreInfo => NormalizedApproval::KeepPolling,
        }
    }
}

/// A human's response to a pending approval request (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalResponse {
    /// Incident the approval request belongs to.
    pub incident_id: IncidentId,
    /// Action awaiting approval.
    pub action_id: ActionId,
    /// The approver's raw decision.
    pub value: ApprovalValue,
    /// Identity of the approver.
    pub user: String,
    /// When the decision was recorded.
    pub timestamp: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_normalizes_to_keep_polling_not_timeout_extension() {
        assert_eq!(ApprovalValue::Info.normalize(), NormalizedApproval::KeepPolling);
        assert_eq!(ApprovalValue::MoreInfo.normalize(), NormalizedApproval::KeepPolling);
    }

    #[test]
    fn approve_and_approved_are_equivalent() {
        assert_eq!(ApprovalValue::Approve.normalize(), NormalizedApproval::Approve);
        assert_eq!(ApprovalValue::Approved.normalize(), NormalizedApproval::Approve);
    }
}
