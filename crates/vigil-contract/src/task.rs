// vigil-contract/src/task.rs
// ============================================================================
// Module: Task Tag
// Description: The `task` discriminant that keys every envelope payload.
// Purpose: Replace the source's duck-typed dispatch with a closed tagged sum
//          (§4.1, REDESIGN FLAGS: "represent each request/response with a
//          tagged sum type keyed by `task`").
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

/// One of the six A2A tasks the router can dispatch (§4.1, §4.7 table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    /// Triage: score and classify a freshly detected alert.
    EnrichAndScore,
    /// Investigate an incident and produce a root-cause report.
    Investigate,
    /// Sweep the environment for related compromise.
    SweepEnvironment,
    /// Build a remediation plan from an investigation report.
    PlanRemediation,
    /// Execute a remediation plan's actions.
    ExecutePlan,
    /// Verify that a resolution actually holds.
    VerifyResolution,
}

impl Task {
    /// Returns the per-agent timeout for this task, in milliseconds (§4.7 table).
    #[must_use]
    pub const fn default_timeout_ms(self) -> u64 {
        match self {
            Self::EnrichAndScore => 10_000,
            Self::Investigate => 60_000,
            Self::SweepEnvironment => 90_000,
            Self::PlanRemediation => 45_000,
            Self::ExecutePlan => 300_000,
            Self::VerifyResolution => 120_000,
        }
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
    fn execute_plan_has_the_longest_default_timeout() {
        let longest = [
            Task::EnrichAndScore,
            Task::Investigate,
            Task::SweepEnvironment,
            Task::PlanRemediation,
            Task::ExecutePlan,
            Task::VerifyResolution,
        ]
        .into_iter()
        .max_by_key(Task::default_timeout_ms)
        .expect("non-empty literal array");
        assert_eq!(longest, Task::ExecutePlan);
    }
}
