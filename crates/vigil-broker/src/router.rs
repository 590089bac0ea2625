// vigil-broker/src/router.rs
// ============================================================================
// Module: A2A Router
// Description: Validates envelopes, dispatches to a registered handler,
//              enforces per-agent timeouts, retries transient failures once,
//              and records telemetry regardless of outcome (§4.7).
// Purpose: Replace the source's duck-typed agent dispatch with a closed,
//          schema-validated, reentrancy-safe delegation fabric.
// ============================================================================

//! ## Overview
//! [`A2aRouter::call`] is the one path every agent-to-agent delegation in
//! Vigil travels. It validates the request payload against the target
//! [`Task`]'s schema, runs the resolved handler on a tokio blocking task
//! bounded by the agent's registered timeout, retries exactly once on a
//! [`AgentError`] tagged retryable, validates the response payload, and
//! writes an [`AgentTelemetry`] record whether the call succeeded or not.
//! Telemetry writes are best-effort: a failure to record one is never
//! surfaced to the caller (§7 Propagation policy). A timed-out handler is
//! aborted rather than merely abandoned: [`invoke_once`] races the spawned
//! task against [`tokio::time::timeout`] and calls [`tokio::task::JoinHandle::abort`]
//! the moment the deadline fires, so a timed-out tool call cannot go on to
//! produce an orphaned side effect after the coordinator has already moved
//! past it (§5: "Cancellation & timeouts"). Because each call borrows only
//! shared (`&dyn`) state,
//! concurrent calls to distinct agents proceed in parallel with no shared
//! mutable state beyond what `store` and `clock` already serialize
//! internally (§4.7: "reentrancy-safe").

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rand::Rng as _;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use vigil_contract::ContractValidationError;
use vigil_contract::Envelope;
use vigil_contract::schemas;
use vigil_contract::task::Task;
use vigil_core::identifiers::AgentId;
use vigil_core::identifiers::CorrelationId;
use vigil_core::model::AgentTelemetry;
use vigil_core::model::TelemetryStatus;
use vigil_core::store::DocumentStore;
use vigil_core::time::Clock;

use crate::error::AgentError;
use crate::error::RouterError;
use crate::registry::AgentHandler;
use crate::registry::HandlerRegistry;

/// Index telemetry records are written to (§6).
const TELEMETRY_INDEX: &str = "vigil-agent-telemetry";

/// Base delay before the router's single retry attempt, in milliseconds
/// (§4.7: "retry once with jittered backoff").
const RETRY_BASE_DELAY_MS: u64 = 250;

/// Dispatches A2A calls to registered handlers (§4.7).
pub struct A2aRouter<'a> {
    registry: &'a HandlerRegistry,
    store: &'a dyn DocumentStore,
    clock: &'a dyn Clock,
}

impl<'a> A2aRouter<'a> {
    /// Builds a router over `registry`, recording telemetry to `store` and
    /// timing calls with `clock`.
    #[must_use]
    pub const fn new(registry: &'a HandlerRegistry, store: &'a dyn DocumentStore, clock: &'a dyn Clock) -> Self {
        Self { registry, store, clock }
    }

    /// Dispatches `envelope` to the handler registered for `envelope.to_agent`.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::CardUnavailable`] if no handler is registered,
    /// [`RouterError::AgentTimeout`] if the handler exceeds its per-agent
    /// timeout, [`RouterError::A2A`] if the handler fails (after the
    /// retry-once policy is spent), or [`RouterError::Contract`] if the
    /// request or response payload fails schema validation.
    pub fn call<Req, Resp>(&self, envelope: Envelope<Req>) -> Result<Envelope<Resp>, RouterError>
    where
        Req: Serialize + Send + 'static,
        Resp: DeserializeOwned,
    {
        let to_agent = envelope.to_agent.clone();
        let from_agent = envelope.from_agent.clone();
        let correlation_id = envelope.correlation_id.clone();

        let Some(handler) = self.registry.resolve(&to_agent) else {
            self.record_telemetry(&correlation_id, &from_agent, &to_agent, "unknown", 0, TelemetryStatus::CardUnavailable);
            return Err(RouterError::CardUnavailable(to_agent.into_inner()));
        };
        let task = handler.task();
        let label = task_label(task);

        let request_value = serde_json::to_value(&envelope.payload).map_err(ContractValidationError::from)?;
        if let Err(err) = schemas::validate(&schemas::request_schema_for(task), &request_value) {
            self.record_telemetry(&correlation_id, &from_agent, &to_agent, label, 0, TelemetryStatus::Error);
            return Err(RouterError::Contract(err));
        }

        let timeout_ms = self.registry.timeout_ms(&to_agent);
        let started = self.clock.now();
        let outcome = invoke_with_retry(&handler, request_value, timeout_ms);
        let elapsed_ms = u64::try_from((self.clock.now() - started).num_milliseconds()).unwrap_or(0);

        match outcome {
            Ok(response_value) => {
                if let Err(err) = schemas::validate(&schemas::response_schema_for(task), &response_value) {
                    self.record_telemetry(&correlation_id, &from_agent, &to_agent, label, elapsed_ms, TelemetryStatus::Error);
                    return Err(RouterError::Contract(err));
                }
                let payload: Resp = serde_json::from_value(response_value).map_err(ContractValidationError::from)?;
                self.record_telemetry(&correlation_id, &from_agent, &to_agent, label, elapsed_ms, TelemetryStatus::Success);
                Ok(Envelope::new(correlation_id, to_agent, from_agent, self.clock.now(), payload))
            }
            Err(CallOutcome::Timeout) => {
                self.record_telemetry(&correlation_id, &from_agent, &to_agent, label, elapsed_ms, TelemetryStatus::Timeout);
                Err(RouterError::AgentTimeout { agent: to_agent.into_inner(), timeout_ms })
            }
            Err(CallOutcome::Agent(source)) => {
                self.record_telemetry(&correlation_id, &from_agent, &to_agent, label, elapsed_ms, TelemetryStatus::Error);
                Err(RouterError::A2A { agent: to_agent.into_inner(), source })
            }
        }
    }

    fn record_telemetry(
        &self,
        correlation_id: &CorrelationId,
        from_agent: &AgentId,
        to_agent: &AgentId,
        task: &str,
        execution_time_ms: u64,
        status: TelemetryStatus,
    ) {
        let telemetry = AgentTelemetry {
            timestamp: self.clock.now(),
            from_agent: from_agent.clone(),
            to_agent: to_agent.clone(),
            correlation_id: correlation_id.clone(),
            task: task.to_string(),
            execution_time_ms,
            status,
        };
        if let Ok(doc) = serde_json::to_value(&telemetry) {
            let _ = self.store.index(TELEMETRY_INDEX, None, doc);
        }
    }
}

/// Outcome of a single handler invocation attempt, distinguishing a timeout
/// from a handler-reported error so the router can choose the right
/// telemetry status and error variant.
enum CallOutcome {
    Timeout,
    Agent(AgentError),
}

/// Invokes `handler` once, retrying exactly once more if the first attempt
/// fails with a retryable [`AgentError`] (§4.7: "on transient HTTP error
/// (429/5xx) retry once with jittered backoff"). A timeout is never retried:
/// the deadline already expired once.
fn invoke_with_retry(handler: &Arc<dyn AgentHandler>, request: Value, timeout_ms: u64) -> Result<Value, CallOutcome> {
    match invoke_once(handler, request.clone(), timeout_ms) {
        Err(CallOutcome::Agent(err)) if err.is_retryable() => {
            thread::sleep(Duration::from_millis(jittered_retry_delay_ms()));
            invoke_once(handler, request, timeout_ms)
        }
        other => other,
    }
}

/// Runs `handler.invoke` on a tokio blocking task bounded by `timeout_ms`,
/// aborting the task the instant the deadline fires so a slow handler cannot
/// keep running (and producing side effects) after the caller has already
/// moved on (§4.7; §5: "propagate an abort signal to in-flight tool
/// calls"). Each call builds its own single-threaded runtime: `A2aRouter` is
/// constructed fresh per drive step (see `vigil-coordinator::drive`) and this
/// keeps the router's public API synchronous without threading a shared
/// runtime handle through the whole coordinator.
fn invoke_once(handler: &Arc<dyn AgentHandler>, request: Value, timeout_ms: u64) -> Result<Value, CallOutcome> {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_time().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            return Err(CallOutcome::Agent(AgentError::Failed {
                message: format!("failed to start call runtime: {err}"),
                retryable: false,
            }));
        }
    };
    let handler = Arc::clone(handler);

    runtime.block_on(async move {
        let mut join = tokio::task::spawn_blocking(move || handler.invoke(request));
        match tokio::time::timeout(Duration::from_millis(timeout_ms), &mut join).await {
            Ok(Ok(result)) => result.map_err(CallOutcome::Agent),
            Ok(Err(join_err)) => Err(CallOutcome::Agent(AgentError::Failed {
                message: format!("handler task panicked: {join_err}"),
                retryable: false,
            })),
            Err(_elapsed) => {
                join.abort();
                Err(CallOutcome::Timeout)
            }
        }
    })
}

fn jittered_retry_delay_ms() -> u64 {
    RETRY_BASE_DELAY_MS / 2 + rand::thread_rng().gen_range(0..=RETRY_BASE_DELAY_MS)
}

/// The `task` string every envelope and telemetry record carries (§4.1).
const fn task_label(task: Task) -> &'static str {
    match task {
        Task::EnrichAndScore => "enrich_and_score",
        Task::Investigate => "investigate",
        Task::SweepEnvironment => "sweep_environment",
        Task::PlanRemediation => "plan_remediation",
        Task::ExecutePlan => "execute_plan",
        Task::VerifyResolution => "verify_resolution",
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test fixtures use explicit asserts and unwraps for clarity."
    )]

    use std::sync::atomic::AtomicU32;
    use std::sync::atomic::Ordering;

    use serde_json::json;
    use vigil_core::store::InMemoryDocumentStore;
    use vigil_core::store::SearchQuery;
    use vigil_core::time::FixedClock;

    use super::*;
    use crate::registry::HandlerRegistry;

    struct TriageStub;

    impl AgentHandler for TriageStub {
        fn task(&self) -> Task {
            Task::EnrichAndScore
        }

        fn invoke(&self, _request: Value) -> Result<Value, AgentError> {
            Ok(json!({ "priority_score": 0.9464, "disposition": "investigate" }))
        }
    }

    struct FlakyThenOkStub {
        attempts: AtomicU32,
    }

    impl AgentHandler for FlakyThenOkStub {
        fn task(&self) -> Task {
            Task::EnrichAndScore
        }

        fn invoke(&self, _request: Value) -> Result<Value, AgentError> {
            if self.attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(AgentError::Failed { message: "upstream 503".to_string(), retryable: true })
            } else {
                Ok(json!({ "priority_score": 0.5, "disposition": "queue" }))
            }
        }
    }

    struct SlowStub;

    impl AgentHandler for SlowStub {
        fn task(&self) -> Task {
            Task::EnrichAndScore
        }

        fn invoke(&self, _request: Value) -> Result<Value, AgentError> {
            thread::sleep(Duration::from_millis(50));
            Ok(json!({ "priority_score": 0.5, "disposition": "queue" }))
        }
    }

    fn triage_envelope() -> Envelope<vigil_contract::EnrichAndScoreRequest> {
        use std::collections::BTreeMap;

        use chrono::Utc;
        use vigil_core::model::Alert;

        let alert = Alert {
            alert_id: vigil_core::identifiers::AlertId::new("alert-1"),
            rule_id: vigil_core::identifiers::RuleId::new("geo-anomaly"),
            severity_label: "high".to_string(),
            source: "203.0.113.42".to_string(),
            destination: None,
            asset: vigil_core::identifiers::AssetId::new("srv-payment-01"),
            enrichment: BTreeMap::new(),
            created_at: Utc::now(),
            processed: false,
        };
        Envelope::new(
            CorrelationId::new("alert-1"),
            AgentId::new("coordinator"),
            AgentId::new("triage"),
            Utc::now(),
            vigil_contract::EnrichAndScoreRequest { alert },
        )
    }

    #[test]
    fn call_dispatches_to_the_registered_handler_and_records_telemetry() {
        let registry = HandlerRegistry::builder().handler("triage", TriageStub, 10_000).build();
        let store = InMemoryDocumentStore::new();
        let clock = FixedClock::new(chrono::Utc::now());
        let router = A2aRouter::new(&registry, &store, &clock);

        let response: Envelope<vigil_contract::TriageResponse> =
            router.call(triage_envelope()).expect("call must succeed");
        assert!((response.payload.priority_score - 0.9464).abs() < 1e-9);

        let telemetry = store.search(TELEMETRY_INDEX, &SearchQuery::match_all(10)).expect("search must succeed");
        assert_eq!(telemetry.total, 1);
        assert_eq!(telemetry.hits[0].source["status"], json!("success"));
    }

    #[test]
    fn unregistered_agent_is_card_unavailable() {
        let registry = HandlerRegistry::builder().build();
        let store = InMemoryDocumentStore::new();
        let clock = FixedClock::new(chrono::Utc::now());
        let router = A2aRouter::new(&registry, &store, &clock);

        let err = router
            .call::<_, vigil_contract::TriageResponse>(triage_envelope())
            .expect_err("no handler is registered");
        assert!(matches!(err, RouterError::CardUnavailable(agent) if agent == "triage"));
    }

    #[test]
    fn retryable_failure_is_retried_once_and_succeeds() {
        let registry = HandlerRegistry::builder()
            .handler("triage", FlakyThenOkStub { attempts: AtomicU32::new(0) }, 10_000)
            .build();
        let store = InMemoryDocumentStore::new();
        let clock = FixedClock::new(chrono::Utc::now());
        let router = A2aRouter::new(&registry, &store, &clock);

        let response: Envelope<vigil_contract::TriageResponse> =
            router.call(triage_envelope()).expect("retry must recover");
        assert_eq!(response.payload.disposition, vigil_core::scoring::Disposition::Queue);
    }

    #[test]
    fn handler_exceeding_timeout_reports_agent_timeout() {
        let registry = HandlerRegistry::builder().handler("triage", SlowStub, 5).build();
        let store = InMemoryDocumentStore::new();
        let clock = FixedClock::new(chrono::Utc::now());
        let router = A2aRouter::new(&registry, &store, &clock);

        let err = router
            .call::<_, vigil_contract::TriageResponse>(triage_envelope())
            .expect_err("5ms timeout must trip against a 50ms handler");
        assert!(matches!(err, RouterError::AgentTimeout { timeout_ms: 5, .. }));
    }

    #[test]
    fn concurrent_calls_to_distinct_agents_do_not_block_each_other() {
        let registry = HandlerRegistry::builder()
            .handler("triage", TriageStub, 10_000)
            .handler("investigator", TriageStub, 10_000)
            .build();
        let store = InMemoryDocumentStore::new();
        let clock = FixedClock::new(chrono::Utc::now());
        let router = A2aRouter::new(&registry, &store, &clock);

        std::thread::scope(|scope| {
            let router = &router;
            let handle_a = scope.spawn(move || router.call::<_, vigil_contract::TriageResponse>(triage_envelope()));
            let handle_b = scope.spawn(move || router.call::<_, vigil_contract::TriageResponse>(triage_envelope()));
            assert!(handle_a.join().expect("thread must not panic").is_ok());
            assert!(handle_b.join().expect("thread must not panic").is_ok());
        });
    }
}
