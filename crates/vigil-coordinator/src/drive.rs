// vigil-coordinator/src/drive.rs
// ============================================================================
// Module: Drive Loop
// Description: Drives one claimed alert through the full incident pipeline,
//              from classification to a terminal state (§4.8, C8).
// Purpose: The single place that sequences every A2A call, state transition,
//          and persistence write a coordinator instance performs for one
//          incident.
// ============================================================================

use std::ops::ControlFlow;

use uuid::Uuid;
use vigil_broker::A2aRouter;
use vigil_broker::HandlerRegistry;
use vigil_config::VigilConfigFile;
use vigil_contract::AlertTrigger;
use vigil_contract::EnrichAndScoreRequest;
use vigil_contract::Envelope;
use vigil_contract::ExecutePlanRequest;
use vigil_contract::ExecutionStatus;
use vigil_contract::ExecutionSummary;
use vigil_contract::InvestigateRequest;
use vigil_contract::PlanRemediationRequest;
use vigil_contract::PlanResponse;
use vigil_contract::SweepEnvironmentRequest;
use vigil_contract::TriageResponse;
use vigil_contract::VerifyResolutionRequest;
use vigil_core::identifiers::ActionId;
use vigil_core::identifiers::AgentId;
use vigil_core::identifiers::AlertId;
use vigil_core::identifiers::AssetId;
use vigil_core::identifiers::CorrelationId;
use vigil_core::identifiers::IncidentId;
use vigil_core::identifiers::InvestigationId;
use vigil_core::model::Alert;
use vigil_core::model::ChangeCorrelation;
use vigil_core::model::ChangeCorrelationConfidence;
use vigil_core::model::Incident;
use vigil_core::model::IncidentType;
use vigil_core::model::InvestigationReport;
use vigil_core::model::RecommendedNext;
use vigil_core::model::RemediationPlan;
use vigil_core::model::ResolutionType;
use vigil_core::model::SuccessCriterion;
use vigil_core::model::ThreatScope;
use vigil_core::model::VerificationResult;
use vigil_core::scoring::Disposition;
use vigil_core::scoring::Severity;
use vigil_core::state_machine::IncidentStatus;
use vigil_core::state_machine::apply_transition;
use vigil_core::store::DocumentStore;
use vigil_core::store::StoreError;
use vigil_core::store::update_with_retry;
use vigil_core::time::Clock;
use vigil_providers::IntegrationHarness;
use vigil_providers::IntegrationSuite;
use vigil_providers::RetryConfig;

use crate::approval::ApprovalOutcome;
use crate::approval::ApprovalStatus;
use crate::approval::run_approval_gate;
use crate::claims::ALERTS_INDEX;
use crate::error::CoordinatorError;
use crate::wiring::agent_id;

/// Index incident documents live in (§6).
pub const INCIDENTS_INDEX: &str = "vigil-incidents";

/// Terminal disposition of one drive-loop run (§4.8).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriveOutcome {
    /// The incident reached `resolved` after a passing verification.
    Resolved(IncidentId),
    /// The incident reached `escalated`.
    Escalated(IncidentId),
    /// The alert was suppressed at triage; an incident was created only to
    /// carry the terminal record.
    Suppressed(IncidentId),
    /// The alert was queued at triage; no incident was created.
    Queued(AlertId),
}

/// Drives one claimed alert through the pipeline described in §4.8.
///
/// Holds only borrowed collaborators, mirroring how `vigil-broker`'s
/// [`A2aRouter`] and `vigil-providers`'s [`IntegrationHarness`] are built
/// fresh per call rather than owned long-term.
pub struct Drive<'a> {
    store: &'a dyn DocumentStore,
    clock: &'a dyn Clock,
    registry: &'a HandlerRegistry,
    suite: &'a IntegrationSuite,
    config: &'a VigilConfigFile,
}

impl<'a> Drive<'a> {
    /// Builds a drive loop over the shared store, clock, handler registry,
    /// integration suite, and tunables.
    #[must_use]
    pub const fn new(
        store: &'a dyn DocumentStore,
        clock: &'a dyn Clock,
        registry: &'a HandlerRegistry,
        suite: &'a IntegrationSuite,
        config: &'a VigilConfigFile,
    ) -> Self {
        Self { store, clock, registry, suite, config }
    }

    /// Drives `trigger`'s alert from classification through to a terminal
    /// disposition (§4.8 steps 1-10).
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError`] if the store, state machine, or an A2A
    /// call fails in a way the drive loop cannot route to `escalated` itself
    /// (a fatal error aborts the current attempt; the caller may re-claim the
    /// alert and retry).
    pub fn run(&self, trigger: AlertTrigger) -> Result<DriveOutcome, CoordinatorError> {
        let alert = self.fetch_alert(&trigger.alert_id)?;
        let triage = self.call_triage(&alert)?;

        match triage.disposition {
            Disposition::Suppress => {
                let incident_id = self.create_suppressed(&alert, triage.priority_score)?;
                return Ok(DriveOutcome::Suppressed(incident_id));
            }
            Disposition::Queue => {
                self.tag_queued(&alert)?;
                return Ok(DriveOutcome::Queued(alert.alert_id.clone()));
            }
            Disposition::Investigate => {}
        }

        let mut incident = self.create_incident(&alert, triage.priority_score)?;
        self.transition(&mut incident, IncidentStatus::Triaging)?;
        incident.record_agent(AgentId::new(agent_id::TRIAGE));
        self.persist(&incident)?;
        self.transition(&mut incident, IncidentStatus::Triaged)?;
        self.persist(&incident)?;

        let mut iteration: u32 = 1;
        let (mut report, mut scope) =
            match self.advance_through_investigation(&mut incident, &alert, iteration, None)? {
                ControlFlow::Break(()) => return Ok(DriveOutcome::Escalated(incident.incident_id.clone())),
                ControlFlow::Continue(pair) => pair,
            };

        loop {
            let plan = self.call_plan(&incident, &report, scope.as_ref())?;
            incident.remediation_plan = Some(plan.clone());
            self.persist(&incident)?;

            if plan.requires_approval {
                self.transition(&mut incident, IncidentStatus::AwaitingApproval)?;
                self.persist(&incident)?;

                let outcome = self.gate_plan_approval(&incident, &plan);
                if outcome.status != ApprovalStatus::Approved {
                    self.escalate(&mut incident, approval_escalation_reason(outcome.status))?;
                    return Ok(DriveOutcome::Escalated(incident.incident_id.clone()));
                }
            }

            self.transition(&mut incident, IncidentStatus::Executing)?;
            self.persist(&incident)?;

            let summary = self.call_execute(&incident, &plan)?;
            incident.record_agent(AgentId::new(agent_id::EXECUTOR));
            self.persist(&incident)?;

            if matches!(summary.status, ExecutionStatus::Failed) {
                self.escalate(&mut incident, "executor could not complete any plan action")?;
                return Ok(DriveOutcome::Escalated(incident.incident_id.clone()));
            }

            self.transition(&mut incident, IncidentStatus::Verifying)?;
            self.persist(&incident)?;

            let verification = self.call_verify(&incident, iteration, plan.success_criteria.clone())?;
            incident.verification_results.push(verification.clone());
            incident.record_agent(AgentId::new(agent_id::VERIFIER));
            self.persist(&incident)?;

            if verification.passed {
                self.resolve(&mut incident)?;
                return Ok(DriveOutcome::Resolved(incident.incident_id.clone()));
            }

            if incident.reflection_count >= self.config.reflection.max_reflection_count {
                self.escalate(&mut incident, "reflection budget exhausted")?;
                return Ok(DriveOutcome::Escalated(incident.incident_id.clone()));
            }

            incident.reflection_count += 1;
            self.transition(&mut incident, IncidentStatus::Reflecting)?;
            self.persist(&incident)?;
            iteration += 1;

            let previous_failure_analysis = verification.failure_analysis.clone();
            (report, scope) = match self.advance_through_investigation(
                &mut incident,
                &alert,
                iteration,
                previous_failure_analysis,
            )? {
                ControlFlow::Break(()) => return Ok(DriveOutcome::Escalated(incident.incident_id.clone())),
                ControlFlow::Continue(pair) => pair,
            };
        }
    }

    /// Advances `incident` from its pre-investigation status to `planning`,
    /// covering both the security path (investigator, optionally the threat
    /// hunter) and the operational shortcut that skips the investigator
    /// entirely when a sentinel-derived change correlation already explains
    /// the anomaly (§4.6 Investigator, operational path; §4.8 steps 4-5).
    ///
    /// Returns [`ControlFlow::Break`] once the incident has been escalated
    /// in place, and [`ControlFlow::Continue`] with the report (and optional
    /// threat scope) that should drive planning.
    fn advance_through_investigation(
        &self,
        incident: &mut Incident,
        alert: &Alert,
        iteration: u32,
        previous_failure_analysis: Option<String>,
    ) -> Result<ControlFlow<(), (InvestigationReport, Option<ThreatScope>)>, CoordinatorError> {
        if iteration == 1 && incident.incident_type == IncidentType::Operational {
            if let Some(report) = synthesize_operational_report(incident, alert, iteration) {
                self.transition(incident, IncidentStatus::Planning)?;
                incident.investigation_report = Some(report.clone());
                self.persist(incident)?;
                return Ok(ControlFlow::Continue((report, None)));
            }
        }

        self.transition(incident, IncidentStatus::Investigating)?;
        self.persist(incident)?;

        let report = self.call_investigate(incident, iteration, previous_failure_analysis)?;
        incident.record_agent(AgentId::new(agent_id::INVESTIGATOR));
        incident.investigation_report = Some(report.clone());
        self.persist(incident)?;

        match report.recommended_next {
            RecommendedNext::Escalate => {
                self.escalate(incident, "investigator recommended escalation")?;
                Ok(ControlFlow::Break(()))
            }
            RecommendedNext::ThreatHunt => {
                self.transition(incident, IncidentStatus::ThreatHunting)?;
                self.persist(incident)?;

                let seed_assets = report.blast_radius.iter().map(|entry| entry.asset.clone()).collect();
                let scope = self.call_threat_hunt(incident, seed_assets)?;
                incident.record_agent(AgentId::new(agent_id::THREAT_HUNTER));
                self.persist(incident)?;

                self.transition(incident, IncidentStatus::Planning)?;
                self.persist(incident)?;
                Ok(ControlFlow::Continue((report, Some(scope))))
            }
            RecommendedNext::PlanRemediation => {
                self.transition(incident, IncidentStatus::Planning)?;
                self.persist(incident)?;
                Ok(ControlFlow::Continue((report, None)))
            }
        }
    }

    fn fetch_alert(&self, alert_id: &AlertId) -> Result<Alert, CoordinatorError> {
        let doc = self.store.get(ALERTS_INDEX, alert_id.as_str())?;
        serde_json::from_value(doc.source).map_err(|err| CoordinatorError::Store(StoreError::Serialization(err.to_string())))
    }

    fn call_triage(&self, alert: &Alert) -> Result<TriageResponse, CoordinatorError> {
        let router = A2aRouter::new(self.registry, self.store, self.clock);
        let envelope = Envelope::new(
            CorrelationId::from(alert.alert_id.clone()),
            AgentId::new(agent_id::COORDINATOR),
            AgentId::new(agent_id::TRIAGE),
            self.clock.now(),
            EnrichAndScoreRequest { alert: alert.clone() },
        );
        let response: Envelope<TriageResponse> = router.call(envelope)?;
        Ok(response.payload)
    }

    fn call_investigate(
        &self,
        incident: &Incident,
        iteration: u32,
        previous_failure_analysis: Option<String>,
    ) -> Result<InvestigationReport, CoordinatorError> {
        let router = A2aRouter::new(self.registry, self.store, self.clock);
        let envelope = Envelope::new(
            CorrelationId::from(incident.incident_id.clone()),
            AgentId::new(agent_id::COORDINATOR),
            AgentId::new(agent_id::INVESTIGATOR),
            self.clock.now(),
            InvestigateRequest { incident_id: incident.incident_id.clone(), iteration, previous_failure_analysis },
        );
        let response: Envelope<InvestigationReport> = router.call(envelope)?;
        Ok(response.payload)
    }

    fn call_threat_hunt(
        &self,
        incident: &Incident,
        seed_assets: Vec<AssetId>,
    ) -> Result<ThreatScope, CoordinatorError> {
        let router = A2aRouter::new(self.registry, self.store, self.clock);
        let envelope = Envelope::new(
            CorrelationId::from(incident.incident_id.clone()),
            AgentId::new(agent_id::COORDINATOR),
            AgentId::new(agent_id::THREAT_HUNTER),
            self.clock.now(),
            SweepEnvironmentRequest { incident_id: incident.incident_id.clone(), seed_assets },
        );
        let response: Envelope<ThreatScope> = router.call(envelope)?;
        Ok(response.payload)
    }

    fn call_plan(
        &self,
        incident: &Incident,
        report: &InvestigationReport,
        threat_scope: Option<&ThreatScope>,
    ) -> Result<RemediationPlan, CoordinatorError> {
        let router = A2aRouter::new(self.registry, self.store, self.clock);
        let envelope = Envelope::new(
            CorrelationId::from(incident.incident_id.clone()),
            AgentId::new(agent_id::COORDINATOR),
            AgentId::new(agent_id::COMMANDER),
            self.clock.now(),
            PlanRemediationRequest {
                incident_id: incident.incident_id.clone(),
                investigation_report: report.clone(),
                threat_scope: threat_scope.cloned(),
            },
        );
        let response: Envelope<PlanResponse> = router.call(envelope)?;
        Ok(response.payload.plan)
    }

    fn call_execute(&self, incident: &Incident, plan: &RemediationPlan) -> Result<ExecutionSummary, CoordinatorError> {
        let router = A2aRouter::new(self.registry, self.store, self.clock);
        let envelope = Envelope::new(
            CorrelationId::from(incident.incident_id.clone()),
            AgentId::new(agent_id::COORDINATOR),
            AgentId::new(agent_id::EXECUTOR),
            self.clock.now(),
            ExecutePlanRequest { incident_id: incident.incident_id.clone(), plan: plan.clone() },
        );
        let response: Envelope<ExecutionSummary> = router.call(envelope)?;
        Ok(response.payload)
    }

    fn call_verify(
        &self,
        incident: &Incident,
        iteration: u32,
        success_criteria: Vec<SuccessCriterion>,
    ) -> Result<VerificationResult, CoordinatorError> {
        let router = A2aRouter::new(self.registry, self.store, self.clock);
        let envelope = Envelope::new(
            CorrelationId::from(incident.incident_id.clone()),
            AgentId::new(agent_id::COORDINATOR),
            AgentId::new(agent_id::VERIFIER),
            self.clock.now(),
            VerifyResolutionRequest { incident_id: incident.incident_id.clone(), iteration, success_criteria },
        );
        let response: Envelope<VerificationResult> = router.call(envelope)?;
        Ok(response.payload)
    }

    fn gate_plan_approval(&self, incident: &Incident, plan: &RemediationPlan) -> ApprovalOutcome {
        let harness = self.harness();
        let action = plan.actions.iter().find(|action| action.approval_required).or_else(|| plan.actions.first());
        let action_id = action.map_or_else(
            || ActionId::new(format!("{}-plan", incident.incident_id.as_str())),
            |action| action.action_id.clone(),
        );
        let message = plan_summary_message(incident, plan);

        run_approval_gate(
            self.store,
            self.clock,
            &self.suite.chat,
            &harness,
            &incident.incident_id,
            &action_id,
            &message,
            &self.config.approval_gate,
        )
    }

    fn harness(&self) -> IntegrationHarness<'a> {
        let retry = RetryConfig { base_delay_ms: self.config.harness.retry_base_ms, max_attempts: self.config.harness.max_retries };
        IntegrationHarness::new(retry, &self.suite.breaker, self.clock)
    }

    fn create_incident(&self, alert: &Alert, priority_score: f64) -> Result<Incident, CoordinatorError> {
        let now = self.clock.now();
        let incident_id = mint_incident_id(self.clock);
        let severity = Severity::parse(&alert.severity_label);
        let incident_type = alert.classify();
        let incident = Incident::new_detected(incident_id, incident_type, severity, priority_score, alert.alert_id.clone(), now);
        self.store.create(INCIDENTS_INDEX, incident.incident_id.as_str(), to_value(&incident)?)?;
        Ok(incident)
    }

    fn create_suppressed(&self, alert: &Alert, priority_score: f64) -> Result<IncidentId, CoordinatorError> {
        let mut incident = self.create_incident(alert, priority_score)?;
        self.transition(&mut incident, IncidentStatus::Triaging)?;
        self.persist(&incident)?;
        self.transition(&mut incident, IncidentStatus::Suppressed)?;
        incident.resolution_type = Some(ResolutionType::Suppressed);
        incident.resolved_at = Some(incident.updated_at);
        incident.timing_metrics = incident.compute_timing_metrics();
        self.persist(&incident)?;
        Ok(incident.incident_id)
    }

    fn tag_queued(&self, alert: &Alert) -> Result<(), CoordinatorError> {
        update_with_retry::<CoordinatorError>(self.store, ALERTS_INDEX, alert.alert_id.as_str(), |doc| {
            doc["enrichment"]["disposition"] = serde_json::json!("queue");
            Ok(())
        })?;
        Ok(())
    }

    fn escalate(&self, incident: &mut Incident, reason: &str) -> Result<(), CoordinatorError> {
        self.transition(incident, IncidentStatus::Escalated)?;
        incident.resolution_type = Some(ResolutionType::Escalated);
        incident.resolved_at = Some(incident.updated_at);
        incident.timing_metrics = incident.compute_timing_metrics();
        self.persist(incident)?;
        let harness = self.harness();
        let _ = self.suite.chat.post_escalation(&harness, &format!("incident {} escalated: {reason}", incident.incident_id));
        Ok(())
    }

    fn resolve(&self, incident: &mut Incident) -> Result<(), CoordinatorError> {
        incident.resolution_type = Some(ResolutionType::AutoResolved);
        incident.resolved_at = Some(incident.updated_at);
        incident.timing_metrics = incident.compute_timing_metrics();
        self.persist(incident)?;
        let harness = self.harness();
        let _ = self.suite.chat.post_resolution(&harness, &format!("incident {} resolved", incident.incident_id));
        Ok(())
    }

    fn transition(&self, incident: &mut Incident, to: IncidentStatus) -> Result<(), CoordinatorError> {
        let now = self.clock.now();
        apply_transition(incident.status, to, now, &mut incident.state_timestamps)?;
        incident.status = to;
        incident.updated_at = now;
        Ok(())
    }

    fn persist(&self, incident: &Incident) -> Result<(), CoordinatorError> {
        let snapshot = to_value(incident)?;
        update_with_retry::<CoordinatorError>(self.store, INCIDENTS_INDEX, incident.incident_id.as_str(), move |doc| {
            *doc = snapshot.clone();
            Ok(())
        })?;
        Ok(())
    }
}

/// Mints a fresh incident id in the `INC-YYYY-XXXXX` shape (§3). No format
/// validation is performed by [`IncidentId`] itself — minting is left to the
/// caller, so the shape is fixed here, once.
fn mint_incident_id(clock: &dyn Clock) -> IncidentId {
    let year = clock.now().format("%Y");
    let suffix = Uuid::new_v4().simple().to_string().to_ascii_uppercase();
    IncidentId::new(format!("INC-{year}-{}", &suffix[..5]))
}

fn to_value(value: &impl serde::Serialize) -> Result<serde_json::Value, CoordinatorError> {
    serde_json::to_value(value).map_err(|err| CoordinatorError::Store(StoreError::Serialization(err.to_string())))
}

/// Builds the synthetic investigation report for the operational shortcut
/// (§4.6 Investigator, operational path): when the alert already carries a
/// low-confidence change correlation in its own enrichment, the coordinator
/// skips the investigator entirely rather than routing through a handler
/// that is never registered for this synthetic report (mirrors the reserved,
/// currently-unused `vigil_broker::SENTINEL_TIMEOUT_MS` timeout slot).
fn synthesize_operational_report(incident: &Incident, alert: &Alert, iteration: u32) -> Option<InvestigationReport> {
    let raw = alert.enrichment.get("change_correlation")?;
    let change_correlation: ChangeCorrelation = serde_json::from_value(raw.clone()).ok()?;
    if change_correlation.confidence != Some(ChangeCorrelationConfidence::Low) {
        return None;
    }

    Some(InvestigationReport {
        investigation_id: InvestigationId::new(format!(
            "INV-{}-sentinel",
            incident.incident_id.as_str()
        )),
        incident_id: incident.incident_id.clone(),
        iteration,
        root_cause: "Sentinel-classified operational anomaly correlates with a recent low-confidence \
                     deployment; the investigator was skipped."
            .to_string(),
        attack_chain: Vec::new(),
        blast_radius: Vec::new(),
        threat_intel: None,
        change_correlation: Some(change_correlation),
        recommended_next: RecommendedNext::PlanRemediation,
    })
}

fn plan_summary_message(incident: &Incident, plan: &RemediationPlan) -> String {
    let actions: Vec<String> = plan
        .actions
        .iter()
        .map(|action| format!("{}. {} ({} on {})", action.order, action.description, action.target_system, action.target_asset))
        .collect();
    format!("incident {} remediation plan requires approval:\n{}", incident.incident_id, actions.join("\n"))
}

const fn approval_escalation_reason(status: ApprovalStatus) -> &'static str {
    match status {
        ApprovalStatus::Approved => "approval already granted",
        ApprovalStatus::Rejected => "approval request was rejected",
        ApprovalStatus::Timeout => "approval request timed out",
        ApprovalStatus::Error => "approval polling failed repeatedly",
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test fixtures use explicit asserts and unwraps for clarity."
    )]

    use std::collections::BTreeMap;
    use std::sync::Arc;

    use chrono::Utc;
    use serde_json::json;
    use vigil_agents::CommanderHandler;
    use vigil_agents::ExecutorHandler;
    use vigil_agents::InvestigatorHandler;
    use vigil_agents::ThreatHunterHandler;
    use vigil_agents::TriageHandler;
    use vigil_agents::VerifierHandler;
    use vigil_broker::HandlerRegistry;
    use vigil_broker::tools::ToolCatalog;
    use vigil_config::IntegrationCredentials;
    use vigil_config::VigilConfig;
    use vigil_core::identifiers::AlertId;
    use vigil_core::identifiers::RuleId;
    use vigil_core::scoring::ScoringThresholds;
    use vigil_core::store::InMemoryDocumentStore;
    use vigil_core::time::SystemClock;
    use vigil_providers::IntegrationSuite;
    use vigil_providers::RetryConfig as ProvidersRetryConfig;

    use super::*;

    fn seed_alert(store: &InMemoryDocumentStore, clock: &dyn Clock, alert_id: &str, rule_id: &str) {
        store
            .index(
                ALERTS_INDEX,
                Some(alert_id),
                json!({
                    "alert_id": alert_id,
                    "rule_id": rule_id,
                    "severity_label": "low",
                    "source": "10.0.0.5",
                    "destination": null,
                    "asset": "svc-checkout",
                    "enrichment": {},
                    "created_at": clock.now(),
                    "processed": false,
                }),
            )
            .expect("seed alert");
    }

    fn build_registry(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>, suite: Arc<IntegrationSuite>) -> HandlerRegistry {
        let thresholds = ScoringThresholds::default();
        let retry = ProvidersRetryConfig::default();
        let triage = TriageHandler::new(ToolCatalog::new(), Arc::clone(&store), Arc::clone(&clock), thresholds);
        let investigator = InvestigatorHandler::new(ToolCatalog::new(), Arc::clone(&store), Arc::clone(&clock));
        let threat_hunter = ThreatHunterHandler::new(ToolCatalog::new(), Arc::clone(&store), Arc::clone(&clock));
        let commander = CommanderHandler::new(ToolCatalog::new(), Arc::clone(&store), Arc::clone(&clock));
        let executor = ExecutorHandler::new(Arc::clone(&suite), Arc::clone(&store), Arc::clone(&clock), retry);
        let verifier = VerifierHandler::new(
            ToolCatalog::new(),
            store,
            clock,
            std::time::Duration::from_secs(0),
            vigil_core::model::DEFAULT_PASS_THRESHOLD,
        );

        HandlerRegistry::builder()
            .handler(agent_id::TRIAGE, triage, 10_000)
            .handler(agent_id::INVESTIGATOR, investigator, 10_000)
            .handler(agent_id::THREAT_HUNTER, threat_hunter, 10_000)
            .handler(agent_id::COMMANDER, commander, 10_000)
            .handler(agent_id::EXECUTOR, executor, 10_000)
            .handler(agent_id::VERIFIER, verifier, 10_000)
            .build()
    }

    #[test]
    fn mint_incident_id_has_the_inc_year_shape() {
        let clock = vigil_core::time::FixedClock::new(Utc::now());
        let id = mint_incident_id(&clock);
        let prefix = format!("INC-{}-", clock.now().format("%Y"));
        assert!(id.as_str().starts_with(&prefix), "{} must start with {prefix}", id.as_str());
        assert_eq!(id.as_str().len(), prefix.len() + 5);
    }

    #[test]
    fn low_priority_alert_is_queued_without_creating_an_incident() {
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new());
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let config = VigilConfig { file: VigilConfigFile::default(), credentials: IntegrationCredentials::from_env() };
        let suite = Arc::new(IntegrationSuite::from_config(&config).expect("suite builds in mock mode"));
        let registry = build_registry(Arc::clone(&store), Arc::clone(&clock), Arc::clone(&suite));

        // A severity=low, uncorroborated alert scores well under the suppress
        // threshold by itself; nudge it into the queue band with a touch of
        // risk signal recorded directly in enrichment.
        seed_alert(store.as_ref(), clock.as_ref(), "alrt-1", "geo-anomaly-login");
        update_with_retry::<std::convert::Infallible>(store.as_ref(), ALERTS_INDEX, "alrt-1", |doc| {
            doc["enrichment"]["risk_signal"] = json!(55.0);
            Ok(())
        })
        .expect("seed enrichment");

        let drive = Drive::new(store.as_ref(), clock.as_ref(), &registry, &suite, &config.file);
        let outcome = drive.run(AlertTrigger { alert_id: AlertId::new("alrt-1") }).expect("drive must not error");

        assert_eq!(outcome, DriveOutcome::Queued(AlertId::new("alrt-1")));
        assert!(store.count(INCIDENTS_INDEX, &json!({})).expect("count") == 0);
    }

    #[test]
    fn operational_shortcut_skips_the_investigator_and_reaches_planning() {
        let incident = Incident::new_detected(
            IncidentId::new("INC-2026-00001"),
            IncidentType::Operational,
            Severity::Low,
            0.5,
            AlertId::new("alrt-1"),
            Utc::now(),
        );
        let mut alert = Alert {
            alert_id: AlertId::new("alrt-1"),
            rule_id: RuleId::new("sentinel-deploy-regression"),
            severity_label: "low".to_string(),
            source: "10.0.0.5".to_string(),
            destination: None,
            asset: AssetId::new("svc-checkout"),
            enrichment: BTreeMap::new(),
            created_at: Utc::now(),
            processed: false,
        };
        alert.enrichment.insert(
            "change_correlation".to_string(),
            json!({
                "matched": true,
                "confidence": "low",
                "commit": "abc123",
                "author": "dev.lee",
                "time_gap_seconds": 900.0,
            }),
        );

        let report = synthesize_operational_report(&incident, &alert, 1).expect("shortcut must apply");
        assert_eq!(report.recommended_next, RecommendedNext::PlanRemediation);
        assert!(report.change_correlation.is_some());
    }

    #[test]
    fn high_confidence_change_correlation_does_not_take_the_shortcut() {
        let incident = Incident::new_detected(
            IncidentId::new("INC-2026-00001"),
            IncidentType::Operational,
            Severity::Low,
            0.5,
            AlertId::new("alrt-1"),
            Utc::now(),
        );
        let mut alert = Alert {
            alert_id: AlertId::new("alrt-1"),
            rule_id: RuleId::new("sentinel-deploy-regression"),
            severity_label: "low".to_string(),
            source: "10.0.0.5".to_string(),
            destination: None,
            asset: AssetId::new("svc-checkout"),
            enrichment: BTreeMap::new(),
            created_at: Utc::now(),
            processed: false,
        };
        alert.enrichment.insert(
            "change_correlation".to_string(),
            json!({ "matched": true, "confidence": "high", "commit": "abc123", "author": "dev.lee", "time_gap_seconds": 10.0 }),
        );

        assert!(synthesize_operational_report(&incident, &alert, 1).is_none());
    }
}
