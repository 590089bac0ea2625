// vigil-agents/src/threat_hunter.rs
// ============================================================================
// Module: Threat Hunter Handler
// Description: Deterministic `sweep_environment` agent handler (§4.6 Threat
//              hunter).
// Purpose: Sweep the environment out from a set of seed assets, classifying
//          each into confirmed, suspected, or clean.
// ============================================================================

//! ## Overview
//! For every seed asset the hunter runs two independent query tools: an IoC
//! sweep over a 7-day window and a behavioral-anomaly score. An asset with
//! at least one IoC hit is confirmed compromised; absent that, an anomaly
//! score at or above [`SUSPECTED_ANOMALY_THRESHOLD`] marks it suspected;
//! otherwise it is clean. Rankings are sorted with the existing
//! [`vigil_core::model::ThreatScope::sort_rankings`] helper so the ordering
//! rule lives in one place.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use vigil_broker::tools::ToolCatalog;
use vigil_broker::tools::ToolExecutor;
use vigil_broker::AgentError;
use vigil_broker::AgentHandler;
use vigil_contract::payloads::SweepEnvironmentRequest;
use vigil_contract::task::Task;
use vigil_core::identifiers::AssetId;
use vigil_core::model::ConfirmedCompromise;
use vigil_core::model::SuspectedCompromise;
use vigil_core::model::ThreatScope;
use vigil_core::store::DocumentStore;
use vigil_core::time::Clock;

/// Query tool counting IoC hits for an asset over a 7-day window (§4.6).
pub const TOOL_IOC_SWEEP: &str = "ioc_sweep_7d";
/// Query tool returning a behavioral anomaly score for an asset.
pub const TOOL_BEHAVIORAL_ANOMALY: &str = "behavioral_anomaly";

/// Anomaly score at or above which a clean-of-IoCs asset is still flagged
/// suspected rather than clean (§4.6: "categorizes ... into confirmed,
/// suspected, clean").
pub const SUSPECTED_ANOMALY_THRESHOLD: f64 = 0.5;

/// The `sweep_environment` / threat hunter agent handler (§4.6 Threat hunter).
pub struct ThreatHunterHandler {
    catalog: ToolCatalog,
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
}

impl ThreatHunterHandler {
    /// Builds a threat hunter handler over `catalog`'s IoC and anomaly tools.
    #[must_use]
    pub fn new(catalog: ToolCatalog, store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self { catalog, store, clock }
    }

    fn classify(&self, seed_assets: &[AssetId]) -> ThreatScope {
        let executor = ToolExecutor::new(&self.catalog, self.store.as_ref(), self.clock.as_ref());

        let mut confirmed = Vec::new();
        let mut suspected = Vec::new();
        let mut clean_assets = 0;

        for asset in seed_assets {
            let hit_count = ioc_hit_count(&executor, asset.as_str());
            if hit_count > 0 {
                confirmed.push(ConfirmedCompromise { subject: asset.clone(), hit_count });
                continue;
            }

            let anomaly_score = anomaly_score(&executor, asset.as_str());
            if anomaly_score >= SUSPECTED_ANOMALY_THRESHOLD {
                suspected.push(SuspectedCompromise { subject: asset.clone(), anomaly_score });
            } else {
                clean_assets += 1;
            }
        }

        let mut scope = ThreatScope {
            confirmed_compromised: confirmed,
            suspected_compromised: suspected,
            total_assets_scanned: u32::try_from(seed_assets.len()).unwrap_or(u32::MAX),
            clean_assets,
        };
        scope.sort_rankings();
        scope
    }
}

fn ioc_hit_count(executor: &ToolExecutor<'_>, asset_id: &str) -> u32 {
    let mut params = BTreeMap::new();
    params.insert("asset_id".to_string(), Value::from(asset_id));
    executor
        .run_query(TOOL_IOC_SWEEP, &params)
        .map(|result| u32::try_from(result.values.len()).unwrap_or(u32::MAX))
        .unwrap_or(0)
}

fn anomaly_score(executor: &ToolExecutor<'_>, asset_id: &str) -> f64 {
    let mut params = BTreeMap::new();
    params.insert("asset_id".to_string(), Value::from(asset_id));
    executor
        .run_query(TOOL_BEHAVIORAL_ANOMALY, &params)
        .ok()
        .and_then(|result| {
            let index = result.columns.iter().position(|c| c == "anomaly_score")?;
            result.values.first()?.get(index)?.as_f64()
        })
        .unwrap_or(0.0)
}

impl AgentHandler for ThreatHunterHandler {
    fn task(&self) -> Task {
        Task::SweepEnvironment
    }

    fn invoke(&self, request: Value) -> Result<Value, AgentError> {
        let request: SweepEnvironmentRequest = serde_json::from_value(request)
            .map_err(|err| AgentError::Rejected(format!("malformed sweep_environment request: {err}")))?;

        if request.seed_assets.is_empty() {
            return Err(AgentError::Rejected("sweep_environment requires at least one seed asset".to_string()));
        }

        let scope = self.classify(&request.seed_assets);
        serde_json::to_value(scope).map_err(|err| AgentError::Rejected(format!("failed to serialize threat scope: {err}")))
    }
}
