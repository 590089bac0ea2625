// vigil-contract/src/schemas.rs
// ============================================================================
// Module: Contract Schemas
// Description: JSON Schema builders and the validation entry point (§4.1, §7).
// Purpose: Give the A2A router a wire-boundary check before it trusts a
//          deserialized payload.
// ============================================================================

use jsonschema::Draft;
use jsonschema::Validator;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

use crate::error::ContractValidationError;
use crate::task::Task;

/// Compiles `schema` and validates `instance` against it (§7).
///
/// # Errors
///
/// Returns [`ContractValidationError::SchemaCompilation`] when `schema` is
/// itself malformed, or [`ContractValidationError::SchemaMismatch`] listing
/// every validation error when `instance` does not conform.
pub fn validate(schema: &Value, instance: &Value) -> Result<(), ContractValidationError> {
    let validator = compile(schema)?;
    let errors: Vec<String> = validator.iter_errors(instance).map(|err| err.to_string()).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ContractValidationError::SchemaMismatch(errors.join("; ")))
    }
}

/// Serializes `value` to JSON and validates it against `schema`.
///
/// # Errors
///
/// Returns [`ContractValidationError::Serialization`] if `value` cannot be
/// serialized, otherwise the errors [`validate`] can return.
pub fn validate_value<T: Serialize>(schema: &Value, value: &T) -> Result<(), ContractValidationError> {
    let instance = serde_json::to_value(value)?;
    validate(schema, &instance)
}

fn compile(schema: &Value) -> Result<Validator, ContractValidationError> {
    jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(schema)
        .map_err(|err| ContractValidationError::SchemaCompilation(err.to_string()))
}

/// Returns the JSON schema for a [`crate::Envelope`] whose `payload` is
/// validated separately once the `task` tag has been read (§4.1).
#[must_use]
pub fn envelope_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": "vigil://contract/schemas/envelope.schema.json",
        "title": "Vigil message envelope",
        "type": "object",
        "required": ["message_id", "correlation_id", "from_agent", "to_agent", "created_at", "payload"],
        "properties": {
            "message_id": schema_for_string("Envelope message identifier."),
            "correlation_id": schema_for_string("Incident or alert identifier this message correlates to."),
            "from_agent": schema_for_string("Sending agent identifier."),
            "to_agent": schema_for_string("Receiving agent identifier."),
            "created_at": schema_for_string("RFC 3339 timestamp."),
            "payload": { "description": "Task-specific request or response payload." }
        },
        "additionalProperties": false
    })
}

/// Returns the JSON schema for the request payload of `task` (§4.1).
#[must_use]
pub fn request_schema_for(task: Task) -> Value {
    match task {
        Task::EnrichAndScore => json!({
            "type": "object",
            "required": ["alert"],
            "properties": { "alert": { "type": "object" } },
            "additionalProperties": false
        }),
        Task::Investigate => json!({
            "type": "object",
            "required": ["incident_id", "iteration"],
            "properties": {
                "incident_id": schema_for_string("Incident identifier."),
                "iteration": { "type": "integer", "minimum": 1, "maximum": 3 },
                "previous_failure_analysis": {
                    "oneOf": [{ "type": "null" }, { "type": "string" }]
                }
            },
            "additionalProperties": false
        }),
        Task::SweepEnvironment => json!({
            "type": "object",
            "required": ["incident_id", "seed_assets"],
            "properties": {
                "incident_id": schema_for_string("Incident identifier."),
                "seed_assets": { "type": "array", "items": { "type": "string" } }
            },
            "additionalProperties": false
        }),
        Task::PlanRemediation => json!({
            "type": "object",
            "required": ["incident_id", "investigation_report"],
            "properties": {
                "incident_id": schema_for_string("Incident identifier."),
                "investigation_report": { "type": "object" },
                "threat_scope": { "oneOf": [{ "type": "null" }, { "type": "object" }] }
            },
            "additionalProperties": false
        }),
        Task::ExecutePlan => json!({
            "type": "object",
            "required": ["incident_id", "plan"],
            "properties": {
                "incident_id": schema_for_string("Incident identifier."),
                "plan": { "type": "object" }
            },
            "additionalProperties": false
        }),
        Task::VerifyResolution => json!({
            "type": "object",
            "required": ["incident_id", "iteration", "success_criteria"],
            "properties": {
                "incident_id": schema_for_string("Incident identifier."),
                "iteration": { "type": "integer", "minimum": 1, "maximum": 3 },
                "success_criteria": { "type": "array", "items": { "type": "object" } }
            },
            "additionalProperties": false
        }),
    }
}

/// Returns the JSON schema for the response payload of `task` (§4.1: "Each
/// response is validated against a schema before return").
#[must_use]
pub fn response_schema_for(task: Task) -> Value {
    match task {
        Task::EnrichAndScore => json!({
            "type": "object",
            "required": ["priority_score", "disposition"],
            "properties": {
                "priority_score": { "type": "number", "minimum": 0.0, "maximum": 1.0 },
                "disposition": { "enum": ["investigate", "queue", "suppress"] }
            },
            "additionalProperties": false
        }),
        Task::Investigate => json!({
            "type": "object",
            "required": ["investigation_id", "incident_id", "iteration", "root_cause", "attack_chain", "blast_radius", "recommended_next"],
            "properties": {
                "investigation_id": schema_for_string("Investigation identifier."),
                "incident_id": schema_for_string("Incident identifier."),
                "iteration": { "type": "integer", "minimum": 1 },
                "root_cause": { "type": "string" },
                "attack_chain": { "type": "array" },
                "blast_radius": { "type": "array" },
                "threat_intel": { "oneOf": [{ "type": "null" }, { "type": "array" }] },
                "change_correlation": { "oneOf": [{ "type": "null" }, { "type": "object" }] },
                "recommended_next": { "enum": ["threat_hunt", "plan_remediation", "escalate"] }
            }
        }),
        Task::SweepEnvironment => json!({
            "type": "object",
            "required": ["confirmed_compromised", "suspected_compromised", "total_assets_scanned", "clean_assets"],
            "properties": {
                "confirmed_compromised": { "type": "array" },
                "suspected_compromised": { "type": "array" },
                "total_assets_scanned": { "type": "integer", "minimum": 0 },
                "clean_assets": { "type": "integer", "minimum": 0 }
            }
        }),
        Task::PlanRemediation => json!({
            "type": "object",
            "required": ["plan"],
            "properties": { "plan": { "type": "object" } },
            "additionalProperties": false
        }),
        Task::ExecutePlan => json!({
            "type": "object",
            "required": ["status", "actions_completed", "actions_failed", "action_results"],
            "properties": {
                "status": { "enum": ["completed", "partial_failure", "failed"] },
                "actions_completed": { "type": "integer", "minimum": 0 },
                "actions_failed": { "type": "integer", "minimum": 0 },
                "action_results": { "type": "array" }
            }
        }),
        Task::VerifyResolution => json!({
            "type": "object",
            "required": ["iteration", "health_score", "passed", "criteria", "timestamp"],
            "properties": {
                "iteration": { "type": "integer", "minimum": 1 },
                "health_score": { "type": "number", "minimum": 0.0, "maximum": 1.0 },
                "passed": { "type": "boolean" },
                "criteria": { "type": "array" },
                "failure_analysis": { "oneOf": [{ "type": "null" }, { "type": "string" }] },
                "timestamp": schema_for_string("RFC 3339 timestamp.")
            }
        }),
    }
}

fn schema_for_string(description: &str) -> Value {
    json!({ "type": "string", "description": description })
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
    fn envelope_schema_compiles() {
        compile(&envelope_schema()).expect("envelope schema must compile");
    }

    #[test]
    fn investigate_request_rejects_iteration_zero() {
        let schema = request_schema_for(Task::Investigate);
        let instance = json!({
            "incident_id": "INC-2026-00001",
            "iteration": 0,
            "previous_failure_analysis": null
        });
        assert!(validate(&schema, &instance).is_err());
    }

    #[test]
    fn investigate_request_accepts_valid_instance() {
        let schema = request_schema_for(Task::Investigate);
        let instance = json!({
            "incident_id": "INC-2026-00001",
            "iteration": 1,
            "previous_failure_analysis": null
        });
        assert!(validate(&schema, &instance).is_ok());
    }

    #[test]
    fn every_response_schema_compiles() {
        for task in [
            Task::EnrichAndScore,
            Task::Investigate,
            Task::SweepEnvironment,
            Task::PlanRemediation,
            Task::ExecutePlan,
            Task::VerifyResolution,
        ] {
            compile(&response_schema_for(task)).expect("response schema must compile");
        }
    }

    #[test]
    fn enrich_and_score_response_rejects_out_of_range_score() {
        let schema = response_schema_for(Task::EnrichAndScore);
        let instance = json!({ "priority_score": 1.4, "disposition": "investigate" });
        assert!(validate(&schema, &instance).is_err());
    }
}
