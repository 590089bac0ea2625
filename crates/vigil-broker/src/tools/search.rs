// vigil-broker/src/tools/search.rs
// ============================================================================
// Module: Search Tool Execution
// Description: Keyword/hybrid/knn search-tool execution (§4.3).
// Purpose: Project document-store hits onto a search tool's declared result
//          shape, regardless of which of the three flavors it is.
// ============================================================================

use serde_json::Value;
use serde_json::json;
use vigil_core::store::DocumentStore;
use vigil_core::store::SearchQuery;
use vigil_core::time::Clock;

use crate::error::ToolError;
use crate::tools::catalog::SearchKind;
use crate::tools::catalog::SearchToolDefinition;

/// Result of a search tool execution (§4.3).
#[derive(Debug, Clone, PartialEq)]
pub struct SearchToolResult {
    /// Matched documents, each projected to `result_fields` plus `_id` and
    /// `_score`.
    pub results: Vec<Value>,
    /// Total documents matching, before `size` truncation.
    pub total: usize,
    /// Wall-clock time the search took, in milliseconds.
    pub took_ms: u64,
}

/// Executes `definition` against `store`.
///
/// `query_text` is the caller's search text; required for `keyword` and
/// `hybrid` tools (§4.3: "Keyword wraps a multi-match"). `filter` is an
/// optional additional equality filter merged into the query. The document
/// store backing this workspace has no native vector index, so `hybrid` and
/// `knn` tools degrade to the same equality-filtered search as `keyword`
/// while still honoring `min_score` and `result_fields` (§9: persistence is
/// out of scope; callers see the declared result shape regardless of
/// backend).
///
/// # Errors
///
/// Returns [`ToolError::MissingParameter`] if `query_text` is required by
/// `definition.kind` but absent, or [`ToolError::QueryFailed`] if the
/// underlying store search fails.
pub fn execute_search(
    definition: &SearchToolDefinition,
    query_text: Option<&str>,
    filter: Option<Value>,
    size: usize,
    store: &dyn DocumentStore,
    clock: &dyn Clock,
) -> Result<SearchToolResult, ToolError> {
    let needs_text = matches!(definition.kind, SearchKind::Keyword | SearchKind::Hybrid);
    if needs_text && query_text.is_none() {
        let field = definition.text_field.clone().unwrap_or_default();
        return Err(ToolError::MissingParameter { tool: definition.name.clone(), param: field });
    }

    let mut query_filter = filter.unwrap_or_else(|| json!({}));
    if let (Some(text_field), Some(text)) = (&definition.text_field, query_text) {
        if let Value::Object(fields) = &mut query_filter {
            fields.insert(text_field.clone(), json!(text));
        }
    }

    let started = clock.now();
    let results = store
        .search(&definition.index, &SearchQuery { filter: query_filter, sort: Vec::new(), size })
        .map_err(|err| ToolError::QueryFailed {
            tool: definition.name.clone(),
            message: err.to_string(),
            retryable: matches!(err, vigil_core::store::StoreError::Backend(_)),
        })?;
    let took_ms = u64::try_from((clock.now() - started).num_milliseconds()).unwrap_or(0);

    let min_score = definition.min_score.unwrap_or(0.0);
    let results_out = results
        .hits
        .into_iter()
        .map(|hit| project(&definition.result_fields, &hit))
        .filter(|projected| projected["_score"].as_f64().unwrap_or(0.0) >= min_score)
        .collect();

    Ok(SearchToolResult { results: results_out, total: results.total, took_ms })
}

fn project(result_fields: &[String], hit: &vigil_core::store::SearchHit) -> Value {
    let mut projected = serde_json::Map::new();
    for field in result_fields {
        projected.insert(field.clone(), hit.source.get(field).cloned().unwrap_or(Value::Null));
    }
    projected.insert("_id".to_string(), json!(hit.id));
    // InMemoryDocumentStore has no relevance scoring; every hit scores 1.0.
    projected.insert("_score".to_string(), json!(1.0));
    Value::Object(projected)
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test fixtures use explicit asserts and unwraps for clarity."
    )]

    use serde_json::json;
    use vigil_core::store::InMemoryDocumentStore;
    use vigil_core::time::FixedClock;

    use super::*;

    fn keyword_definition() -> SearchToolDefinition {
        SearchToolDefinition {
            name: "related_incidents".to_string(),
            index: "vigil-incidents".to_string(),
            kind: SearchKind::Keyword,
            text_field: Some("summary".to_string()),
            vector_field: None,
            result_fields: vec!["incident_id".to_string()],
            min_score: None,
        }
    }

    #[test]
    fn keyword_search_without_query_text_is_missing_parameter() {
        let store = InMemoryDocumentStore::new();
        let clock = FixedClock::new(chrono::Utc::now());
        let err = execute_search(&keyword_definition(), None, None, 10, &store, &clock)
            .expect_err("keyword search requires query text");
        assert!(matches!(err, ToolError::MissingParameter { .. }));
    }

    #[test]
    fn keyword_search_projects_requested_fields_plus_id_and_score() {
        let store = InMemoryDocumentStore::new();
        store
            .index(
                "vigil-incidents",
                Some("INC-1"),
                json!({ "incident_id": "INC-1", "summary": "lateral movement detected" }),
            )
            .expect("seed document");
        let clock = FixedClock::new(chrono::Utc::now());

        let result = execute_search(
            &keyword_definition(),
            Some("lateral movement detected"),
            None,
            10,
            &store,
            &clock,
        )
        .expect("search must succeed");

        assert_eq!(result.total, 1);
        assert_eq!(result.results[0]["incident_id"], json!("INC-1"));
        assert_eq!(result.results[0]["_id"], json!("INC-1"));
        assert_eq!(result.results[0]["_score"], json!(1.0));
    }
}
