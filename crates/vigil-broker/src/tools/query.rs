// vigil-broker/src/tools/query.rs
// ============================================================================
// Module: Query Tool Execution
// Description: Parameter substitution and execution for query tools (§4.3).
// Purpose: Turn a declared `QueryToolDefinition` plus caller-supplied
//          parameters into a columnar result, safely.
// ============================================================================

use std::collections::BTreeMap;

use serde_json::Value;
use vigil_core::store::DocumentStore;
use vigil_core::store::SearchQuery;
use vigil_core::time::Clock;

use crate::error::ToolError;
use crate::tools::catalog::QueryToolDefinition;

/// Columnar result of a query tool execution (§4.3).
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    /// Column names, in the order declared by the tool definition.
    pub columns: Vec<String>,
    /// Row values, one vector per matched document, aligned with `columns`.
    pub values: Vec<Vec<Value>>,
    /// Wall-clock time the query took, in milliseconds.
    pub took_ms: u64,
}

/// Executes `definition` against `store`, substituting `params` into its
/// filter template (§4.3).
///
/// # Errors
///
/// Returns [`ToolError::MissingParameter`] if a required parameter is
/// absent, or [`ToolError::QueryFailed`] if the underlying store query fails.
pub fn execute_query(
    definition: &QueryToolDefinition,
    params: &BTreeMap<String, Value>,
    store: &dyn DocumentStore,
    clock: &dyn Clock,
) -> Result<QueryResult, ToolError> {
    for param in &definition.params {
        if param.required && !params.contains_key(&param.name) {
            return Err(ToolError::MissingParameter {
                tool: definition.name.clone(),
                param: param.name.clone(),
            });
        }
    }

    let filter = substitute(&definition.filter_template, params);
    let started = clock.now();
    let results = store
        .search(&definition.index, &SearchQuery { filter, sort: Vec::new(), size: definition.size })
        .map_err(|err| ToolError::QueryFailed {
            tool: definition.name.clone(),
            message: err.to_string(),
            retryable: matches!(err, vigil_core::store::StoreError::Backend(_)),
        })?;
    let took_ms = u64::try_from((clock.now() - started).num_milliseconds()).unwrap_or(0);

    let values = results
        .hits
        .iter()
        .map(|hit| {
            definition.columns.iter().map(|column| hit.source.get(column).cloned().unwrap_or(Value::Null)).collect()
        })
        .collect();

    Ok(QueryResult { columns: definition.columns.clone(), values, took_ms })
}

/// Replaces every `?name` string leaf in `template` with the caller-supplied
/// value for `name`, leaving the placeholder untouched if `name` is an
/// optional parameter the caller omitted (§4.3: "substitutes safely").
fn substitute(template: &Value, params: &BTreeMap<String, Value>) -> Value {
    match template {
        Value::String(s) => s
            .strip_prefix('?')
            .and_then(|name| params.get(name))
            .cloned()
            .unwrap_or_else(|| template.clone()),
        Value::Array(items) => Value::Array(items.iter().map(|item| substitute(item, params)).collect()),
        Value::Object(fields) => Value::Object(
            fields.iter().map(|(key, value)| (key.clone(), substitute(value, params))).collect(),
        ),
        other => other.clone(),
    }
}
