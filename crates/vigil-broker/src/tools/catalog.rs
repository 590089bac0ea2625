// vigil-broker/src/tools/catalog.rs
// ============================================================================
// Module: Tool Catalog
// Description: Query and search tool definitions loaded by the executor (§4.3).
// Purpose: Give agent handlers a declared, parameter-checked surface over the
//          document store instead of ad hoc queries.
// ============================================================================

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::ToolError;

/// Declared parameter a query tool accepts (§4.3).
#[derive(Debug, Clone, PartialEq)]
pub struct ToolParam {
    /// Parameter name, referenced in the filter template as `?name`.
    pub name: String,
    /// Whether the caller must supply this parameter.
    pub required: bool,
}

impl ToolParam {
    /// Declares a required parameter.
    #[must_use]
    pub fn required(name: impl Into<String>) -> Self {
        Self { name: name.into(), required: true }
    }

    /// Declares an optional parameter.
    #[must_use]
    pub fn optional(name: impl Into<String>) -> Self {
        Self { name: name.into(), required: false }
    }
}

/// A parameterized analytics query over one index (§4.3).
///
/// `filter_template` is a JSON filter tree where string leaves of the form
/// `?name` are substituted with the caller's supplied parameter before the
/// query reaches the store, so no raw query text is ever assembled from
/// caller input.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryToolDefinition {
    /// Tool name, as agents refer to it.
    pub name: String,
    /// Index the query runs against.
    pub index: String,
    /// Declared parameters.
    pub params: Vec<ToolParam>,
    /// Filter template, with `?name` placeholders for each parameter.
    pub filter_template: Value,
    /// Columns projected from each matched document, in order.
    pub columns: Vec<String>,
    /// Maximum rows returned.
    pub size: usize,
}

impl QueryToolDefinition {
    /// Validates that every `?name` placeholder in `filter_template` has a
    /// matching entry in `params` (§4.3: malformed definition → `InvalidDefinition`).
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidDefinition`] if a placeholder names a
    /// parameter that was never declared.
    pub fn validate(&self) -> Result<(), ToolError> {
        let declared: std::collections::BTreeSet<&str> =
            self.params.iter().map(|p| p.name.as_str()).collect();
        for placeholder in placeholders_in(&self.filter_template) {
            if !declared.contains(placeholder.as_str()) {
                return Err(ToolError::InvalidDefinition {
                    tool: self.name.clone(),
                    reason: format!("placeholder `?{placeholder}` has no matching declared parameter"),
                });
            }
        }
        Ok(())
    }
}

/// The three search-tool flavors (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    /// Multi-match keyword search with an optional filter.
    Keyword,
    /// Keyword plus externally embedded vector similarity.
    Hybrid,
    /// Pure vector (k-nearest-neighbor) search.
    Knn,
}

/// A search tool definition (§4.3).
#[derive(Debug, Clone, PartialEq)]
pub struct SearchToolDefinition {
    /// Tool name, as agents refer to it.
    pub name: String,
    /// Index the search runs against.
    pub index: String,
    /// Which search flavor this tool implements.
    pub kind: SearchKind,
    /// Field searched for `keyword`/`hybrid` tools.
    pub text_field: Option<String>,
    /// Field holding the embedding vector for `hybrid`/`knn` tools.
    pub vector_field: Option<String>,
    /// Fields projected onto each result, alongside `_id` and `_score`.
    pub result_fields: Vec<String>,
    /// Minimum similarity score for `knn` tools.
    pub min_score: Option<f64>,
}

impl SearchToolDefinition {
    /// Validates that the fields required by `kind` are present (§4.3:
    /// "Hybrid requires `text_field` + `vector_field`... Knn requires
    /// `vector_field`").
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidDefinition`] if a required field is absent.
    pub fn validate(&self) -> Result<(), ToolError> {
        let missing = match self.kind {
            SearchKind::Keyword => self.text_field.is_none(),
            SearchKind::Hybrid => self.text_field.is_none() || self.vector_field.is_none(),
            SearchKind::Knn => self.vector_field.is_none(),
        };
        if missing {
            let kind = match self.kind {
                SearchKind::Keyword => "keyword",
                SearchKind::Hybrid => "hybrid",
                SearchKind::Knn => "knn",
            };
            return Err(ToolError::InvalidDefinition {
                tool: self.name.clone(),
                reason: format!("{kind} search tool is missing a required field"),
            });
        }
        Ok(())
    }
}

/// Every query and search tool an [`crate::tools::executor::ToolExecutor`] can dispatch to (§4.3).
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    query_tools: BTreeMap<String, QueryToolDefinition>,
    search_tools: BTreeMap<String, SearchToolDefinition>,
}

impl ToolCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a query tool.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidDefinition`] if `definition` is malformed.
    pub fn register_query(&mut self, definition: QueryToolDefinition) -> Result<(), ToolError> {
        definition.validate()?;
        self.query_tools.insert(definition.name.clone(), definition);
        Ok(())
    }

    /// Registers a search tool.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidDefinition`] if `definition` is malformed.
    pub fn register_search(&mut self, definition: SearchToolDefinition) -> Result<(), ToolError> {
        definition.validate()?;
        self.search_tools.insert(definition.name.clone(), definition);
        Ok(())
    }

    /// Looks up a query tool by name.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::ToolNotFound`] if no such tool is registered.
    pub fn query_tool(&self, name: &str) -> Result<&QueryToolDefinition, ToolError> {
        self.query_tools.get(name).ok_or_else(|| ToolError::ToolNotFound(name.to_string()))
    }

    /// Looks up a search tool by name.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::ToolNotFound`] if no such tool is registered.
    pub fn search_tool(&self, name: &str) -> Result<&SearchToolDefinition, ToolError> {
        self.search_tools.get(name).ok_or_else(|| ToolError::ToolNotFound(name.to_string()))
    }
}

/// Walks `value`, collecting the parameter names referenced by `?name`
/// string leaves (§4.3: "parses placeholders").
pub(crate) fn placeholders_in(value: &Value) -> Vec<String> {
    let mut found = Vec::new();
    collect_placeholders(value, &mut found);
    found
}

fn collect_placeholders(value: &Value, found: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            if let Some(name) = s.strip_prefix('?') {
                found.push(name.to_string());
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_placeholders(item, found)),
        Value::Object(fields) => fields.values().for_each(|item| collect_placeholders(item, found)),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test fixtures use explicit asserts and unwraps for clarity."
    )]

    use serde_json::json;

    use super::*;

    #[test]
    fn query_tool_with_undeclared_placeholder_fails_validation() {
        let definition = QueryToolDefinition {
            name: "open_incidents_by_asset".to_string(),
            index: "vigil-incidents".to_string(),
            params: vec![],
            filter_template: json!({ "asset": "?asset_id" }),
            columns: vec!["incident_id".to_string()],
            size: 50,
        };
        let err = definition.validate().expect_err("undeclared placeholder must fail");
        assert!(matches!(err, ToolError::InvalidDefinition { .. }));
    }

    #[test]
    fn query_tool_with_declared_placeholder_validates() {
        let definition = QueryToolDefinition {
            name: "open_incidents_by_asset".to_string(),
            index: "vigil-incidents".to_string(),
            params: vec![ToolParam::required("asset_id")],
            filter_template: json!({ "asset": "?asset_id" }),
            columns: vec!["incident_id".to_string()],
            size: 50,
        };
        assert!(definition.validate().is_ok());
    }

    #[test]
    fn hybrid_search_tool_requires_both_fields() {
        let definition = SearchToolDefinition {
            name: "related_incidents".to_string(),
            index: "vigil-incidents".to_string(),
            kind: SearchKind::Hybrid,
            text_field: Some("summary".to_string()),
            vector_field: None,
            result_fields: vec!["incident_id".to_string()],
            min_score: None,
        };
        let err = definition.validate().expect_err("hybrid without vector_field must fail");
        assert!(matches!(err, ToolError::InvalidDefinition { .. }));
    }

    #[test]
    fn unregistered_tool_is_not_found() {
        let catalog = ToolCatalog::new();
        assert!(matches!(catalog.query_tool("missing"), Err(ToolError::ToolNotFound(_))));
        assert!(matches!(catalog.search_tool("missing"), Err(ToolError::ToolNotFound(_))));
    }
}
