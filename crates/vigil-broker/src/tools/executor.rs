// vigil-broker/src/tools/executor.rs
// ============================================================================
// Module: Tool Executor
// Description: The entry point agent handlers use to run a catalog tool
//              against the document store (§4.3).
// Purpose: Tie the catalog, query substitution, and search projection
//          together behind one call surface.
// ============================================================================

use std::collections::BTreeMap;

use serde_json::Value;
use vigil_core::store::DocumentStore;
use vigil_core::time::Clock;

use crate::error::ToolError;
use crate::tools::catalog::ToolCatalog;
use crate::tools::query;
use crate::tools::query::QueryResult;
use crate::tools::search;
use crate::tools::search::SearchToolResult;

/// Default page size for a search tool call that does not specify one.
pub const DEFAULT_SEARCH_SIZE: usize = 20;

/// Runs query and search tools from a [`ToolCatalog`] against a document
/// store (§4.3). Agent handlers hold one of these rather than talking to the
/// store directly, so every query is parameter-checked and schema-declared.
pub struct ToolExecutor<'a> {
    catalog: &'a ToolCatalog,
    store: &'a dyn DocumentStore,
    clock: &'a dyn Clock,
}

impl<'a> ToolExecutor<'a> {
    /// Builds an executor over `catalog`, running queries against `store`
    /// and timing them with `clock`.
    #[must_use]
    pub const fn new(catalog: &'a ToolCatalog, store: &'a dyn DocumentStore, clock: &'a dyn Clock) -> Self {
        Self { catalog, store, clock }
    }

    /// Runs the named query tool with `params` (§4.3).
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::ToolNotFound`] if `name` is not registered,
    /// [`ToolError::MissingParameter`] if a required parameter is absent, or
    /// [`ToolError::QueryFailed`] if the underlying store query fails.
    pub fn run_query(&self, name: &str, params: &BTreeMap<String, Value>) -> Result<QueryResult, ToolError> {
        let definition = self.catalog.query_tool(name)?;
        query::execute_query(definition, params, self.store, self.clock)
    }

    /// Runs the named search tool (§4.3).
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::ToolNotFound`] if `name` is not registered,
    /// [`ToolError::MissingParameter`] if `query_text` is required but
    /// absent, or [`ToolError::QueryFailed`] if the underlying store search
    /// fails.
    pub fn run_search(
        &self,
        name: &str,
        query_text: Option<&str>,
        filter: Option<Value>,
        size: Option<usize>,
    ) -> Result<SearchToolResult, ToolError> {
        let definition = self.catalog.search_tool(name)?;
        search::execute_search(
            definition,
            query_text,
            filter,
            size.unwrap_or(DEFAULT_SEARCH_SIZE),
            self.store,
            self.clock,
        )
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
    use vigil_core::store::InMemoryDocumentStore;
    use vigil_core::time::FixedClock;

    use super::*;
    use crate::tools::catalog::QueryToolDefinition;
    use crate::tools::catalog::SearchKind;
    use crate::tools::catalog::SearchToolDefinition;
    use crate::tools::catalog::ToolParam;

    fn catalog() -> ToolCatalog {
        let mut catalog = ToolCatalog::new();
        catalog
            .register_query(QueryToolDefinition {
                name: "open_incidents_by_asset".to_string(),
                index: "vigil-incidents".to_string(),
                params: vec![ToolParam::required("asset")],
                filter_template: json!({ "asset": "?asset" }),
                columns: vec!["incident_id".to_string()],
                size: 10,
            })
            .expect("valid definition");
        catalog
            .register_search(SearchToolDefinition {
                name: "related_incidents".to_string(),
                index: "vigil-incidents".to_string(),
                kind: SearchKind::Keyword,
                text_field: Some("summary".to_string()),
                vector_field: None,
                result_fields: vec!["incident_id".to_string()],
                min_score: None,
            })
            .expect("valid definition");
        catalog
    }

    #[test]
    fn run_query_against_an_unregistered_tool_is_not_found() {
        let catalog = catalog();
        let store = InMemoryDocumentStore::new();
        let clock = FixedClock::new(chrono::Utc::now());
        let executor = ToolExecutor::new(&catalog, &store, &clock);
        let err = executor.run_query("missing", &BTreeMap::new()).expect_err("must not be found");
        assert!(matches!(err, ToolError::ToolNotFound(_)));
    }

    #[test]
    fn run_query_projects_columns_from_matched_documents() {
        let catalog = catalog();
        let store = InMemoryDocumentStore::new();
        store
            .index("vigil-incidents", Some("INC-1"), json!({ "incident_id": "INC-1", "asset": "srv-1" }))
            .expect("seed document");
        let clock = FixedClock::new(chrono::Utc::now());
        let executor = ToolExecutor::new(&catalog, &store, &clock);

        let mut params = BTreeMap::new();
        params.insert("asset".to_string(), json!("srv-1"));
        let result = executor.run_query("open_incidents_by_asset", &params).expect("query must succeed");
        assert_eq!(result.values, vec![vec![json!("INC-1")]]);
    }

    #[test]
    fn run_search_uses_the_registered_definition() {
        let catalog = catalog();
        let store = InMemoryDocumentStore::new();
        store
            .index("vigil-incidents", Some("INC-1"), json!({ "incident_id": "INC-1", "summary": "beacon traffic" }))
            .expect("seed document");
        let clock = FixedClock::new(chrono::Utc::now());
        let executor = ToolExecutor::new(&catalog, &store, &clock);

        let result =
            executor.run_search("related_incidents", Some("beacon traffic"), None, None).expect("search must succeed");
        assert_eq!(result.total, 1);
    }
}
