// vigil-core/src/store.rs
// ============================================================================
// Module: Vigil Document Store Interface
// Description: ES-like document store trait and an in-memory reference impl.
// Purpose: Give the coordinator, state machine, and CLI demo a uniform CRUD
//          + search surface with optimistic concurrency, independent of the
//          real backend.
// Dependencies: serde_json, thiserror
// ============================================================================

//! ## Overview
//! `vigil-core` does not implement a real document store; the production
//! backend is explicitly out of scope (§1). This module defines the
//! [`DocumentStore`] trait every coordinator and agent handler programs
//! against, plus [`InMemoryDocumentStore`], a reference implementation used
//! by unit tests and the CLI's `demo:all`/`run-scenario` commands.
//! `vigil-store-sqlite` provides a persistent alternative behind the same
//! trait.

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde_json::Value;
use thiserror::Error;

/// A document as stored, including its optimistic-concurrency coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    /// Document id, unique within its index.
    pub id: String,
    /// Sequence number, incremented on every write (`_seq_no`).
    pub seq_no: u64,
    /// Primary term, incremented on primary reassignment (`_primary_term`).
    pub primary_term: u64,
    /// The document body.
    pub source: Value,
}

/// Sort direction for a [`SearchQuery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Ascending order.
    Asc,
    /// Descending order.
    Desc,
}

/// A search request against one index.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// Filter predicate, interpreted as "field equals value" pairs.
    pub filter: Value,
    /// Sort keys, applied in order.
    pub sort: Vec<(String, SortOrder)>,
    /// Maximum number of hits to return.
    pub size: usize,
}

impl SearchQuery {
    /// Creates a query that matches every document, unsorted, capped at `size`.
    #[must_use]
    pub fn match_all(size: usize) -> Self {
        Self { filter: Value::Object(serde_json::Map::new()), sort: Vec::new(), size }
    }
}

/// One matched document from a [`DocumentStore::search`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Document id.
    pub id: String,
    /// Sequence number at the time of the read.
    pub seq_no: u64,
    /// Primary term at the time of the read.
    pub primary_term: u64,
    /// The document body.
    pub source: Value,
}

/// Results of a [`DocumentStore::search`] call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    /// Matched documents, already sorted and size-limited.
    pub hits: Vec<SearchHit>,
    /// Total number of documents matching the filter, before `size` truncation.
    pub total: usize,
}

/// A single operation in a [`DocumentStore::bulk`] request.
#[derive(Debug, Clone)]
pub enum BulkOperation {
    /// Index (create or overwrite) a document.
    Index {
        /// Target index.
        index: String,
        /// Document id; `None` lets the store mint one.
        id: Option<String>,
        /// Document body.
        doc: Value,
    },
    /// Delete a document by id.
    Delete {
        /// Target index.
        index: String,
        /// Document id.
        id: String,
    },
}

/// Per-operation outcome of a [`DocumentStore::bulk`] call.
#[derive(Debug, Clone)]
pub struct BulkItemResult {
    /// Document id the operation targeted.
    pub id: String,
    /// Error message, if this item failed; `None` on success.
    pub error: Option<String>,
}

/// Results of a [`DocumentStore::bulk`] call.
#[derive(Debug, Clone, Default)]
pub struct BulkResult {
    /// Per-item outcomes, in request order.
    pub items: Vec<BulkItemResult>,
}

impl BulkResult {
    /// Returns true if any item in the batch failed.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|item| item.error.is_some())
    }
}

/// Errors raised by a [`DocumentStore`] implementation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    /// No document exists at `(index, id)`.
    #[error("document not found: {index}/{id}")]
    NotFound {
        /// Index searched.
        index: String,
        /// Id searched.
        id: String,
    },
    /// The supplied `if_seq_no`/`if_primary_term` did not match the current
    /// document (HTTP 409 in an ES-like backend).
    #[error(
        "version conflict on {index}/{id}: expected seq_no={expected_seq_no} \
         primary_term={expected_primary_term}, actual seq_no={actual_seq_no} \
         primary_term={actual_primary_term}"
    )]
    VersionConflict {
        /// Index written to.
        index: String,
        /// Id written to.
        id: String,
        /// Sequence number the caller expected.
        expected_seq_no: u64,
        /// Primary term the caller expected.
        expected_primary_term: u64,
        /// Sequence number actually stored.
        actual_seq_no: u64,
        /// Primary term actually stored.
        actual_primary_term: u64,
    },
    /// A document already exists at `(index, id)`; raised by
    /// [`DocumentStore::create`], the conditional-create used for exactly-once
    /// alert claims (§5).
    #[error("document already exists: {index}/{id}")]
    AlreadyExists {
        /// Index written to.
        index: String,
        /// Id written to.
        id: String,
    },
    /// The document body could not be serialized or deserialized.
    #[error("document serialization failed: {0}")]
    Serialization(String),
    /// The backend itself failed (connection error, timeout, etc.).
    #[error("document store backend error: {0}")]
    Backend(String),
}

/// ES-like document store with optimistic concurrency.
///
/// Indices consumed (§6): `vigil-alerts-*`, `vigil-alert-claims`,
/// `vigil-incidents`, `vigil-investigations`, `vigil-actions-*`,
/// `vigil-agent-telemetry`, `vigil-approval-responses`, `vigil-runbooks`,
/// `vigil-assets`, `vigil-threat-intel`, `vigil-baselines`, `vigil-metrics-*`.
pub trait DocumentStore: Send + Sync {
    /// Fetches a document by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if absent, or a backend error.
    fn get(&self, index: &str, id: &str) -> Result<StoredDocument, StoreError>;

    /// Indexes (creates or overwrites) a document, minting an id when `id` is
    /// `None`.
    ///
    /// # Errors
    ///
    /// Returns a backend error on failure.
    fn index(&self, index: &str, id: Option<&str>, doc: Value) -> Result<StoredDocument, StoreError>;

    /// Creates a document at `(index, id)` only if absent, atomically with
    /// respect to every other `create` call on the same store (§5's
    /// "conditional create" the alert watcher uses for exactly-once claims).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyExists`] if a document is already stored
    /// at `(index, id)`, or a backend error.
    fn create(&self, index: &str, id: &str, doc: Value) -> Result<StoredDocument, StoreError>;

    /// Updates a document under optimistic concurrency control.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::VersionConflict`] if `if_seq_no`/`if_primary_term`
    /// do not match the current document, [`StoreError::NotFound`] if absent,
    /// or a backend error.
    fn update(
        &self,
        index: &str,
        id: &str,
        doc: Value,
        if_seq_no: u64,
        if_primary_term: u64,
    ) -> Result<StoredDocument, StoreError>;

    /// Searches an index.
    ///
    /// # Errors
    ///
    /// Returns a backend error on failure.
    fn search(&self, index: &str, query: &SearchQuery) -> Result<SearchResults, StoreError>;

    /// Deletes every document matching `filter`, returning the count removed.
    ///
    /// # Errors
    ///
    /// Returns a backend error on failure.
    fn delete_by_query(&self, index: &str, filter: &Value) -> Result<u64, StoreError>;

    /// Applies a batch of operations, continuing past per-item failures.
    ///
    /// # Errors
    ///
    /// Returns a backend error only if the batch could not be attempted at
    /// all; per-item failures are reported in [`BulkResult`].
    fn bulk(&self, operations: Vec<BulkOperation>) -> Result<BulkResult, StoreError>;

    /// Counts documents matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns a backend error on failure.
    fn count(&self, index: &str, filter: &Value) -> Result<u64, StoreError>;
}

/// Maximum number of compare-and-swap retries before giving up (§4.5).
pub const MAX_CAS_RETRIES: u32 = 5;

/// Errors raised by [`update_with_retry`].
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The mutation closure itself failed; not retried.
    #[error("mutation rejected the update: {0}")]
    Mutation(E),
    /// The store exhausted [`MAX_CAS_RETRIES`] attempts under contention
    /// (§4.5's `ConcurrencyError`).
    #[error("exhausted {attempts} compare-and-swap retries on {index}/{id}")]
    ConcurrencyExhausted {
        /// Index written to.
        index: String,
        /// Id written to.
        id: String,
        /// Number of attempts made.
        attempts: u32,
    },
    /// The underlying store failed for a reason other than a version
    /// conflict.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Reads, mutates, and writes back a document under compare-and-swap,
/// retrying on [`StoreError::VersionConflict`] up to [`MAX_CAS_RETRIES`]
/// times, per the §4.5 update protocol. The persistence layer — not the
/// state machine — owns this loop (§9).
///
/// # Errors
///
/// Returns [`RetryError::Mutation`] if `mutate` rejects the current
/// document, [`RetryError::ConcurrencyExhausted`] after exhausting retries,
/// or [`RetryError::Store`] for any other backend failure.
pub fn update_with_retry<E>(
    store: &dyn DocumentStore,
    index: &str,
    id: &str,
    mut mutate: impl FnMut(&mut Value) -> Result<(), E>,
) -> Result<StoredDocument, RetryError<E>> {
    let mut attempt = 0;
    loop {
        let current = store.get(index, id)?;
        let mut doc = current.source.clone();
        mutate(&mut doc).map_err(RetryError::Mutation)?;

        match store.update(index, id, doc, current.seq_no, current.primary_term) {
            Ok(written) => return Ok(written),
            Err(StoreError::VersionConflict { .. }) => {
                attempt += 1;
                if attempt >= MAX_CAS_RETRIES {
                    return Err(RetryError::ConcurrencyExhausted {
                        index: index.to_string(),
                        id: id.to_string(),
                        attempts: attempt,
                    });
                }
            }
            Err(other) => return Err(RetryError::Store(other)),
        }
    }
}

struct Bucket {
    next_seq_no: u64,
    documents: BTreeMap<String, StoredDocument>,
}

impl Bucket {
    fn new() -> Self {
        Self { next_seq_no: 0, documents: BTreeMap::new() }
    }
}

/// In-memory [`DocumentStore`] reference implementation.
///
/// Not crash-safe and not shared across processes; intended for unit tests
/// and the CLI's local demo commands.
pub struct InMemoryDocumentStore {
    indices: Mutex<BTreeMap<String, Bucket>>,
    id_counter: Mutex<u64>,
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDocumentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self { indices: Mutex::new(BTreeMap::new()), id_counter: Mutex::new(0) }
    }

    fn lock_indices(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Bucket>> {
        self.indices.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn mint_id(&self) -> String {
        let mut counter = self.id_counter.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *counter += 1;
        format!("doc-{counter}")
    }

    fn matches(source: &Value, filter: &Value) -> bool {
        let Value::Object(filter_fields) = filter else {
            return true;
        };
        if filter_fields.is_empty() {
            return true;
        }
        let Value::Object(source_fields) = source else {
            return false;
        };
        filter_fields.iter().all(|(key, expected)| source_fields.get(key) == Some(expected))
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn get(&self, index: &str, id: &str) -> Result<StoredDocument, StoreError> {
        let indices = self.lock_indices();
        indices
            .get(index)
            .and_then(|bucket| bucket.documents.get(id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound { index: index.to_string(), id: id.to_string() })
    }

    fn index(&self, index: &str, id: Option<&str>, doc: Value) -> Result<StoredDocument, StoreError> {
        let id = id.map_or_else(|| self.mint_id(), ToString::to_string);
        let mut indices = self.lock_indices();
        let bucket = indices.entry(index.to_string()).or_insert_with(Bucket::new);
        let seq_no = bucket.next_seq_no;
        bucket.next_seq_no += 1;
        let stored = StoredDocument { id: id.clone(), seq_no, primary_term: 1, source: doc };
        bucket.documents.insert(id, stored.clone());
        Ok(stored)
    }

    fn create(&self, index: &str, id: &str, doc: Value) -> Result<StoredDocument, StoreError> {
        let mut indices = self.lock_indices();
        let bucket = indices.entry(index.to_string()).or_insert_with(Bucket::new);
        if bucket.documents.contains_key(id) {
            return Err(StoreError::AlreadyExists { index: index.to_string(), id: id.to_string() });
        }
        let seq_no = bucket.next_seq_no;
        bucket.next_seq_no += 1;
        let stored = StoredDocument { id: id.to_string(), seq_no, primary_term: 1, source: doc };
        bucket.documents.insert(id.to_string(), stored.clone());
        Ok(stored)
    }

    fn update(
        &self,
        index: &str,
        id: &str,
        doc: Value,
        if_seq_no: u64,
        if_primary_term: u64,
    ) -> Result<StoredDocument, StoreError> {
        let mut indices = self.lock_indices();
        let bucket = indices
            .get_mut(index)
            .ok_or_else(|| StoreError::NotFound { index: index.to_string(), id: id.to_string() })?;
        let existing = bucket
            .documents
            .get(id)
            .ok_or_else(|| StoreError::NotFound { index: index.to_string(), id: id.to_string() })?;
        if existing.seq_no != if_seq_no || existing.primary_term != if_primary_term {
            return Err(StoreError::VersionConflict {
                index: index.to_string(),
                id: id.to_string(),
                expected_seq_no: if_seq_no,
                expected_primary_term: if_primary_term,
                actual_seq_no: existing.seq_no,
                actual_primary_term: existing.primary_term,
            });
        }
        let seq_no = bucket.next_seq_no;
        bucket.next_seq_no += 1;
        let stored =
            StoredDocument { id: id.to_string(), seq_no, primary_term: if_primary_term, source: doc };
        bucket.documents.insert(id.to_string(), stored.clone());
        Ok(stored)
    }

    fn search(&self, index: &str, query: &SearchQuery) -> Result<SearchResults, StoreError> {
        let indices = self.lock_indices();
        let Some(bucket) = indices.get(index) else {
            return Ok(SearchResults::default());
        };
        let mut matched: Vec<SearchHit> = bucket
            .documents
            .values()
            .filter(|doc| Self::matches(&doc.source, &query.filter))
            .map(|doc| SearchHit {
                id: doc.id.clone(),
                seq_no: doc.seq_no,
                primary_term: doc.primary_term,
                source: doc.source.clone(),
            })
            .collect();

        for (field, order) in query.sort.iter().rev() {
            matched.sort_by(|a, b| {
                let a_value = a.source.get(field);
                let b_value = b.source.get(field);
                let ordering = compare_json(a_value, b_value);
                match order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            });
        }

        let total = matched.len();
        matched.truncate(query.size);
        Ok(SearchResults { hits: matched, total })
    }

    fn delete_by_query(&self, index: &str, filter: &Value) -> Result<u64, StoreError> {
        let mut indices = self.lock_indices();
        let Some(bucket) = indices.get_mut(index) else {
            return Ok(0);
        };
        let before = bucket.documents.len();
        bucket.documents.retain(|_, doc| !Self::matches(&doc.source, filter));
        Ok((before - bucket.documents.len()) as u64)
    }

    fn bulk(&self, operations: Vec<BulkOperation>) -> Result<BulkResult, StoreError> {
        let mut results = BulkResult::default();
        for operation in operations {
            match operation {
                BulkOperation::Index { index, id, doc } => {
                    let id_for_result = id.clone().unwrap_or_default();
                    match self.index(&index, id.as_deref(), doc) {
                        Ok(stored) => {
                            results.items.push(BulkItemResult { id: stored.id, error: None })
                        }
                        Err(err) => results
                            .items
                            .push(BulkItemResult { id: id_for_result, error: Some(err.to_string()) }),
                    }
                }
                BulkOperation::Delete { index, id } => {
                    let mut indices = self.lock_indices();
                    let removed = indices.get_mut(&index).and_then(|bucket| bucket.documents.remove(&id));
                    drop(indices);
                    let error =
                        if removed.is_some() { None } else { Some("document not found".to_string()) };
                    results.items.push(BulkItemResult { id, error });
                }
            }
        }
        Ok(results)
    }

    fn count(&self, index: &str, filter: &Value) -> Result<u64, StoreError> {
        let indices = self.lock_indices();
        let Some(bucket) = indices.get(index) else {
            return Ok(0);
        };
        Ok(bucket.documents.values().filter(|doc| Self::matches(&doc.source, filter)).count() as u64)
    }
}

fn compare_json(a: Option<&Value>, b: Option<&Value>) -> std::cmp::Ordering {
    let a_str = a.map(Value::to_string).unwrap_or_default();
    let b_str = b.map(Value::to_string).unwrap_or_default();
    let a_num = a.and_then(Value::as_f64);
    let b_num = b.and_then(Value::as_f64);
    if let (Some(x), Some(y)) = (a_num, b_num) {
        return x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal);
    }
    a_str.cmp(&b_str)
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
    fn index_then_get_round_trips() {
        let store = InMemoryDocumentStore::new();
        let stored = store.index("vigil-incidents", Some("INC-1"), json!({"status": "detected"})).unwrap();
        assert_eq!(stored.seq_no, 0);
        let fetched = store.get("vigil-incidents", "INC-1").unwrap();
        assert_eq!(fetched.source, json!({"status": "detected"}));
    }

    #[test]
    fn update_with_stale_seq_no_conflicts() {
        let store = InMemoryDocumentStore::new();
        store.index("vigil-incidents", Some("INC-1"), json!({"status": "detected"})).unwrap();
        let err = store
            .update("vigil-incidents", "INC-1", json!({"status": "triaging"}), 99, 1)
            .expect_err("stale seq_no must conflict");
        assert!(matches!(err, StoreError::VersionConflict { .. }));
    }

    #[test]
    fn update_with_retry_survives_losing_one_race() {
        let store = InMemoryDocumentStore::new();
        store.index("vigil-incidents", Some("INC-1"), json!({"counter": 0})).unwrap();

        // Simulate another writer winning the first race by bumping seq_no
        // out from under the retry loop before it reads.
        let mut first_read = true;
        let result = update_with_retry::<std::convert::Infallible>(
            &store,
            "vigil-incidents",
            "INC-1",
            |doc| {
                if first_read {
                    first_read = false;
                    store.update("vigil-incidents", "INC-1", json!({"counter": 1}), 0, 1).unwrap();
                }
                doc["touched"] = json!(true);
                Ok(())
            },
        );

        let stored = result.expect("retry loop should recover from one lost race");
        assert_eq!(stored.source["touched"], json!(true));
    }

    #[test]
    fn create_fails_when_a_document_already_exists() {
        let store = InMemoryDocumentStore::new();
        store.create("vigil-alert-claims", "alrt-1", json!({"claimed_at": "t0"})).unwrap();
        let err = store
            .create("vigil-alert-claims", "alrt-1", json!({"claimed_at": "t1"}))
            .expect_err("second claim on the same alert must lose the race");
        assert!(matches!(err, StoreError::AlreadyExists { .. }));
    }

    #[test]
    fn delete_by_query_removes_matching_docs_only() {
        let store = InMemoryDocumentStore::new();
        store.index("vigil-alert-claims", Some("a"), json!({"claimed": true})).unwrap();
        store.index("vigil-alert-claims", Some("b"), json!({"claimed": false})).unwrap();
        let removed =
            store.delete_by_query("vigil-alert-claims", &json!({"claimed": true})).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.count("vigil-alert-claims", &json!({})).unwrap(), 1);
    }
}
