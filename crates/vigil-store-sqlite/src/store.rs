// vigil-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Document Store
// Description: Durable DocumentStore backed by SQLite with hash-verified
//              reads.
// Purpose: Persist alert/incident/investigation documents with optimistic
//          concurrency, mirroring the in-memory reference store's semantics.
// Dependencies: vigil-core, rusqlite, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Every document is written as canonical JSON alongside a `seq_no` /
//! `primary_term` pair and a stored content hash. [`get`](DocumentStore::get)
//! and [`search`](DocumentStore::search) recompute the hash on read and fail
//! with [`SqliteStoreError::Corrupt`] on mismatch rather than returning a
//! silently-tampered body; [`update`](DocumentStore::update) enforces the
//! caller's `if_seq_no`/`if_primary_term` inside the same transaction that
//! mints the next `seq_no`, so two concurrent writers can never both observe
//! a successful compare-and-swap against the same prior version. A single
//! mutex-guarded connection serializes every statement, which keeps the
//! implementation simple at the cost of read/write concurrency a dedicated
//! read-connection pool would buy back; Vigil's document volumes (incidents,
//! investigations, audit records) don't call for that complexity.

use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::MutexGuard;

use rusqlite::params;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use serde_json::Value;
use thiserror::Error;
use vigil_core::hashing::canonical_json_bytes;
use vigil_core::hashing::hash_bytes;
use vigil_core::hashing::HashAlgorithm;
use vigil_core::hashing::DEFAULT_HASH_ALGORITHM;
use vigil_core::store::BulkItemResult;
use vigil_core::store::BulkOperation;
use vigil_core::store::BulkResult;
use vigil_core::store::DocumentStore;
use vigil_core::store::SearchHit;
use vigil_core::store::SearchQuery;
use vigil_core::store::SearchResults;
use vigil_core::store::SortOrder;
use vigil_core::store::StoreError;
use vigil_core::store::StoredDocument;

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms) applied to the connection.
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single store path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total store path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4_096;
/// Maximum canonical JSON size accepted for a single document.
pub const MAX_DOCUMENT_BYTES: usize = 4 * 1024 * 1024;

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SqliteJournalMode {
    /// WAL journal mode (recommended; allows concurrent readers).
    #[default]
    Wal,
    /// Delete journal mode (legacy, single-writer filesystems).
    Delete,
}

impl SqliteJournalMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// Configuration for the `SQLite` document store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    pub journal_mode: SqliteJournalMode,
}

impl SqliteStoreConfig {
    /// Builds a config pointed at `path` with documented defaults: a 5s busy
    /// timeout and WAL journaling.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS, journal_mode: SqliteJournalMode::default() }
    }
}

/// `SQLite` store errors.
///
/// # Invariants
/// - Error messages avoid embedding raw document bodies.
#[derive(Debug, Error, Clone)]
pub enum SqliteStoreError {
    /// Store I/O error (path validation, directory creation).
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Stored content hash did not match the recomputed hash.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) | SqliteStoreError::Db(message) => Self::Backend(message),
            SqliteStoreError::Corrupt(message) => {
                Self::Backend(format!("stored document failed integrity check: {message}"))
            }
            SqliteStoreError::VersionMismatch(message) => {
                Self::Backend(format!("schema version mismatch: {message}"))
            }
            SqliteStoreError::Invalid(message) => Self::Serialization(message),
        }
    }
}

/// `SQLite`-backed [`DocumentStore`] with hash-verified reads.
///
/// # Invariants
/// - Document reads verify the stored content hash before deserialization.
/// - `SQLite` connection access is serialized through a mutex.
pub struct SqliteDocumentStore {
    connection: Mutex<Connection>,
}

impl SqliteDocumentStore {
    /// Opens (or creates) a `SQLite`-backed document store at `config.path`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] if the path is invalid, the database
    /// cannot be opened, or schema initialization fails.
    pub fn open(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(&config)?;
        initialize_schema(&mut connection)?;
        Ok(Self { connection: Mutex::new(connection) })
    }

    /// Verifies the store can execute a trivial query, for use as an
    /// operational health check.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] if the mutex is poisoned or the query
    /// fails.
    pub fn readiness(&self) -> Result<(), SqliteStoreError> {
        self.lock().execute("SELECT 1", []).map(|_| ()).map_err(|err| SqliteStoreError::Db(err.to_string()))
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.connection.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
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

    fn encode(doc: &Value) -> Result<(String, String, HashAlgorithm), SqliteStoreError> {
        let bytes = canonical_json_bytes(doc).map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        if bytes.len() > MAX_DOCUMENT_BYTES {
            return Err(SqliteStoreError::Invalid(format!(
                "document exceeds size limit: {} bytes (max {MAX_DOCUMENT_BYTES})",
                bytes.len()
            )));
        }
        let digest = hash_bytes(DEFAULT_HASH_ALGORITHM, &bytes);
        let body = String::from_utf8(bytes).map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        Ok((body, digest.value, digest.algorithm))
    }

    fn decode_and_verify(body: &str, body_hash: &str, hash_algorithm: &str) -> Result<Value, SqliteStoreError> {
        let algorithm = parse_hash_algorithm(hash_algorithm)?;
        let expected = hash_bytes(algorithm, body.as_bytes());
        if expected.value != body_hash {
            return Err(SqliteStoreError::Corrupt("stored hash does not match document body".to_string()));
        }
        serde_json::from_str(body).map_err(|err| SqliteStoreError::Invalid(err.to_string()))
    }

    fn mint_seq_no(tx: &rusqlite::Transaction<'_>, index: &str) -> Result<u64, SqliteStoreError> {
        tx.query_row(
            "INSERT INTO index_counters (index_name, next_seq_no) VALUES (?1, 1)
             ON CONFLICT(index_name) DO UPDATE SET next_seq_no = next_seq_no + 1
             RETURNING next_seq_no - 1",
            params![index],
            |row| row.get::<_, i64>(0),
        )
        .map_err(|err| SqliteStoreError::Db(err.to_string()))
        .map(|value| u64::try_from(value).unwrap_or(0))
    }

    fn mint_id(tx: &rusqlite::Transaction<'_>) -> Result<String, SqliteStoreError> {
        let minted: i64 = tx
            .query_row(
                "UPDATE id_counter SET next_value = next_value + 1 WHERE id = 1 RETURNING next_value - 1",
                [],
                |row| row.get(0),
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(format!("doc-{minted}"))
    }

    fn load_index(&self, index: &str) -> Result<Vec<(String, StoredDocument)>, StoreError> {
        let connection = self.lock();
        let mut statement = connection
            .prepare(
                "SELECT id, seq_no, primary_term, body, body_hash, hash_algorithm FROM documents \
                 WHERE index_name = ?1",
            )
            .map_err(map_db_err)?;
        let rows = statement
            .query_map(params![index], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })
            .map_err(map_db_err)?;

        let mut documents = Vec::new();
        for row in rows {
            let (id, seq_no, primary_term, body, body_hash, hash_algorithm) = row.map_err(map_db_err)?;
            let source = Self::decode_and_verify(&body, &body_hash, &hash_algorithm)?;
            let seq_no = u64::try_from(seq_no).unwrap_or(0);
            let primary_term = u64::try_from(primary_term).unwrap_or(0);
            documents.push((id.clone(), StoredDocument { id, seq_no, primary_term, source }));
        }
        Ok(documents)
    }
}

impl DocumentStore for SqliteDocumentStore {
    fn get(&self, index: &str, id: &str) -> Result<StoredDocument, StoreError> {
        let connection = self.lock();
        let row = connection
            .query_row(
                "SELECT seq_no, primary_term, body, body_hash, hash_algorithm FROM documents \
                 WHERE index_name = ?1 AND id = ?2",
                params![index, id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()
            .map_err(map_db_err)?;
        drop(connection);

        let Some((seq_no, primary_term, body, body_hash, hash_algorithm)) = row else {
            return Err(StoreError::NotFound { index: index.to_string(), id: id.to_string() });
        };
        let source = Self::decode_and_verify(&body, &body_hash, &hash_algorithm)?;
        Ok(StoredDocument {
            id: id.to_string(),
            seq_no: u64::try_from(seq_no).unwrap_or(0),
            primary_term: u64::try_from(primary_term).unwrap_or(0),
            source,
        })
    }

    fn index(&self, index: &str, id: Option<&str>, doc: Value) -> Result<StoredDocument, StoreError> {
        let (body, body_hash, algorithm) = Self::encode(&doc)?;
        let mut connection = self.lock();
        let tx = connection.transaction().map_err(map_db_err)?;
        let minted_id = match id {
            Some(id) => id.to_string(),
            None => Self::mint_id(&tx)?,
        };
        let seq_no = Self::mint_seq_no(&tx, index)?;
        let primary_term = 1u64;
        tx.execute(
            "INSERT INTO documents (index_name, id, seq_no, primary_term, body, body_hash, \
             hash_algorithm) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(index_name, id) DO UPDATE SET
                seq_no = excluded.seq_no,
                primary_term = excluded.primary_term,
                body = excluded.body,
                body_hash = excluded.body_hash,
                hash_algorithm = excluded.hash_algorithm",
            params![index, minted_id, seq_no, primary_term, body, body_hash, hash_algorithm_label(algorithm)],
        )
        .map_err(map_db_err)?;
        tx.commit().map_err(map_db_err)?;
        Ok(StoredDocument { id: minted_id, seq_no, primary_term, source: doc })
    }

    fn create(&self, index: &str, id: &str, doc: Value) -> Result<StoredDocument, StoreError> {
        let (body, body_hash, algorithm) = Self::encode(&doc)?;
        let mut connection = self.lock();
        let tx = connection.transaction().map_err(map_db_err)?;
        let exists: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM documents WHERE index_name = ?1 AND id = ?2",
                params![index, id],
                |row| row.get(0),
            )
            .optional()
            .map_err(map_db_err)?;
        if exists.is_some() {
            return Err(StoreError::AlreadyExists { index: index.to_string(), id: id.to_string() });
        }
        let seq_no = Self::mint_seq_no(&tx, index)?;
        let primary_term = 1u64;
        tx.execute(
            "INSERT INTO documents (index_name, id, seq_no, primary_term, body, body_hash, \
             hash_algorithm) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![index, id, seq_no, primary_term, body, body_hash, hash_algorithm_label(algorithm)],
        )
        .map_err(map_db_err)?;
        tx.commit().map_err(map_db_err)?;
        Ok(StoredDocument { id: id.to_string(), seq_no, primary_term, source: doc })
    }

    fn update(
        &self,
        index: &str,
        id: &str,
        doc: Value,
        if_seq_no: u64,
        if_primary_term: u64,
    ) -> Result<StoredDocument, StoreError> {
        let (body, body_hash, algorithm) = Self::encode(&doc)?;
        let mut connection = self.lock();
        let tx = connection.transaction().map_err(map_db_err)?;
        let current = tx
            .query_row(
                "SELECT seq_no, primary_term FROM documents WHERE index_name = ?1 AND id = ?2",
                params![index, id],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()
            .map_err(map_db_err)?;
        let Some((current_seq_no, current_primary_term)) = current else {
            return Err(StoreError::NotFound { index: index.to_string(), id: id.to_string() });
        };
        let current_seq_no = u64::try_from(current_seq_no).unwrap_or(0);
        let current_primary_term = u64::try_from(current_primary_term).unwrap_or(0);
        if current_seq_no != if_seq_no || current_primary_term != if_primary_term {
            return Err(StoreError::VersionConflict {
                index: index.to_string(),
                id: id.to_string(),
                expected_seq_no: if_seq_no,
                expected_primary_term: if_primary_term,
                actual_seq_no: current_seq_no,
                actual_primary_term: current_primary_term,
            });
        }

        let next_seq_no = Self::mint_seq_no(&tx, index)?;
        tx.execute(
            "UPDATE documents SET seq_no = ?1, primary_term = ?2, body = ?3, body_hash = ?4, \
             hash_algorithm = ?5 WHERE index_name = ?6 AND id = ?7",
            params![next_seq_no, if_primary_term, body, body_hash, hash_algorithm_label(algorithm), index, id],
        )
        .map_err(map_db_err)?;
        tx.commit().map_err(map_db_err)?;
        Ok(StoredDocument { id: id.to_string(), seq_no: next_seq_no, primary_term: if_primary_term, source: doc })
    }

    fn search(&self, index: &str, query: &SearchQuery) -> Result<SearchResults, StoreError> {
        let documents = self.load_index(index)?;
        let mut matched: Vec<SearchHit> = documents
            .into_iter()
            .map(|(_, stored)| stored)
            .filter(|stored| Self::matches(&stored.source, &query.filter))
            .map(|stored| SearchHit {
                id: stored.id,
                seq_no: stored.seq_no,
                primary_term: stored.primary_term,
                source: stored.source,
            })
            .collect();

        for (field, order) in query.sort.iter().rev() {
            matched.sort_by(|a, b| {
                let ordering = compare_json(a.source.get(field), b.source.get(field));
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
        let documents = self.load_index(index)?;
        let matching_ids: Vec<String> = documents
            .into_iter()
            .filter(|(_, stored)| Self::matches(&stored.source, filter))
            .map(|(id, _)| id)
            .collect();

        let mut connection = self.lock();
        let tx = connection.transaction().map_err(map_db_err)?;
        let mut removed = 0u64;
        for id in &matching_ids {
            let affected = tx
                .execute("DELETE FROM documents WHERE index_name = ?1 AND id = ?2", params![index, id])
                .map_err(map_db_err)?;
            removed += u64::try_from(affected).unwrap_or(0);
        }
        tx.commit().map_err(map_db_err)?;
        Ok(removed)
    }

    fn bulk(&self, operations: Vec<BulkOperation>) -> Result<BulkResult, StoreError> {
        let mut results = BulkResult::default();
        for operation in operations {
            match operation {
                BulkOperation::Index { index, id, doc } => {
                    let id_for_result = id.clone().unwrap_or_default();
                    match self.index(&index, id.as_deref(), doc) {
                        Ok(stored) => results.items.push(BulkItemResult { id: stored.id, error: None }),
                        Err(err) => {
                            results.items.push(BulkItemResult { id: id_for_result, error: Some(err.to_string()) });
                        }
                    }
                }
                BulkOperation::Delete { index, id } => {
                    let connection = self.lock();
                    let affected = connection
                        .execute("DELETE FROM documents WHERE index_name = ?1 AND id = ?2", params![index, id])
                        .map_err(|err| err.to_string());
                    drop(connection);
                    let error = match affected {
                        Ok(0) => Some("document not found".to_string()),
                        Ok(_) => None,
                        Err(message) => Some(message),
                    };
                    results.items.push(BulkItemResult { id, error });
                }
            }
        }
        Ok(results)
    }

    fn count(&self, index: &str, filter: &Value) -> Result<u64, StoreError> {
        let documents = self.load_index(index)?;
        let matching = documents.into_iter().filter(|(_, stored)| Self::matches(&stored.source, filter)).count();
        Ok(u64::try_from(matching).unwrap_or(u64::MAX))
    }
}

fn map_db_err(err: rusqlite::Error) -> StoreError {
    SqliteStoreError::Db(err.to_string()).into()
}

fn compare_json(a: Option<&Value>, b: Option<&Value>) -> std::cmp::Ordering {
    let a_num = a.and_then(Value::as_f64);
    let b_num = b.and_then(Value::as_f64);
    if let (Some(x), Some(y)) = (a_num, b_num) {
        return x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal);
    }
    let a_str = a.map(Value::to_string).unwrap_or_default();
    let b_str = b.map(Value::to_string).unwrap_or_default();
    a_str.cmp(&b_str)
}

const fn hash_algorithm_label(algorithm: HashAlgorithm) -> &'static str {
    match algorithm {
        HashAlgorithm::Sha256 => "sha256",
    }
}

fn parse_hash_algorithm(label: &str) -> Result<HashAlgorithm, SqliteStoreError> {
    match label {
        "sha256" => Ok(HashAlgorithm::Sha256),
        other => Err(SqliteStoreError::Invalid(format!("unknown hash algorithm: {other}"))),
    }
}

fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) else {
        return Ok(());
    };
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid("store path contains an overlong component".to_string()));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid("store path must be a file, not a directory".to_string()));
    }
    Ok(())
}

fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection =
        Connection::open_with_flags(&config.path, flags).map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

fn apply_pragmas(connection: &Connection, config: &SqliteStoreConfig) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch("PRAGMA synchronous = full;")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", [], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS documents (
                    index_name TEXT NOT NULL,
                    id TEXT NOT NULL,
                    seq_no INTEGER NOT NULL,
                    primary_term INTEGER NOT NULL,
                    body TEXT NOT NULL,
                    body_hash TEXT NOT NULL,
                    hash_algorithm TEXT NOT NULL,
                    PRIMARY KEY (index_name, id)
                );
                CREATE TABLE IF NOT EXISTS index_counters (
                    index_name TEXT PRIMARY KEY,
                    next_seq_no INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS id_counter (
                    id INTEGER PRIMARY KEY CHECK (id = 1),
                    next_value INTEGER NOT NULL
                );
                INSERT OR IGNORE INTO id_counter (id, next_value) VALUES (1, 1);",
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!("unsupported schema version: {value}")));
        }
    }
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test fixtures use explicit asserts and unwraps for clarity."
    )]

    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    fn open_store(dir: &TempDir) -> SqliteDocumentStore {
        let path = dir.path().join("vigil.sqlite3");
        SqliteDocumentStore::open(SqliteStoreConfig::new(path)).expect("store opens")
    }

    #[test]
    fn index_then_get_round_trips() {
        let dir = TempDir::new().expect("temp dir");
        let store = open_store(&dir);
        let stored = store.index("vigil-incidents", Some("INC-1"), json!({"status": "detected"})).unwrap();
        assert_eq!(stored.seq_no, 0);
        let fetched = store.get("vigil-incidents", "INC-1").unwrap();
        assert_eq!(fetched.source, json!({"status": "detected"}));
    }

    #[test]
    fn index_mints_an_id_when_none_is_given() {
        let dir = TempDir::new().expect("temp dir");
        let store = open_store(&dir);
        let first = store.index("vigil-alerts-raw", None, json!({"n": 1})).unwrap();
        let second = store.index("vigil-alerts-raw", None, json!({"n": 2})).unwrap();
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn update_with_stale_seq_no_conflicts() {
        let dir = TempDir::new().expect("temp dir");
        let store = open_store(&dir);
        store.index("vigil-incidents", Some("INC-1"), json!({"status": "detected"})).unwrap();
        let err = store
            .update("vigil-incidents", "INC-1", json!({"status": "triaging"}), 99, 1)
            .expect_err("stale seq_no must conflict");
        assert!(matches!(err, StoreError::VersionConflict { .. }));
    }

    #[test]
    fn update_advances_seq_no_and_preserves_primary_term() {
        let dir = TempDir::new().expect("temp dir");
        let store = open_store(&dir);
        let stored = store.index("vigil-incidents", Some("INC-1"), json!({"counter": 0})).unwrap();
        let updated = store
            .update("vigil-incidents", "INC-1", json!({"counter": 1}), stored.seq_no, stored.primary_term)
            .unwrap();
        assert_eq!(updated.seq_no, stored.seq_no + 1);
        assert_eq!(updated.primary_term, stored.primary_term);
    }

    #[test]
    fn a_tampered_row_fails_closed_on_read() {
        let dir = TempDir::new().expect("temp dir");
        let store = open_store(&dir);
        store.index("vigil-incidents", Some("INC-1"), json!({"status": "detected"})).unwrap();
        {
            let connection = store.lock();
            connection
                .execute(
                    "UPDATE documents SET body = ?1 WHERE index_name = 'vigil-incidents' AND id = 'INC-1'",
                    params![r#"{"status":"tampered"}"#],
                )
                .unwrap();
        }
        let err = store.get("vigil-incidents", "INC-1").expect_err("tampered body must fail closed");
        assert!(matches!(err, StoreError::Backend(_)));
    }

    #[test]
    fn create_fails_when_a_document_already_exists() {
        let dir = TempDir::new().expect("temp dir");
        let store = open_store(&dir);
        store.create("vigil-alert-claims", "alrt-1", json!({"claimed_at": "t0"})).unwrap();
        let err = store
            .create("vigil-alert-claims", "alrt-1", json!({"claimed_at": "t1"}))
            .expect_err("second claim on the same alert must lose the race");
        assert!(matches!(err, StoreError::AlreadyExists { .. }));
    }

    #[test]
    fn delete_by_query_removes_matching_docs_only() {
        let dir = TempDir::new().expect("temp dir");
        let store = open_store(&dir);
        store.index("vigil-alert-claims", Some("a"), json!({"claimed": true})).unwrap();
        store.index("vigil-alert-claims", Some("b"), json!({"claimed": false})).unwrap();
        let removed = store.delete_by_query("vigil-alert-claims", &json!({"claimed": true})).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.count("vigil-alert-claims", &json!({})).unwrap(), 1);
    }

    #[test]
    fn search_respects_sort_and_size() {
        let dir = TempDir::new().expect("temp dir");
        let store = open_store(&dir);
        store.index("vigil-metrics-services", Some("a"), json!({"error_rate": 5.0})).unwrap();
        store.index("vigil-metrics-services", Some("b"), json!({"error_rate": 1.0})).unwrap();
        store.index("vigil-metrics-services", Some("c"), json!({"error_rate": 3.0})).unwrap();

        let query = SearchQuery { filter: json!({}), sort: vec![("error_rate".to_string(), SortOrder::Asc)], size: 2 };
        let results = store.search("vigil-metrics-services", &query).unwrap();
        assert_eq!(results.total, 3);
        assert_eq!(results.hits.len(), 2);
        assert_eq!(results.hits[0].id, "b");
        assert_eq!(results.hits[1].id, "c");
    }

    #[test]
    fn reopening_the_same_file_preserves_documents() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("vigil.sqlite3");
        {
            let store = SqliteDocumentStore::open(SqliteStoreConfig::new(&path)).unwrap();
            store.index("vigil-incidents", Some("INC-1"), json!({"status": "detected"})).unwrap();
        }
        let reopened = SqliteDocumentStore::open(SqliteStoreConfig::new(&path)).unwrap();
        let fetched = reopened.get("vigil-incidents", "INC-1").unwrap();
        assert_eq!(fetched.source, json!({"status": "detected"}));
    }

    proptest::proptest! {
        #[test]
        fn index_then_get_round_trips_arbitrary_values(value in -1_000_000i64 ..= 1_000_000i64) {
            let dir = TempDir::new().expect("temp dir");
            let store = open_store(&dir);
            store.index("vigil-assets", Some("asset-1"), json!({"criticality_score": value})).unwrap();
            let fetched = store.get("vigil-assets", "asset-1").unwrap();
            proptest::prop_assert_eq!(fetched.source["criticality_score"].as_i64(), Some(value));
        }
    }
}
