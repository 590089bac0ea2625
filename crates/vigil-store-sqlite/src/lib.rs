// vigil-store-sqlite/src/lib.rs
// ============================================================================
// Crate: vigil-store-sqlite
// Description: Durable DocumentStore backed by SQLite with deterministic
//              serialization.
// Purpose: Give Vigil a persistent alternative to
//          `vigil_core::store::InMemoryDocumentStore` behind the same trait.
// Dependencies: vigil-core, rusqlite, serde_json, thiserror
// ============================================================================

//! ## Overview
//! `vigil-core` deliberately ships no real document store (§1 scopes the
//! production backend out); this crate fills that gap for deployments that
//! want durability without standing up a full search cluster. Every document
//! is stored as canonical JSON alongside its `seq_no`/`primary_term`
//! optimistic-concurrency coordinates, with a stored hash checked on every
//! read so a tampered or corrupted row fails closed rather than silently
//! deserializing.

mod store;

pub use store::SqliteDocumentStore;
pub use store::SqliteJournalMode;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
