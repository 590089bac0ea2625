// vigil-core/src/hashing.rs
// ============================================================================
// Module: Vigil Canonical Hashing
// Description: Deterministic content hashing for audit-log integrity.
// Purpose: Let action audit records and telemetry carry a payload hash so
//          replay tooling can detect tampering.
// Dependencies: serde, serde_json, sha2
// ============================================================================

//! ## Overview
//! Contract payloads are hashed after canonicalization: serializing through
//! [`serde_json::Value`] (whose map type orders keys lexicographically when
//! the `preserve_order` feature is not enabled) gives a stable byte sequence
//! for structurally-equal values, which is all the audit trail needs.

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

/// Supported hash algorithms for Vigil audit artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    /// SHA-256 hashing (the only algorithm Vigil currently mints).
    Sha256,
}

/// Default hash algorithm for Vigil.
pub const DEFAULT_HASH_ALGORITHM: HashAlgorithm = HashAlgorithm::Sha256;

/// Deterministic content hash representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashDigest {
    /// Hash algorithm identifier.
    pub algorithm: HashAlgorithm,
    /// Lowercase hex-encoded digest bytes.
    pub value: String,
}

impl HashDigest {
    /// Creates a new digest from raw bytes.
    #[must_use]
    pub fn new(algorithm: HashAlgorithm, bytes: &[u8]) -> Self {
        Self { algorithm, value: hex_encode(bytes) }
    }
}

/// Errors raised when computing canonical hashes.
#[derive(Debug, Error)]
pub enum HashError {
    /// Canonicalization of the value into JSON failed.
    #[error("failed to canonicalize payload: {0}")]
    Canonicalization(String),
}

/// Returns canonical JSON bytes for a serializable value.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn canonical_json_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, HashError> {
    let as_value =
        serde_json::to_value(value).map_err(|err| HashError::Canonicalization(err.to_string()))?;
    serde_json::to_vec(&as_value).map_err(|err| HashError::Canonicalization(err.to_string()))
}

/// Hashes canonical JSON using the provided algorithm.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn hash_canonical_json<T: Serialize + ?Sized>(
    algorithm: HashAlgorithm,
    value: &T,
) -> Result<HashDigest, HashError> {
    let bytes = canonical_json_bytes(value)?;
    Ok(hash_bytes(algorithm, &bytes))
}

/// Hashes raw bytes using the provided algorithm.
#[must_use]
pub fn hash_bytes(algorithm: HashAlgorithm, bytes: &[u8]) -> HashDigest {
    match algorithm {
        HashAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            hasher.update(bytes);
            let digest = hasher.finalize();
            HashDigest::new(HashAlgorithm::Sha256, &digest)
        }
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}
