// crates/panel-gate-core/src/core/digest.rs
// ============================================================================
// Module: Panel Gate Pack Digest
// Description: Canonical JSON encoding and SHA-256 pack fingerprints.
// Purpose: Give identical inference packs identical, byte-stable digests.
// Dependencies: serde, serde_jcs, sha2, thiserror
// ============================================================================

//! ## Overview
//! Packs are encoded with RFC 8785 canonical JSON, then hashed with SHA-256.
//! The CLI prints the same canonical bytes, so a digest can be recomputed
//! from captured output.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Types
// ============================================================================

/// SHA-256 fingerprint of a value's canonical JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackDigest {
    /// Lowercase hex SHA-256.
    pub sha256: String,
    /// Length of the canonical encoding in bytes.
    pub canonical_len: usize,
}

impl PackDigest {
    /// Encodes a value canonically and fingerprints the bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CanonicalJsonError`] when the value cannot be encoded.
    pub fn of<T: Serialize + ?Sized>(value: &T) -> Result<Self, CanonicalJsonError> {
        let bytes = canonical_json_bytes(value)?;
        let mut sha256 = String::with_capacity(64);
        for byte in Sha256::digest(&bytes) {
            let _ = write!(sha256, "{byte:02x}");
        }
        Ok(Self {
            sha256,
            canonical_len: bytes.len(),
        })
    }
}

/// Canonical encoding failure.
#[derive(Debug, Error)]
#[error("canonical json encoding failed: {0}")]
pub struct CanonicalJsonError(String);

// ============================================================================
// SECTION: Encoding
// ============================================================================

/// Encodes a value as RFC 8785 canonical JSON.
///
/// # Errors
///
/// Returns [`CanonicalJsonError`] on non-finite floats or serializer failure.
pub fn canonical_json_bytes<T: Serialize + ?Sized>(
    value: &T,
) -> Result<Vec<u8>, CanonicalJsonError> {
    serde_jcs::to_vec(value).map_err(|err| CanonicalJsonError(err.to_string()))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]

    use std::collections::BTreeMap;
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn digest_ignores_map_insertion_order() {
        let mut first = HashMap::new();
        first.insert("glucose_est", 2);
        first.insert("egfr_est", 1);
        let second: BTreeMap<_, _> = [("egfr_est", 1), ("glucose_est", 2)].into_iter().collect();
        let left = PackDigest::of(&first).unwrap();
        assert_eq!(left, PackDigest::of(&second).unwrap());
        assert_eq!(left.sha256.len(), 64);
        assert_eq!(left.canonical_len, br#"{"egfr_est":1,"glucose_est":2}"#.len());
    }
}
