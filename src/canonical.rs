//! Canonical serialization for deterministic fingerprints.
//!
//! Trees and run parameters are fingerprinted so that two runs over the same
//! dataset with the same configuration can be compared byte for byte.
//!
//! ## Determinism Guarantees
//!
//! - Stable field order: struct fields serialize in declaration order
//! - Stable collection order: element sets are `BTreeSet`s, maps are `BTreeMap`s
//! - Floats are quantized before hashing (see [`crate::policy`])

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

/// Serialize a value to canonical JSON bytes for hashing.
///
/// Only used with plain data structs (no maps with non-string keys), for
/// which JSON serialization cannot fail.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).expect("canonical serialization of plain data")
}

/// Compute the canonical hash of a serializable value.
pub fn canonical_hash<T: Serialize>(value: &T) -> u64 {
    xxh64(&to_canonical_bytes(value), 0)
}

/// Compute the canonical hash and return it as a 16-digit hex string.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> String {
    format!("{:016x}", canonical_hash(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[derive(Serialize)]
    struct Row {
        name: String,
        elements: BTreeSet<u32>,
    }

    #[test]
    fn test_determinism() {
        let row = Row {
            name: "laptops".to_string(),
            elements: [3, 1, 2].into_iter().collect(),
        };

        assert_eq!(canonical_hash(&row), canonical_hash(&row));
        assert_eq!(canonical_hash_hex(&row).len(), 16);
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let a = Row {
            name: "x".to_string(),
            elements: [1, 2, 3].into_iter().collect(),
        };
        let b = Row {
            name: "x".to_string(),
            elements: [3, 2, 1].into_iter().collect(),
        };
        assert_eq!(canonical_hash(&a), canonical_hash(&b));
    }
}
