//! Checksum utilities for snapshot integrity verification

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// SHA256 checksum over the serialized store state
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum(String);

impl Checksum {
    /// Compute checksum from raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    /// Compute checksum from a JSON value.
    ///
    /// serde_json serializes maps with sorted keys, so the same state always
    /// hashes to the same digest.
    pub fn from_json(value: &serde_json::Value) -> Self {
        let canonical = serde_json::to_string(value).unwrap_or_default();
        Self::from_bytes(canonical.as_bytes())
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Verify that a JSON value matches this checksum
    pub fn verify_json(&self, value: &serde_json::Value) -> bool {
        *self == Self::from_json(value)
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Checksum {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_checksum_consistency() {
        let value = json!({"types": [], "records": []});
        assert_eq!(Checksum::from_json(&value), Checksum::from_json(&value));
    }

    #[test]
    fn test_checksum_detects_change() {
        let a = json!({"next_record_id": 1});
        let b = json!({"next_record_id": 2});
        assert_ne!(Checksum::from_json(&a), Checksum::from_json(&b));
    }

    #[test]
    fn test_verify_json() {
        let value = json!({"name": "Product"});
        let checksum = Checksum::from_json(&value);
        assert!(checksum.verify_json(&value));
        assert!(!checksum.verify_json(&json!({"name": "Color"})));
    }
}
