//! Content hashing for event deduplication

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Separator fed between key and value bytes so that field boundaries
/// cannot be forged by crafted values (0xC0 never appears in UTF-8 text).
const FIELD_SEPARATOR: u8 = 0xC0;

/// SHA256 content hash over an event's fields
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(String);

impl ContentHash {
    /// Compute a hash from `(key, value)` pairs.
    ///
    /// Callers are responsible for feeding the pairs in ascending key
    /// order; this function only defines the byte layout.
    pub fn of_fields<'a>(fields: impl Iterator<Item = (&'a str, &'a str)>) -> Self {
        let mut hasher = Sha256::new();
        for (key, value) in fields {
            hasher.update(key.as_bytes());
            hasher.update([FIELD_SEPARATOR]);
            hasher.update(value.as_bytes());
            hasher.update([FIELD_SEPARATOR]);
        }
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ContentHash {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_consistency() {
        let fields = [("source.ip", "198.51.100.7"), ("source.port", "443")];
        let h1 = ContentHash::of_fields(fields.iter().map(|(k, v)| (*k, *v)));
        let h2 = ContentHash::of_fields(fields.iter().map(|(k, v)| (*k, *v)));
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_hash_sensitive_to_value() {
        let a = ContentHash::of_fields([("source.ip", "198.51.100.7")].into_iter());
        let b = ContentHash::of_fields([("source.ip", "198.51.100.8")].into_iter());
        assert_ne!(a, b);
    }

    #[test]
    fn test_separator_prevents_boundary_shifts() {
        // "ab" + "c" must not collide with "a" + "bc"
        let a = ContentHash::of_fields([("ab", "c")].into_iter());
        let b = ContentHash::of_fields([("a", "bc")].into_iter());
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_is_hex() {
        let h = ContentHash::of_fields(std::iter::empty());
        assert_eq!(h.as_str().len(), 64);
        assert!(h.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }
}
