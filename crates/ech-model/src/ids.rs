//! Content-addressed surrogate keys.
//!
//! Dimension keys are derived from the natural key, not from insertion
//! order, so the same raw input always maps to the same key regardless of
//! the order records arrive in.

use sha2::Digest;

/// Derive a positive 63-bit surrogate key from a dimension namespace and the
/// natural key. Namespacing keeps equal natural keys in different dimensions
/// (e.g. the same ICD-10 group used as cause and as discharge type) from
/// colliding.
pub fn surrogate_key(namespace: &str, natural_key: &str) -> i64 {
    let digest = sha2::Sha256::digest(format!("{namespace}:{natural_key}").as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    (i64::from_be_bytes(bytes) & i64::MAX).max(1)
}

/// Hex digest of raw bytes, used to fingerprint input files in run reports.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = sha2::Sha256::digest(bytes);
    hex::encode(digest)
}
