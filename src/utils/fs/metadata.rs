//! Content digests.

use sha2::{Digest, Sha256};

/// Hex SHA-256 of `content`.
pub fn checksum(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// First 12 hex digits of the SHA-256, for reports.
pub fn short_checksum(content: &[u8]) -> String {
    checksum(content).chars().take(12).collect()
}
