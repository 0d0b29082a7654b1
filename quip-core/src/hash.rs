//! Content fingerprinting for accepted lines.

use sha1::{Digest, Sha1};

/// Hex-encoded SHA-1 digest of the exact final line. A stable fingerprint
/// for dedup and auditing, not a security primitive.
pub fn content_hash(line: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(line.as_bytes());
    hex::encode(hasher.finalize())
}
