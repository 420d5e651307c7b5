//! Content fingerprinting.
//!
//! Fingerprints are SHA-256 hashes over the exact raw bytes fetched — a
//! stable content identity used for change detection between snapshots.

use sha2::{Digest, Sha256};

/// Compute the hex-encoded SHA-256 digest of `bytes`.
///
/// Pure and deterministic: same bytes → same fingerprint.
pub fn fingerprint(bytes: &[u8]) -> String {
  let mut hasher = Sha256::new();
  hasher.update(bytes);
  hex::encode(hasher.finalize())
}
