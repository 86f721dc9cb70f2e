//! Content fingerprinting: the cache key for an uploaded deck.
//!
//! The fingerprint is the lowercase hex SHA-256 of the raw uploaded bytes.
//! It is a pure function of content — the filename, upload time, and any
//! multipart metadata play no part — so byte-identical uploads always land
//! on the same cache entry. Collisions are treated as negligible; this is
//! a deduplication key, not an adversarial defence.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Hex-encoded SHA-256 of an uploaded document's bytes.
///
/// Doubles as the namespace for that document's staging files: the upload
/// is saved as `{fingerprint}.pdf` and slides render into a
/// `{fingerprint}/` directory, so concurrent requests for different decks
/// never collide on disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute the fingerprint of raw document bytes.
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Fingerprint(hex::encode(Sha256::digest(bytes)))
    }

    /// The hex string, suitable as a filename component.
    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
