//! Cache Entry Module
//!
//! Defines the unit of storage: an arbitrary serializable payload wrapped
//! with expiry, version and tag metadata. Entries serialize to JSON and the
//! same envelope is written to every backend.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

// == Cache Entry ==
/// A single cached value together with its metadata.
///
/// The facade wraps payloads on the way in and strips the envelope on the way
/// out, so callers never handle this type directly unless they peek at raw
/// backend contents. `tags` is omitted from the serialized form when empty
/// and tolerated as absent when reading entries written before tagging
/// existed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// The cached payload
    pub data: T,
    /// Creation timestamp (Unix milliseconds)
    pub timestamp: u64,
    /// Absolute expiry timestamp (Unix milliseconds)
    pub expires_at: u64,
    /// Version stamped at write time; stored, not enforced on read
    pub version: String,
    /// Labels for bulk invalidation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl<T> CacheEntry<T> {
    // == Constructor ==
    /// Creates an entry stamped with the current time and the given TTL.
    ///
    /// # Arguments
    /// * `data` - The payload to wrap
    /// * `ttl` - How long the entry stays servable
    /// * `version` - Version string recorded alongside the payload
    /// * `tags` - Invalidation labels, may be empty
    pub fn new(data: T, ttl: Duration, version: &str, tags: Vec<String>) -> Self {
        let now = now_millis();
        Self {
            data,
            timestamp: now,
            expires_at: now + ttl.as_millis() as u64,
            version: version.to_string(),
            tags,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// Boundary condition: an entry is expired once the current time is
    /// greater than or equal to `expires_at`, so a zero TTL produces an entry
    /// that is never servable.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_millis())
    }

    /// Expiry check against an explicit clock reading. Sweeps evaluate every
    /// entry against a single reading instead of re-sampling the clock.
    pub fn is_expired_at(&self, now: u64) -> bool {
        now >= self.expires_at
    }

    // == Time To Live ==
    /// Returns the remaining TTL in milliseconds, or 0 if the entry has
    /// expired.
    pub fn ttl_remaining_ms(&self) -> u64 {
        self.expires_at.saturating_sub(now_millis())
    }
}

// == Raw Decoding ==
/// Decodes a raw stored string into a payload-agnostic entry.
///
/// Returns `None` for undecodable strings. Sweeps treat those as removable
/// corruption; reads treat them as misses.
pub(crate) fn decode_raw(raw: &str) -> Option<CacheEntry<Value>> {
    serde_json::from_str(raw).ok()
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64
}
