//! Flat Store Module
//!
//! The adapter shared by the two flat synchronous backends: raw entry access
//! over a pluggable backing plus the entry-aware routines, expiry sweeps,
//! oldest-first eviction and tag invalidation.

use std::io;

use crate::backend::backing::FlatBacking;
use crate::cache::entry::decode_raw;

// == Flat Store ==
/// Synchronous cache backend over a raw string namespace.
pub(crate) struct FlatStore {
    backing: Box<dyn FlatBacking>,
}

impl FlatStore {
    pub(crate) fn new(backing: Box<dyn FlatBacking>) -> Self {
        Self { backing }
    }

    // == Raw Access ==
    pub(crate) fn get_raw(&self, key: &str) -> Option<String> {
        self.backing.read(key)
    }

    pub(crate) fn put(&mut self, key: &str, raw: String) -> io::Result<()> {
        self.backing.write(key, raw)
    }

    pub(crate) fn remove(&mut self, key: &str) {
        self.backing.remove(key);
    }

    pub(crate) fn clear(&mut self) {
        self.backing.clear();
    }

    pub(crate) fn usage(&self) -> u64 {
        self.backing.bytes_used()
    }

    // == Expiry Sweep ==
    /// Removes every expired or undecodable entry and returns the count.
    pub(crate) fn sweep_expired(&mut self, now: u64) -> usize {
        let mut removed = 0;
        for key in self.backing.keys() {
            let stale = match self.backing.read(&key) {
                Some(raw) => match decode_raw(&raw) {
                    Some(entry) => entry.is_expired_at(now),
                    // Corrupted entries are reclaimed here, not on read
                    None => true,
                },
                None => false,
            };
            if stale {
                self.backing.remove(&key);
                removed += 1;
            }
        }
        removed
    }

    // == Eviction ==
    /// Removes oldest-by-timestamp entries until usage fits under
    /// `max_bytes`; returns the number removed. Undecodable entries sort
    /// first and go before anything with a real timestamp.
    pub(crate) fn evict_until(&mut self, max_bytes: u64) -> usize {
        let mut used = self.usage();
        if used <= max_bytes {
            return 0;
        }

        let mut candidates: Vec<(String, u64, u64)> = self
            .backing
            .keys()
            .into_iter()
            .filter_map(|key| {
                let raw = self.backing.read(&key)?;
                let timestamp = decode_raw(&raw).map(|e| e.timestamp).unwrap_or(0);
                Some((key, timestamp, raw.len() as u64))
            })
            .collect();
        candidates.sort_by_key(|(_, timestamp, _)| *timestamp);

        let mut evicted = 0;
        for (key, _, size) in candidates {
            if used <= max_bytes {
                break;
            }
            self.backing.remove(&key);
            used = used.saturating_sub(size);
            evicted += 1;
        }
        evicted
    }

    // == Tag Invalidation ==
    /// Removes every decodable entry carrying `tag`; returns the count.
    pub(crate) fn delete_by_tag(&mut self, tag: &str) -> usize {
        let mut removed = 0;
        for key in self.backing.keys() {
            let tagged = self
                .backing
                .read(&key)
                .and_then(|raw| decode_raw(&raw))
                .map(|entry| entry.tags.iter().any(|t| t == tag))
                .unwrap_or(false);
            if tagged {
                self.backing.remove(&key);
                removed += 1;
            }
        }
        removed
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::backing::MemoryBacking;
    use crate::cache::entry::CacheEntry;

    fn store() -> FlatStore {
        FlatStore::new(Box::new(MemoryBacking::new()))
    }

    fn raw_entry(data: &str, timestamp: u64, expires_at: u64, tags: &[&str]) -> String {
        let entry = CacheEntry {
            data: data.to_string(),
            timestamp,
            expires_at,
            version: "1.0.0".to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        };
        serde_json::to_string(&entry).unwrap()
    }

    #[test]
    fn test_put_get_remove() {
        let mut store = store();
        store.put("k", raw_entry("v", 1, 100, &[])).unwrap();
        assert!(store.get_raw("k").is_some());

        store.remove("k");
        assert!(store.get_raw("k").is_none());
        assert_eq!(store.usage(), 0);
    }

    #[test]
    fn test_sweep_removes_expired_and_corrupt() {
        let mut store = store();
        store.put("live", raw_entry("a", 1, 1_000, &[])).unwrap();
        store.put("dead", raw_entry("b", 1, 100, &[])).unwrap();
        store.put("junk", "{broken".to_string()).unwrap();

        let removed = store.sweep_expired(500);
        assert_eq!(removed, 2);
        assert!(store.get_raw("live").is_some());
        assert!(store.get_raw("dead").is_none());
        assert!(store.get_raw("junk").is_none());
    }

    #[test]
    fn test_sweep_boundary() {
        let mut store = store();
        store.put("edge", raw_entry("a", 1, 500, &[])).unwrap();

        // Expiry is inclusive at expires_at
        assert_eq!(store.sweep_expired(499), 0);
        assert_eq!(store.sweep_expired(500), 1);
    }

    #[test]
    fn test_evict_until_oldest_first() {
        let mut store = store();
        store.put("old", raw_entry("aaaaaaaaaa", 100, 9_999, &[])).unwrap();
        store.put("mid", raw_entry("bbbbbbbbbb", 200, 9_999, &[])).unwrap();
        store.put("new", raw_entry("cccccccccc", 300, 9_999, &[])).unwrap();

        let per_entry = store.usage() / 3;
        let evicted = store.evict_until(per_entry * 2);

        assert_eq!(evicted, 1);
        assert!(store.get_raw("old").is_none());
        assert!(store.get_raw("mid").is_some());
        assert!(store.get_raw("new").is_some());
        assert!(store.usage() <= per_entry * 2);
    }

    #[test]
    fn test_evict_until_noop_under_limit() {
        let mut store = store();
        store.put("k", raw_entry("v", 1, 100, &[])).unwrap();
        assert_eq!(store.evict_until(u64::MAX), 0);
        assert!(store.get_raw("k").is_some());
    }

    #[test]
    fn test_delete_by_tag() {
        let mut store = store();
        store
            .put("p1", raw_entry("a", 1, 9_999, &["products"]))
            .unwrap();
        store
            .put("p2", raw_entry("b", 1, 9_999, &["products", "featured"]))
            .unwrap();
        store.put("u1", raw_entry("c", 1, 9_999, &["users"])).unwrap();
        store.put("junk", "{broken".to_string()).unwrap();

        assert_eq!(store.delete_by_tag("products"), 2);
        assert!(store.get_raw("p1").is_none());
        assert!(store.get_raw("p2").is_none());
        assert!(store.get_raw("u1").is_some());
        assert!(store.get_raw("junk").is_some());

        assert_eq!(store.delete_by_tag("nope"), 0);
    }
}
