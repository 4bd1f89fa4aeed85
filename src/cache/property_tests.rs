//! Property-Based Tests for the Tiered Cache
//!
//! Uses proptest to verify the facade's behavioral properties. Everything
//! runs against the in-memory session backend so the filesystem and wall
//! clock cannot interfere with the generated cases.

use proptest::prelude::*;

use tempfile::{tempdir, TempDir};

use crate::backend::Backend;
use crate::cache::TieredCache;
use crate::config::CacheConfig;
use crate::error::StorageError;

// == Test Configuration ==
const TEST_CAPACITY: u64 = 2048;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Runtime::new().unwrap()
}

/// Session-only cache with the given capacity ceiling; the TempDir keeps the
/// root alive for the duration of the case.
fn session_cache(max_size: u64) -> (TieredCache, TempDir) {
    let dir = tempdir().unwrap();
    let mut config = CacheConfig::with_root(dir.path());
    config.session.max_size = max_size;
    (TieredCache::new(config), dir)
}

// == Strategies ==
/// Generates valid cache keys (non-empty, allowed characters only)
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9._-]{1,64}"
}

/// Generates printable cache values
fn valid_value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,256}"
}

/// Generates keys guaranteed to contain a rejected character
fn invalid_key_strategy() -> impl Strategy<Value = String> {
    "[a-z]{0,5}[ /:+][a-z]{0,5}"
}

/// A single cache operation for sequence-based properties
#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: String },
    Get { key: String },
    Delete { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (valid_key_strategy(), valid_value_strategy())
            .prop_map(|(key, value)| CacheOp::Set { key, value }),
        valid_key_strategy().prop_map(|key| CacheOp::Get { key }),
        valid_key_strategy().prop_map(|key| CacheOp::Delete { key }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Storing a value and reading it back before expiry returns exactly the
    // stored payload, with no envelope metadata attached.
    #[test]
    fn prop_roundtrip_storage(key in valid_key_strategy(), value in valid_value_strategy()) {
        let rt = runtime();
        rt.block_on(async {
            let (cache, _dir) = session_cache(TEST_CAPACITY);

            cache.set(&key, &value, Backend::Session).await.unwrap();
            let retrieved: Option<String> = cache.get(&key, Backend::Session).await.unwrap();

            prop_assert_eq!(retrieved, Some(value), "Round-trip value mismatch");
            Ok(())
        })?;
    }

    // After a delete, a read of the same key misses; deleting again is fine.
    #[test]
    fn prop_delete_removes_entry(key in valid_key_strategy(), value in valid_value_strategy()) {
        let rt = runtime();
        rt.block_on(async {
            let (cache, _dir) = session_cache(TEST_CAPACITY);

            cache.set(&key, &value, Backend::Session).await.unwrap();
            let before: Option<String> = cache.get(&key, Backend::Session).await.unwrap();
            prop_assert!(before.is_some(), "Key should exist before delete");

            cache.delete(&key, Backend::Session).await.unwrap();
            let after: Option<String> = cache.get(&key, Backend::Session).await.unwrap();
            prop_assert!(after.is_none(), "Key should not exist after delete");

            cache.delete(&key, Backend::Session).await.unwrap();
            Ok(())
        })?;
    }

    // Writing twice under one key leaves only the second value.
    #[test]
    fn prop_overwrite_semantics(
        key in valid_key_strategy(),
        value1 in valid_value_strategy(),
        value2 in valid_value_strategy()
    ) {
        let rt = runtime();
        rt.block_on(async {
            let (cache, _dir) = session_cache(TEST_CAPACITY);

            cache.set(&key, &value1, Backend::Session).await.unwrap();
            cache.set(&key, &value2, Backend::Session).await.unwrap();

            let retrieved: Option<String> = cache.get(&key, Backend::Session).await.unwrap();
            prop_assert_eq!(retrieved, Some(value2), "Overwrite should return new value");
            Ok(())
        })?;
    }

    // Usage never exceeds the capacity ceiling, no matter the write sequence.
    #[test]
    fn prop_capacity_enforcement(
        entries in prop::collection::vec(
            (valid_key_strategy(), valid_value_strategy()),
            1..40
        )
    ) {
        let rt = runtime();
        rt.block_on(async {
            let (cache, _dir) = session_cache(TEST_CAPACITY);

            for (key, value) in entries {
                cache.set(&key, &value, Backend::Session).await.unwrap();
                let used = cache.storage_stats().await.unwrap().session.used;
                prop_assert!(
                    used <= TEST_CAPACITY,
                    "Usage {} exceeds ceiling {}",
                    used,
                    TEST_CAPACITY
                );
            }
            Ok(())
        })?;
    }

    // Hit and miss counters reflect exactly what reads observed.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        let rt = runtime();
        rt.block_on(async {
            let (cache, _dir) = session_cache(u64::MAX);
            let mut expected_hits: u64 = 0;
            let mut expected_misses: u64 = 0;

            for op in ops {
                match op {
                    CacheOp::Set { key, value } => {
                        cache.set(&key, &value, Backend::Session).await.unwrap();
                    }
                    CacheOp::Get { key } => {
                        let got: Option<String> =
                            cache.get(&key, Backend::Session).await.unwrap();
                        match got {
                            Some(_) => expected_hits += 1,
                            None => expected_misses += 1,
                        }
                    }
                    CacheOp::Delete { key } => {
                        cache.delete(&key, Backend::Session).await.unwrap();
                    }
                }
            }

            let stats = cache.stats().session;
            prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
            prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
            Ok(())
        })?;
    }

    // Keys with characters outside the allowed set are rejected on every
    // operation before any backend is touched.
    #[test]
    fn prop_invalid_keys_rejected(key in invalid_key_strategy(), value in valid_value_strategy()) {
        let rt = runtime();
        rt.block_on(async {
            let (cache, _dir) = session_cache(TEST_CAPACITY);

            let set_err = cache.set(&key, &value, Backend::Session).await.unwrap_err();
            prop_assert!(matches!(set_err, StorageError::InvalidKey(_)));

            let get_err = cache.get::<String>(&key, Backend::Session).await.unwrap_err();
            prop_assert!(matches!(get_err, StorageError::InvalidKey(_)));

            let used = cache.storage_stats().await.unwrap().session.used;
            prop_assert_eq!(used, 0, "Rejected writes must not store anything");
            Ok(())
        })?;
    }
}

// Separate proptest block with fewer cases for the tag-scan property, which
// writes a whole batch of entries per case
proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    // delete_by_tag removes exactly the entries carrying the tag.
    #[test]
    fn prop_tag_invalidation(
        keyed in prop::collection::hash_map(valid_key_strategy(), any::<bool>(), 1..20)
    ) {
        let rt = runtime();
        rt.block_on(async {
            let (cache, _dir) = session_cache(u64::MAX);
            let mut tagged_count = 0usize;

            for (key, tagged) in &keyed {
                let tags: &[&str] = if *tagged { &["sale"] } else { &[] };
                cache
                    .set_tagged(key, &"v".to_string(), Backend::Session, tags)
                    .await
                    .unwrap();
                if *tagged {
                    tagged_count += 1;
                }
            }

            let removed = cache.delete_by_tag("sale", Backend::Session).await.unwrap();
            prop_assert_eq!(removed, tagged_count, "Tag scan removed the wrong count");

            for (key, tagged) in &keyed {
                let got: Option<String> = cache.get(key, Backend::Session).await.unwrap();
                prop_assert_eq!(
                    got.is_none(),
                    *tagged,
                    "Key {} tagged={} has wrong presence",
                    key,
                    tagged
                );
            }
            Ok(())
        })?;
    }
}
