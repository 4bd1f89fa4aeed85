//! Tiered Cache Facade
//!
//! One uniform contract over the three storage engines. Payloads are wrapped
//! with expiry, version and tag metadata on the way in, unwrapped and
//! expiry-checked on the way out, and the write-failure and capacity policies
//! apply identically no matter which backend a call selects.

use std::future::Future;
use std::io;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::backend::backing::{FileBacking, FlatBacking, MemoryBacking};
use crate::backend::{Backend, DiskStore, FlatStore};
use crate::cache::entry::{now_millis, CacheEntry};
use crate::cache::stats::{BackendUsage, CacheMetrics, Counters, StorageStats};
use crate::cache::MAX_KEY_LENGTH;
use crate::config::{CacheConfig, StorageConfig};
use crate::error::{Result, StorageError};

/// Name of the flat persistent store file under the cache root.
const LOCAL_STORE_FILE: &str = "local.json";
/// Name of the disk store directory under the cache root.
const DISK_STORE_DIR: &str = "disk";

// == Tiered Cache ==
/// Uniform facade over the disk, local and session backends.
///
/// The handle is cheap to clone and safe to share across tasks; construct one
/// per cache root and hand clones to whatever needs caching. Dropping the
/// last clone needs no teardown, the persistent backends are written through
/// on every mutation.
#[derive(Clone)]
pub struct TieredCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    config: CacheConfig,
    disk: DiskStore,
    local: RwLock<FlatStore>,
    session: RwLock<FlatStore>,
    disk_counters: Counters,
    local_counters: Counters,
    session_counters: Counters,
}

impl TieredCache {
    // == Construction ==
    /// Creates a cache with the default engines: a partitioned disk store and
    /// a flat file store under `config.root_dir`, plus an in-memory session
    /// store.
    ///
    /// Nothing touches the filesystem for the disk backend until its first
    /// operation; the flat file store loads its namespace eagerly so a
    /// corrupt file is discarded (with a warning) right here rather than
    /// mid-traffic.
    pub fn new(config: CacheConfig) -> Self {
        let local = FileBacking::open(config.root_dir.join(LOCAL_STORE_FILE));
        Self::with_backings(config, Box::new(local), Box::new(MemoryBacking::new()))
    }

    /// Creates a cache with caller-supplied flat backings.
    ///
    /// The disk backend always uses the partitioned store under
    /// `config.root_dir`; the two flat backings are injectable so embedders
    /// and tests can substitute their own engines.
    pub fn with_backings(
        config: CacheConfig,
        local: Box<dyn FlatBacking>,
        session: Box<dyn FlatBacking>,
    ) -> Self {
        let disk = DiskStore::new(config.root_dir.join(DISK_STORE_DIR));
        Self {
            inner: Arc::new(CacheInner {
                config,
                disk,
                local: RwLock::new(FlatStore::new(local)),
                session: RwLock::new(FlatStore::new(session)),
                disk_counters: Counters::default(),
                local_counters: Counters::default(),
                session_counters: Counters::default(),
            }),
        }
    }

    /// The configuration this cache was built with.
    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    // == Set ==
    /// Stores a serializable value under `key` in the selected backend.
    ///
    /// The value is wrapped in a [`CacheEntry`] stamped with the current
    /// time and the backend's TTL and version; writing replaces any previous
    /// entry for the key. If the backend rejects the write, one expired-entry
    /// sweep runs and the write is retried once before the original error
    /// propagates. After a successful write the backend's capacity ceiling is
    /// enforced, evicting oldest entries first if a sweep alone does not get
    /// usage back under [`StorageConfig::max_size`].
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, backend: Backend) -> Result<()> {
        self.set_tagged(key, value, backend, &[]).await
    }

    /// Stores a value with invalidation tags attached.
    ///
    /// Tags are recorded in the entry's metadata and queried by
    /// [`TieredCache::delete_by_tag`]; they have no effect on reads.
    pub async fn set_tagged<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        backend: Backend,
        tags: &[&str],
    ) -> Result<()> {
        validate_key(key)?;
        let policy = self.backend_policy(backend);
        let tags = tags.iter().map(|t| t.to_string()).collect();
        let entry = CacheEntry::new(value, policy.ttl, &policy.version, tags);
        let raw = serde_json::to_string(&entry)?;
        if raw.len() as u64 > policy.max_size {
            return Err(StorageError::EntryTooLarge {
                backend: backend.name(),
                size: raw.len() as u64,
                limit: policy.max_size,
            });
        }

        if let Err(first) = self.write_raw(backend, key, raw.clone()).await {
            warn!(
                "{} write for {:?} failed, sweeping and retrying: {}",
                backend, key, first
            );
            if let Err(err) = self.sweep_backend(backend).await {
                debug!("recovery sweep on {} failed: {}", backend.name(), err);
            }
            if self.write_raw(backend, key, raw).await.is_err() {
                return Err(first.into());
            }
        }

        self.enforce_capacity(backend).await
    }

    // == Get ==
    /// Retrieves the value stored under `key`, or `None` on a miss.
    ///
    /// An entry whose TTL has elapsed is removed as a side effect of the read
    /// and reported as a miss, so callers never observe stale data. An entry
    /// that cannot be decoded as a `CacheEntry<T>` is reported as a miss and
    /// left for the next sweep to reclaim; corruption is never an error.
    pub async fn get<T: DeserializeOwned>(&self, key: &str, backend: Backend) -> Result<Option<T>> {
        validate_key(key)?;
        let counters = self.counters(backend);
        let raw = match self.read_raw(backend, key).await? {
            Some(raw) => raw,
            None => {
                counters.record_miss();
                return Ok(None);
            }
        };

        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(
                    "undecodable {} entry for {:?}, treating as miss: {}",
                    backend, key, err
                );
                counters.record_miss();
                return Ok(None);
            }
        };

        if entry.is_expired() {
            if let Err(err) = self.delete_raw(backend, key).await {
                debug!("removal of expired {:?} from {} failed: {}", key, backend, err);
            }
            counters.record_expirations(1);
            counters.record_miss();
            return Ok(None);
        }

        counters.record_hit();
        Ok(Some(entry.data))
    }

    // == Get Or Load ==
    /// Returns the cached value for `key`, or awaits `load` and caches its
    /// result under the selected backend.
    ///
    /// The cache stays a pure optimization here: a failed read falls back to
    /// the loader and a failed write after loading is logged and swallowed,
    /// so callers only ever see loader errors. The loader runs once per miss
    /// and not at all on a hit.
    pub async fn get_or_load<T, E, F, Fut>(
        &self,
        key: &str,
        backend: Backend,
        load: F,
    ) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        match self.get::<T>(key, backend).await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {}
            Err(err) => warn!("cache read for {:?} failed, using loader: {}", key, err),
        }

        let value = load().await?;
        if let Err(err) = self.set(key, &value, backend).await {
            warn!("caching loaded value for {:?} failed: {}", key, err);
        }
        Ok(value)
    }

    // == Delete ==
    /// Removes the entry under `key`; removing an absent key is not an
    /// error.
    pub async fn delete(&self, key: &str, backend: Backend) -> Result<()> {
        validate_key(key)?;
        self.delete_raw(backend, key).await?;
        Ok(())
    }

    // == Clear ==
    /// Removes every entry in the selected backend. For the disk backend
    /// this clears only the named partition.
    pub async fn clear(&self, backend: Backend) -> Result<()> {
        match backend {
            Backend::Disk(partition) => self.inner.disk.clear(partition).await?,
            Backend::Local => self.inner.local.write().await.clear(),
            Backend::Session => self.inner.session.write().await.clear(),
        }
        Ok(())
    }

    /// Removes every entry from every backend, all disk partitions included.
    pub async fn clear_all(&self) -> Result<()> {
        self.inner.disk.clear_all().await?;
        self.inner.local.write().await.clear();
        self.inner.session.write().await.clear();
        Ok(())
    }

    // == Tag Invalidation ==
    /// Removes every entry carrying `tag` and returns the count. For the
    /// disk backend this scans only the named partition.
    pub async fn delete_by_tag(&self, tag: &str, backend: Backend) -> Result<usize> {
        let removed = match backend {
            Backend::Disk(partition) => self.inner.disk.delete_by_tag(partition, tag).await?,
            Backend::Local => self.inner.local.write().await.delete_by_tag(tag),
            Backend::Session => self.inner.session.write().await.delete_by_tag(tag),
        };
        Ok(removed)
    }

    // == Expiry Sweep ==
    /// Removes expired and undecodable entries from the selected backend and
    /// returns the count. For the disk backend this sweeps only the named
    /// partition; [`TieredCache::clean_all_expired`] covers everything.
    pub async fn clean_expired(&self, backend: Backend) -> Result<usize> {
        let now = now_millis();
        let removed = match backend {
            Backend::Disk(partition) => self.inner.disk.sweep_partition(partition, now).await?,
            Backend::Local => self.inner.local.write().await.sweep_expired(now),
            Backend::Session => self.inner.session.write().await.sweep_expired(now),
        };
        self.counters(backend).record_expirations(removed as u64);
        Ok(removed)
    }

    /// Sweeps every backend and returns the total number of entries removed.
    pub async fn clean_all_expired(&self) -> Result<usize> {
        let now = now_millis();

        let disk = self.inner.disk.sweep_all(now).await?;
        self.inner.disk_counters.record_expirations(disk as u64);

        let local = self.inner.local.write().await.sweep_expired(now);
        self.inner.local_counters.record_expirations(local as u64);

        let session = self.inner.session.write().await.sweep_expired(now);
        self.inner.session_counters.record_expirations(session as u64);

        Ok(disk + local + session)
    }

    // == Stats ==
    /// Space accounting for all three backends.
    ///
    /// Usage is measured from what is physically stored, so expired entries
    /// that have not been read or swept yet still count.
    pub async fn storage_stats(&self) -> Result<StorageStats> {
        Ok(StorageStats {
            disk: BackendUsage::new(
                self.inner.disk.usage().await?,
                self.inner.config.disk.max_size,
            ),
            local: BackendUsage::new(
                self.inner.local.read().await.usage(),
                self.inner.config.local.max_size,
            ),
            session: BackendUsage::new(
                self.inner.session.read().await.usage(),
                self.inner.config.session.max_size,
            ),
        })
    }

    /// Hit/miss/expiration/eviction counters for all three backends.
    pub fn stats(&self) -> CacheMetrics {
        CacheMetrics {
            disk: self.inner.disk_counters.snapshot(),
            local: self.inner.local_counters.snapshot(),
            session: self.inner.session_counters.snapshot(),
        }
    }

    // == Capacity Enforcement ==
    /// Applies the capacity policy after a write: if the backend is over its
    /// ceiling, sweep expired entries first, then evict oldest-first until
    /// usage fits.
    async fn enforce_capacity(&self, backend: Backend) -> Result<()> {
        let limit = self.backend_policy(backend).max_size;
        if self.backend_usage(backend).await? <= limit {
            return Ok(());
        }

        let swept = self.sweep_backend(backend).await?;
        if swept > 0 {
            debug!(
                "{} over capacity, sweep reclaimed {} expired entries",
                backend.name(),
                swept
            );
        }
        if self.backend_usage(backend).await? <= limit {
            return Ok(());
        }

        let evicted = match backend {
            Backend::Disk(_) => self.inner.disk.evict_until(limit).await?,
            Backend::Local => self.inner.local.write().await.evict_until(limit),
            Backend::Session => self.inner.session.write().await.evict_until(limit),
        };
        if evicted > 0 {
            self.counters(backend).record_evictions(evicted as u64);
            debug!("{} capacity enforcement evicted {} entries", backend.name(), evicted);
        }
        Ok(())
    }

    /// Backend-wide expired-entry sweep, used by write recovery and capacity
    /// enforcement. Unlike [`TieredCache::clean_expired`] this covers every
    /// disk partition, since capacity is accounted per backend.
    async fn sweep_backend(&self, backend: Backend) -> io::Result<usize> {
        let now = now_millis();
        let removed = match backend {
            Backend::Disk(_) => self.inner.disk.sweep_all(now).await?,
            Backend::Local => self.inner.local.write().await.sweep_expired(now),
            Backend::Session => self.inner.session.write().await.sweep_expired(now),
        };
        self.counters(backend).record_expirations(removed as u64);
        Ok(removed)
    }

    // == Backend Dispatch ==
    fn backend_policy(&self, backend: Backend) -> &StorageConfig {
        match backend {
            Backend::Disk(_) => &self.inner.config.disk,
            Backend::Local => &self.inner.config.local,
            Backend::Session => &self.inner.config.session,
        }
    }

    fn counters(&self, backend: Backend) -> &Counters {
        match backend {
            Backend::Disk(_) => &self.inner.disk_counters,
            Backend::Local => &self.inner.local_counters,
            Backend::Session => &self.inner.session_counters,
        }
    }

    async fn read_raw(&self, backend: Backend, key: &str) -> io::Result<Option<String>> {
        match backend {
            Backend::Disk(partition) => self.inner.disk.get_raw(partition, key).await,
            Backend::Local => Ok(self.inner.local.read().await.get_raw(key)),
            Backend::Session => Ok(self.inner.session.read().await.get_raw(key)),
        }
    }

    async fn write_raw(&self, backend: Backend, key: &str, raw: String) -> io::Result<()> {
        match backend {
            Backend::Disk(partition) => self.inner.disk.put(partition, key, raw).await,
            Backend::Local => self.inner.local.write().await.put(key, raw),
            Backend::Session => self.inner.session.write().await.put(key, raw),
        }
    }

    async fn delete_raw(&self, backend: Backend, key: &str) -> io::Result<()> {
        match backend {
            Backend::Disk(partition) => self.inner.disk.remove(partition, key).await,
            Backend::Local => {
                self.inner.local.write().await.remove(key);
                Ok(())
            }
            Backend::Session => {
                self.inner.session.write().await.remove(key);
                Ok(())
            }
        }
    }

    async fn backend_usage(&self, backend: Backend) -> io::Result<u64> {
        match backend {
            Backend::Disk(_) => self.inner.disk.usage().await,
            Backend::Local => Ok(self.inner.local.read().await.usage()),
            Backend::Session => Ok(self.inner.session.read().await.usage()),
        }
    }
}

// == Key Validation ==
/// Checks the key convention shared by every backend: non-empty, at most
/// [`MAX_KEY_LENGTH`] bytes, characters limited to `[A-Za-z0-9._-]` so a key
/// is always a valid file name inside a disk partition.
fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key.len() <= MAX_KEY_LENGTH
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'));
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}
