//! Tiercache - a lightweight tiered key/value cache
//!
//! Three storage engines behind one facade: a partitioned on-disk store for
//! large long-lived entries, a flat write-through file for small persistent
//! entries, and an in-memory store scoped to the process session. Every entry
//! carries a TTL and is lazily removed on read once it expires; each backend
//! enforces its own capacity ceiling by sweeping expired entries first and
//! evicting oldest-first after.
//!
//! ```no_run
//! use tiercache::{Backend, CacheConfig, Partition, TieredCache};
//!
//! # async fn demo() -> tiercache::Result<()> {
//! let cache = TieredCache::new(CacheConfig::default());
//!
//! // Long-lived catalog data goes to the partitioned disk store
//! cache
//!     .set("product-17", &("hoodie", 4999u32), Backend::Disk(Partition::Products))
//!     .await?;
//!
//! // Short-lived lookups go to the session store
//! cache.set("search-hoodie", &vec![17u32, 23, 41], Backend::Session).await?;
//!
//! let hit: Option<(String, u32)> =
//!     cache.get("product-17", Backend::Disk(Partition::Products)).await?;
//! assert!(hit.is_some());
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use backend::backing::{FileBacking, FlatBacking, MemoryBacking};
pub use backend::{Backend, Partition};
pub use cache::{BackendUsage, CacheEntry, CacheMetrics, CacheStats, StorageStats, TieredCache};
pub use config::{CacheConfig, StorageConfig};
pub use error::{Result, StorageError};
pub use tasks::spawn_sweep_task;
