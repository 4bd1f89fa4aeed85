//! Configuration Module
//!
//! Per-backend storage policies and the top-level cache configuration,
//! loadable from environment variables with sensible defaults.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

// Defaults per backend: the disk tier is large and long-lived, the local
// file tier is small and medium-lived, the session tier sits in between
// with the shortest TTL.
const DEFAULT_DISK_MAX_BYTES: u64 = 50 * 1024 * 1024;
const DEFAULT_DISK_TTL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_LOCAL_MAX_BYTES: u64 = 5 * 1024 * 1024;
const DEFAULT_LOCAL_TTL_SECS: u64 = 2 * 60 * 60;
const DEFAULT_SESSION_MAX_BYTES: u64 = 10 * 1024 * 1024;
const DEFAULT_SESSION_TTL_SECS: u64 = 30 * 60;
const DEFAULT_VERSION: &str = "1.0.0";

/// Storage policy for a single backend.
///
/// Each of the three backends carries its own policy; nothing is shared, so
/// shrinking the session tier never affects what the disk tier may hold.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Capacity ceiling in bytes, enforced after every write
    pub max_size: u64,
    /// Time-to-live stamped into entries written under this policy
    pub ttl: Duration,
    /// Version string stamped into new entries; stored, not checked on read
    pub version: String,
    /// Reserved for payload compression; entries are stored uncompressed
    pub compression: bool,
}

impl StorageConfig {
    /// Creates a policy with the given capacity and TTL and the default
    /// version.
    pub fn new(max_size: u64, ttl: Duration) -> Self {
        Self {
            max_size,
            ttl,
            version: DEFAULT_VERSION.to_string(),
            compression: false,
        }
    }
}

/// Top-level cache configuration: where the persistent backends live on disk
/// and the per-backend storage policies.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Directory holding the disk partitions and the flat local store file
    pub root_dir: PathBuf,
    /// Policy for the structured persistent backend
    pub disk: StorageConfig,
    /// Policy for the flat persistent backend
    pub local: StorageConfig,
    /// Policy for the flat session backend
    pub session: StorageConfig,
}

impl CacheConfig {
    /// Creates a configuration rooted at `root_dir` with default policies.
    pub fn with_root(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            ..Self::default()
        }
    }

    /// Creates a configuration by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `TIERCACHE_DIR` - Cache root directory (default: `<tmp>/tiercache`)
    /// - `TIERCACHE_DISK_MAX_BYTES` / `TIERCACHE_DISK_TTL_SECS`
    /// - `TIERCACHE_LOCAL_MAX_BYTES` / `TIERCACHE_LOCAL_TTL_SECS`
    /// - `TIERCACHE_SESSION_MAX_BYTES` / `TIERCACHE_SESSION_TTL_SECS`
    /// - `TIERCACHE_VERSION` - Version stamped into new entries (all backends)
    pub fn from_env() -> Self {
        let version =
            env::var("TIERCACHE_VERSION").unwrap_or_else(|_| DEFAULT_VERSION.to_string());
        let policy = |max_var: &str, max_default, ttl_var: &str, ttl_default| StorageConfig {
            max_size: env_u64(max_var, max_default),
            ttl: Duration::from_secs(env_u64(ttl_var, ttl_default)),
            version: version.clone(),
            compression: false,
        };
        Self {
            root_dir: env::var("TIERCACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_root()),
            disk: policy(
                "TIERCACHE_DISK_MAX_BYTES",
                DEFAULT_DISK_MAX_BYTES,
                "TIERCACHE_DISK_TTL_SECS",
                DEFAULT_DISK_TTL_SECS,
            ),
            local: policy(
                "TIERCACHE_LOCAL_MAX_BYTES",
                DEFAULT_LOCAL_MAX_BYTES,
                "TIERCACHE_LOCAL_TTL_SECS",
                DEFAULT_LOCAL_TTL_SECS,
            ),
            session: policy(
                "TIERCACHE_SESSION_MAX_BYTES",
                DEFAULT_SESSION_MAX_BYTES,
                "TIERCACHE_SESSION_TTL_SECS",
                DEFAULT_SESSION_TTL_SECS,
            ),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root(),
            disk: StorageConfig::new(
                DEFAULT_DISK_MAX_BYTES,
                Duration::from_secs(DEFAULT_DISK_TTL_SECS),
            ),
            local: StorageConfig::new(
                DEFAULT_LOCAL_MAX_BYTES,
                Duration::from_secs(DEFAULT_LOCAL_TTL_SECS),
            ),
            session: StorageConfig::new(
                DEFAULT_SESSION_MAX_BYTES,
                Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            ),
        }
    }
}

fn default_root() -> PathBuf {
    env::temp_dir().join("tiercache")
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
