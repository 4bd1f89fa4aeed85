//! Disk Store Module
//!
//! The structured persistent backend: one JSON file per entry inside a fixed
//! schema of partition directories. All access is asynchronous and the
//! directory schema is created lazily on first use.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::backend::Partition;
use crate::cache::entry::decode_raw;

// == Disk Store ==
/// Asynchronous partitioned store rooted at one directory.
pub(crate) struct DiskStore {
    root: PathBuf,
    /// Memoized schema setup. The first operation creates the partition
    /// directories and every concurrent first caller awaits the same
    /// in-flight attempt; a failed attempt is not cached, so the next
    /// operation retries from scratch.
    init: OnceCell<()>,
}

impl DiskStore {
    pub(crate) fn new(root: PathBuf) -> Self {
        Self {
            root,
            init: OnceCell::new(),
        }
    }

    /// Creates the partition directory schema once per store.
    async fn ensure_init(&self) -> io::Result<()> {
        self.init
            .get_or_try_init(|| async {
                for partition in Partition::ALL {
                    fs::create_dir_all(self.root.join(partition.dir_name())).await?;
                }
                debug!("disk store initialized at {}", self.root.display());
                Ok(())
            })
            .await
            .map(|_| ())
    }

    fn partition_dir(&self, partition: Partition) -> PathBuf {
        self.root.join(partition.dir_name())
    }

    fn entry_path(&self, partition: Partition, key: &str) -> PathBuf {
        self.partition_dir(partition).join(format!("{key}.json"))
    }

    // == Raw Access ==
    pub(crate) async fn get_raw(
        &self,
        partition: Partition,
        key: &str,
    ) -> io::Result<Option<String>> {
        self.ensure_init().await?;
        match fs::read_to_string(self.entry_path(partition, key)).await {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub(crate) async fn put(&self, partition: Partition, key: &str, raw: String) -> io::Result<()> {
        self.ensure_init().await?;
        fs::write(self.entry_path(partition, key), raw).await
    }

    pub(crate) async fn remove(&self, partition: Partition, key: &str) -> io::Result<()> {
        self.ensure_init().await?;
        match fs::remove_file(self.entry_path(partition, key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }

    // == Clearing ==
    /// Removes every entry file in one partition, keeping the directory.
    pub(crate) async fn clear(&self, partition: Partition) -> io::Result<()> {
        self.ensure_init().await?;
        let mut entries = fs::read_dir(self.partition_dir(partition)).await?;
        while let Some(dirent) = entries.next_entry().await? {
            if dirent.file_type().await?.is_file() {
                fs::remove_file(dirent.path()).await?;
            }
        }
        Ok(())
    }

    pub(crate) async fn clear_all(&self) -> io::Result<()> {
        for partition in Partition::ALL {
            self.clear(partition).await?;
        }
        Ok(())
    }

    // == Usage ==
    /// Sum of all entry file sizes across the partitions.
    pub(crate) async fn usage(&self) -> io::Result<u64> {
        self.ensure_init().await?;
        let mut total = 0;
        for partition in Partition::ALL {
            let mut entries = fs::read_dir(self.partition_dir(partition)).await?;
            while let Some(dirent) = entries.next_entry().await? {
                let meta = dirent.metadata().await?;
                if meta.is_file() {
                    total += meta.len();
                }
            }
        }
        Ok(total)
    }

    // == Expiry Sweep ==
    pub(crate) async fn sweep_partition(
        &self,
        partition: Partition,
        now: u64,
    ) -> io::Result<usize> {
        self.ensure_init().await?;
        self.sweep_dir(&self.partition_dir(partition), now).await
    }

    pub(crate) async fn sweep_all(&self, now: u64) -> io::Result<usize> {
        self.ensure_init().await?;
        let mut removed = 0;
        for partition in Partition::ALL {
            removed += self.sweep_dir(&self.partition_dir(partition), now).await?;
        }
        Ok(removed)
    }

    /// Removes expired and undecodable entry files from one directory.
    async fn sweep_dir(&self, dir: &Path, now: u64) -> io::Result<usize> {
        let mut removed = 0;
        let mut entries = fs::read_dir(dir).await?;
        while let Some(dirent) = entries.next_entry().await? {
            let path = dirent.path();
            if !dirent.file_type().await?.is_file() {
                continue;
            }
            let raw = match fs::read_to_string(&path).await {
                Ok(raw) => raw,
                // Vanished mid-sweep, nothing left to remove
                Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                Err(err) => return Err(err),
            };
            let stale = decode_raw(&raw)
                .map(|entry| entry.is_expired_at(now))
                .unwrap_or(true);
            if stale {
                self.remove_file_if_present(&path).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    // == Eviction ==
    /// Removes oldest-by-timestamp entry files across all partitions until
    /// total usage fits under `max_bytes`; returns the number removed.
    pub(crate) async fn evict_until(&self, max_bytes: u64) -> io::Result<usize> {
        self.ensure_init().await?;
        let mut candidates: Vec<(PathBuf, u64, u64)> = Vec::new();
        let mut used = 0;
        for partition in Partition::ALL {
            let mut entries = fs::read_dir(self.partition_dir(partition)).await?;
            while let Some(dirent) = entries.next_entry().await? {
                let path = dirent.path();
                if !dirent.file_type().await?.is_file() {
                    continue;
                }
                let raw = match fs::read_to_string(&path).await {
                    Ok(raw) => raw,
                    Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                    Err(err) => return Err(err),
                };
                let timestamp = decode_raw(&raw).map(|e| e.timestamp).unwrap_or(0);
                used += raw.len() as u64;
                candidates.push((path, timestamp, raw.len() as u64));
            }
        }
        if used <= max_bytes {
            return Ok(0);
        }

        candidates.sort_by_key(|(_, timestamp, _)| *timestamp);
        let mut evicted = 0;
        for (path, _, size) in candidates {
            if used <= max_bytes {
                break;
            }
            self.remove_file_if_present(&path).await?;
            used = used.saturating_sub(size);
            evicted += 1;
        }
        Ok(evicted)
    }

    // == Tag Invalidation ==
    /// Removes every entry file in the partition carrying `tag`; returns the
    /// count.
    pub(crate) async fn delete_by_tag(&self, partition: Partition, tag: &str) -> io::Result<usize> {
        self.ensure_init().await?;
        let mut removed = 0;
        let mut entries = fs::read_dir(self.partition_dir(partition)).await?;
        while let Some(dirent) = entries.next_entry().await? {
            let path = dirent.path();
            if !dirent.file_type().await?.is_file() {
                continue;
            }
            let tagged = match fs::read_to_string(&path).await {
                Ok(raw) => decode_raw(&raw)
                    .map(|entry| entry.tags.iter().any(|t| t == tag))
                    .unwrap_or(false),
                Err(_) => false,
            };
            if tagged {
                self.remove_file_if_present(&path).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn remove_file_if_present(&self, path: &Path) -> io::Result<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }
}
