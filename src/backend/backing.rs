//! Flat Backing Module
//!
//! The raw synchronous string namespaces the flat stores keep entries in,
//! plus the two engines shipped with the crate. The trait is public so
//! embedders and tests can plug in their own engine, for example one that
//! rejects writes to exercise the quota recovery path.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use tracing::warn;

// == Flat Backing Trait ==
/// A raw string namespace with synchronous access.
///
/// Implementations store opaque strings; entry semantics (expiry, tags,
/// corruption) live one level up in the flat store adapter. Only writes can
/// fail: quota and I/O problems surface as native errors for the facade's
/// recovery policy, while removals are best-effort.
pub trait FlatBacking: Send + Sync {
    /// Returns the raw string stored under `key`, if any.
    fn read(&self, key: &str) -> Option<String>;

    /// Stores `raw` under `key`, replacing any previous value.
    ///
    /// A failed write must leave the namespace as if the call never happened.
    fn write(&mut self, key: &str, raw: String) -> io::Result<()>;

    /// Removes `key`; removing an absent key is a no-op.
    fn remove(&mut self, key: &str);

    /// Returns every key currently in the namespace, in no particular order.
    fn keys(&self) -> Vec<String>;

    /// Removes every key in the namespace.
    fn clear(&mut self);

    /// Sum of the lengths of all stored strings, in bytes.
    fn bytes_used(&self) -> u64;
}

// == Memory Backing ==
/// Session-scoped backing: a plain in-memory map, gone when the process
/// ends.
#[derive(Debug, Default)]
pub struct MemoryBacking {
    map: HashMap<String, String>,
}

impl MemoryBacking {
    /// Creates an empty in-memory namespace.
    pub fn new() -> Self {
        Self::default()
    }
}

impl FlatBacking for MemoryBacking {
    fn read(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    fn write(&mut self, key: &str, raw: String) -> io::Result<()> {
        self.map.insert(key.to_string(), raw);
        Ok(())
    }

    fn remove(&mut self, key: &str) {
        self.map.remove(key);
    }

    fn keys(&self) -> Vec<String> {
        self.map.keys().cloned().collect()
    }

    fn clear(&mut self) {
        self.map.clear();
    }

    fn bytes_used(&self) -> u64 {
        self.map.values().map(|v| v.len() as u64).sum()
    }
}

// == File Backing ==
/// Persistent backing: the whole namespace lives in memory and is written
/// through to a single JSON map file on every mutation.
///
/// Opening never fails. A missing file starts an empty namespace; an
/// unreadable or corrupt file also starts empty, with a warning, so the
/// backend stays available after a bad shutdown. When write-through fails on
/// `remove` or `clear` the updated in-memory state keeps serving and the
/// stale file is overwritten by the next successful write.
#[derive(Debug)]
pub struct FileBacking {
    path: PathBuf,
    map: HashMap<String, String>,
}

impl FileBacking {
    /// Opens the namespace persisted at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let map = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(map) => map,
                Err(err) => {
                    warn!(
                        "discarding corrupt flat store file {}: {}",
                        path.display(),
                        err
                    );
                    HashMap::new()
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => {
                warn!("cannot read flat store file {}: {}", path.display(), err);
                HashMap::new()
            }
        };
        Self { path, map }
    }

    /// Serializes the namespace and writes it through to disk.
    fn persist(&self) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string(&self.map).map_err(io::Error::other)?;
        fs::write(&self.path, contents)
    }
}

impl FlatBacking for FileBacking {
    fn read(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    fn write(&mut self, key: &str, raw: String) -> io::Result<()> {
        let previous = self.map.insert(key.to_string(), raw);
        if let Err(err) = self.persist() {
            // Roll back so memory and disk cannot drift apart.
            match previous {
                Some(old) => {
                    self.map.insert(key.to_string(), old);
                }
                None => {
                    self.map.remove(key);
                }
            }
            return Err(err);
        }
        Ok(())
    }

    fn remove(&mut self, key: &str) {
        if self.map.remove(key).is_some() {
            if let Err(err) = self.persist() {
                warn!("flat store removal of {:?} not persisted: {}", key, err);
            }
        }
    }

    fn keys(&self) -> Vec<String> {
        self.map.keys().cloned().collect()
    }

    fn clear(&mut self) {
        self.map.clear();
        if let Err(err) = self.persist() {
            warn!("flat store clear not persisted: {}", err);
        }
    }

    fn bytes_used(&self) -> u64 {
        self.map.values().map(|v| v.len() as u64).sum()
    }
}
