//! Error types for the tiered cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Storage Error Enum ==
/// Unified error type for the tiered cache.
///
/// Unrecoverable storage-engine failures are carried unchanged in
/// [`StorageError::Io`] rather than remapped, so callers that inspect the
/// native error still can. Failures the cache recovers from on its own
/// (corrupted entries on read, a single rejected write) never surface here.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Key is empty, too long, or contains characters outside `[A-Za-z0-9._-]`
    #[error("Invalid key: {0:?}")]
    InvalidKey(String),

    /// A single serialized entry cannot fit the selected backend at all
    #[error("Entry of {size} bytes exceeds the {backend} backend capacity of {limit} bytes")]
    EntryTooLarge {
        /// Name of the backend the write was addressed to
        backend: &'static str,
        /// Serialized entry size in bytes
        size: u64,
        /// The backend's configured capacity ceiling
        limit: u64,
    },

    /// The caller's payload failed to serialize
    #[error("Serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Native storage engine failure (initialization, read, write or sweep)
    #[error("Storage failure: {0}")]
    Io(#[from] std::io::Error),
}

// == Result Type Alias ==
/// Convenience Result type for the tiered cache.
pub type Result<T> = std::result::Result<T, StorageError>;
