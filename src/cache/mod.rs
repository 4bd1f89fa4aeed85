//! Cache Module
//!
//! The tiered cache facade, the entry envelope and the statistics types.

pub(crate) mod entry;
mod facade;
mod stats;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::CacheEntry;
pub use facade::TieredCache;
pub use stats::{BackendUsage, CacheMetrics, CacheStats, StorageStats};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 128;
