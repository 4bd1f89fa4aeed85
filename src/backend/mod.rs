//! Backend Module
//!
//! The three storage engines behind the facade and the selector types callers
//! use to address them.
//!
//! # Backends
//! - `Disk(partition)` - structured persistent store: asynchronous, on-disk,
//!   partitioned, for large long-lived payloads
//! - `Local` - flat persistent store: synchronous, one file, for small
//!   payloads that must survive restarts
//! - `Session` - flat session store: synchronous, in-memory, gone when the
//!   process ends

pub mod backing;
mod disk;
mod flat;

pub(crate) use disk::DiskStore;
pub(crate) use flat::FlatStore;

use std::fmt;

// == Partition ==
/// Named subdivision of the disk backend.
///
/// The set of partitions is a fixed schema: every directory is created when
/// the disk backend initializes, and callers name the partition explicitly on
/// each disk operation, so an entry can never land in the wrong one.
/// `General` is the catch-all for entries that fit no specific domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    Products,
    Users,
    Wishlist,
    Cart,
    Search,
    Analytics,
    General,
}

impl Partition {
    /// Every partition, in schema order.
    pub const ALL: [Partition; 7] = [
        Partition::Products,
        Partition::Users,
        Partition::Wishlist,
        Partition::Cart,
        Partition::Search,
        Partition::Analytics,
        Partition::General,
    ];

    /// Directory name of this partition under the disk store root.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Partition::Products => "products",
            Partition::Users => "users",
            Partition::Wishlist => "wishlist",
            Partition::Cart => "cart",
            Partition::Search => "search",
            Partition::Analytics => "analytics",
            Partition::General => "general",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

// == Backend ==
/// Selector for one of the three storage engines.
///
/// Callers pick the backend per call based on the durability and lifetime the
/// entry needs; the facade performs no routing of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Structured persistent store, addressed by partition
    Disk(Partition),
    /// Flat persistent store
    Local,
    /// Flat session-scoped store
    Session,
}

impl Backend {
    /// Engine name without the partition, used in logs, stats and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Disk(_) => "disk",
            Backend::Local => "local",
            Backend::Session => "session",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Disk(partition) => write!(f, "disk/{}", partition),
            Backend::Local => f.write_str("local"),
            Backend::Session => f.write_str("session"),
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_partition_dir_names_unique() {
        let names: HashSet<&str> = Partition::ALL.iter().map(|p| p.dir_name()).collect();
        assert_eq!(names.len(), Partition::ALL.len());
    }

    #[test]
    fn test_backend_display() {
        assert_eq!(Backend::Disk(Partition::Products).to_string(), "disk/products");
        assert_eq!(Backend::Local.to_string(), "local");
        assert_eq!(Backend::Session.to_string(), "session");
    }

    #[test]
    fn test_backend_name_ignores_partition() {
        assert_eq!(Backend::Disk(Partition::Cart).name(), "disk");
        assert_eq!(Backend::Disk(Partition::General).name(), "disk");
    }
}
