//! Background Tasks Module
//!
//! Optional periodic maintenance that runs alongside the cache.
//!
//! # Tasks
//! - Expiry sweep: reclaims expired entries from every backend at a fixed
//!   interval

mod sweep;

pub use sweep::spawn_sweep_task;
