//! Cache Module
//!
//! Keyed cache with lazy time-based expiration, per-entry hit counters,
//! per-key update notification and whole-index persistence.

mod clock;
mod engine;
mod entry;
mod notify;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{CacheEngine, PersistStatus};
pub use entry::{epoch, max_expiration, CacheEntry, CacheValue};
pub use notify::{Listener, NotificationRegistry, Subscription};
pub use stats::CacheStats;
pub use store::{EntryIndex, EntryStore};
