//! Keyed Cache - a time-bounded cache engine with pluggable persistence
//!
//! Entries are addressed by `(identifier, store_name)`, expire lazily at an
//! absolute instant, count their sets and hitting gets, and notify per-key
//! listeners on every set. The whole index is persisted through an injected
//! codec into a byte-limited key-value substrate.

pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod models;
pub mod persistence;

pub use cache::{CacheEngine, CacheValue, PersistStatus, Subscription};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use models::CacheResult;
