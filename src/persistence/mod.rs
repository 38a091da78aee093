//! Persistence Module
//!
//! Byte-oriented key-value substrates the cache engine persists into.
//!
//! The engine stores its whole index under one aggregate key, so adapters
//! only ever see a handful of keys. Writes may be refused when a byte limit
//! would be exceeded; a refused write must leave existing keys untouched.

mod file;
mod memory;

pub use file::FileAdapter;
pub use memory::MemoryAdapter;

use crate::error::Result;

// == Persistence Adapter Trait ==
/// Byte-limited key-value store with no cross-key transactions.
///
/// Methods take `&self`: adapters are handles onto a substrate that may be
/// shared by several engine instances.
pub trait PersistenceAdapter: Send + Sync {
    /// Returns the bytes stored under `key`, or `None` when absent.
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Replaces the bytes stored under `key`.
    ///
    /// Fails with [`CacheError::QuotaExceeded`](crate::error::CacheError::QuotaExceeded)
    /// when the substrate's byte limit would be exceeded.
    fn write(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Removes `key`. Erasing an absent key is not an error.
    fn erase(&self, key: &str) -> Result<()>;

    /// Removes every key held by the substrate.
    fn erase_all(&self) -> Result<()>;
}
