//! In-process substrate with a byte quota.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::PersistenceAdapter;
use crate::config::DEFAULT_QUOTA_BYTES;
use crate::error::{CacheError, Result};

#[derive(Debug, Default)]
struct MemoryState {
    items: HashMap<String, Vec<u8>>,
    unavailable: bool,
}

impl MemoryState {
    /// Bytes charged against the quota by every key except `skip`.
    fn usage_excluding(&self, skip: &str) -> usize {
        self.items
            .iter()
            .filter(|(k, _)| k.as_str() != skip)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }

    fn usage(&self) -> usize {
        self.items.iter().map(|(k, v)| k.len() + v.len()).sum()
    }
}

// == Memory Adapter ==
/// Shared in-memory key-value substrate.
///
/// Clones share the same underlying storage, so an engine rebuilt from a
/// clone sees whatever the previous instance persisted. Each key is charged
/// `key.len() + value.len()` bytes against the quota.
#[derive(Debug, Clone)]
pub struct MemoryAdapter {
    state: Arc<Mutex<MemoryState>>,
    quota_bytes: usize,
}

impl MemoryAdapter {
    // == Constructor ==
    /// Creates an empty substrate with the given byte quota.
    pub fn new(quota_bytes: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            quota_bytes,
        }
    }

    /// Bytes currently charged against the quota.
    pub fn used_bytes(&self) -> usize {
        self.lock().usage()
    }

    /// Number of keys currently stored.
    pub fn key_count(&self) -> usize {
        self.lock().items.len()
    }

    /// Toggles a simulated outage: while unavailable every call fails with
    /// [`CacheError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.lock().unavailable = !available;
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_available(state: &MemoryState) -> Result<()> {
        if state.unavailable {
            return Err(CacheError::Unavailable(
                "in-memory substrate is offline".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for MemoryAdapter {
    fn default() -> Self {
        Self::new(DEFAULT_QUOTA_BYTES)
    }
}

impl PersistenceAdapter for MemoryAdapter {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let state = self.lock();
        Self::check_available(&state)?;
        Ok(state.items.get(key).cloned())
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let mut state = self.lock();
        Self::check_available(&state)?;

        let used = state.usage_excluding(key);
        let requested = key.len() + bytes.len();
        if used + requested > self.quota_bytes {
            debug!(key, requested, used, quota = self.quota_bytes, "Write refused");
            return Err(CacheError::QuotaExceeded {
                requested,
                available: self.quota_bytes.saturating_sub(used),
            });
        }

        state.items.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn erase(&self, key: &str) -> Result<()> {
        let mut state = self.lock();
        Self::check_available(&state)?;
        state.items.remove(key);
        Ok(())
    }

    fn erase_all(&self) -> Result<()> {
        let mut state = self.lock();
        Self::check_available(&state)?;
        state.items.clear();
        Ok(())
    }
}
