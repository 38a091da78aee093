//! Cache Statistics Module
//!
//! Engine-wide counters complementing the per-entry hit counts.

use serde::Serialize;

// == Cache Stats ==
/// Tracks engine activity since construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// `get` calls that found a live entry
    pub hits: u64,
    /// `get` calls that found nothing or an expired entry
    pub misses: u64,
    /// `set` calls
    pub sets: u64,
    /// `remove` calls that deleted an entry
    pub removals: u64,
    /// `clear` calls
    pub clears: u64,
    /// Writes or erases the substrate refused
    pub persist_failures: u64,
    /// Entries currently indexed, expired ones included
    pub total_entries: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_set(&mut self) {
        self.sets += 1;
    }

    pub fn record_removal(&mut self) {
        self.removals += 1;
    }

    pub fn record_clear(&mut self) {
        self.clears += 1;
    }

    pub fn record_persist_failure(&mut self) {
        self.persist_failures += 1;
    }

    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}
