//! Result returned by a cache lookup.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::record::wire_date;
use crate::cache::{epoch, CacheEntry, CacheValue};

/// Outcome of `get`, for hits and misses alike.
///
/// A miss keeps the requested key, has no value, reports the epoch for all
/// three dates and zero for both counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheResult {
    pub identifier: String,
    pub store_name: String,
    pub value: Option<CacheValue>,
    #[serde(serialize_with = "wire_date::serialize")]
    pub expiration_date: DateTime<Utc>,
    #[serde(serialize_with = "wire_date::serialize")]
    pub last_updated_date: DateTime<Utc>,
    #[serde(serialize_with = "wire_date::serialize")]
    pub last_accessed_date: DateTime<Utc>,
    pub get_hit_count: u64,
    pub set_hit_count: u64,
}

impl CacheResult {
    /// The default result for a missing or expired key.
    pub fn not_found(identifier: impl Into<String>, store_name: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            store_name: store_name.into(),
            value: None,
            expiration_date: epoch(),
            last_updated_date: epoch(),
            last_accessed_date: epoch(),
            get_hit_count: 0,
            set_hit_count: 0,
        }
    }

    /// True when the lookup found a live entry.
    pub fn is_hit(&self) -> bool {
        self.value.is_some()
    }
}

impl From<CacheEntry> for CacheResult {
    fn from(entry: CacheEntry) -> Self {
        Self {
            identifier: entry.identifier,
            store_name: entry.store_name,
            value: Some(entry.value),
            expiration_date: entry.expiration_date,
            last_updated_date: entry.last_updated_date,
            last_accessed_date: entry.last_accessed_date,
            get_hit_count: entry.get_hit_count,
            set_hit_count: entry.set_hit_count,
        }
    }
}
