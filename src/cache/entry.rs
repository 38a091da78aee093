//! Cache Entry Module
//!
//! Defines the stored value type and the per-key record with its timestamps
//! and hit counters.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

// == Cache Value ==
/// Value held by a cache entry.
///
/// Persisted as `{"type": "<variant>", "value": <payload>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum CacheValue {
    String(String),
    Number(f64),
    Boolean(bool),
    Json(serde_json::Value),
}

impl CacheValue {
    /// Name of the variant as written to storage.
    pub fn kind(&self) -> &'static str {
        match self {
            CacheValue::String(_) => "string",
            CacheValue::Number(_) => "number",
            CacheValue::Boolean(_) => "boolean",
            CacheValue::Json(_) => "json",
        }
    }
}

impl From<&str> for CacheValue {
    fn from(value: &str) -> Self {
        CacheValue::String(value.to_string())
    }
}

impl From<String> for CacheValue {
    fn from(value: String) -> Self {
        CacheValue::String(value)
    }
}

impl From<f64> for CacheValue {
    fn from(value: f64) -> Self {
        CacheValue::Number(value)
    }
}

impl From<bool> for CacheValue {
    fn from(value: bool) -> Self {
        CacheValue::Boolean(value)
    }
}

impl From<serde_json::Value> for CacheValue {
    fn from(value: serde_json::Value) -> Self {
        CacheValue::Json(value)
    }
}

/// Unix epoch, the sentinel for "no date" in results and unparsable
/// persisted timestamps.
pub fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::default()
}

/// Latest expiration that survives the persisted RFC 3339 form, which has
/// four-digit years.
pub fn max_expiration() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59)
        .single()
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

// == Cache Entry ==
/// Stored record for one `(identifier, store_name)` key.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub identifier: String,
    pub store_name: String,
    pub value: CacheValue,
    /// The entry is gone once `now >= expiration_date`
    pub expiration_date: DateTime<Utc>,
    /// Set by every `set`, never by `get`
    pub last_updated_date: DateTime<Utc>,
    /// Set by every `get` that finds a live entry
    pub last_accessed_date: DateTime<Utc>,
    pub set_hit_count: u64,
    pub get_hit_count: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry as written by its first `set`.
    pub fn new(
        identifier: impl Into<String>,
        store_name: impl Into<String>,
        value: CacheValue,
        expiration_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            store_name: store_name.into(),
            value,
            expiration_date,
            last_updated_date: now,
            last_accessed_date: now,
            set_hit_count: 1,
            get_hit_count: 0,
        }
    }

    // == Is Expired ==
    /// Checks expiration against `now`.
    ///
    /// Boundary condition: an entry whose expiration date equals `now` is
    /// already expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiration_date
    }

    /// Remaining lifetime in milliseconds, 0 once expired.
    pub fn ttl_remaining_ms(&self, now: DateTime<Utc>) -> u64 {
        let remaining = self.expiration_date.signed_duration_since(now);
        remaining.num_milliseconds().max(0) as u64
    }

    /// Applies a subsequent `set`: counters for reads are left alone.
    pub(crate) fn record_set(
        &mut self,
        value: CacheValue,
        expiration_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) {
        self.value = value;
        self.expiration_date = expiration_date;
        self.last_updated_date = now;
        self.set_hit_count = self.set_hit_count.saturating_add(1);
    }

    /// Applies a hitting `get`.
    pub(crate) fn record_get(&mut self, now: DateTime<Utc>) {
        self.last_accessed_date = now;
        self.get_hit_count = self.get_hit_count.saturating_add(1);
    }
}
