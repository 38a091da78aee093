//! Entry Store Module
//!
//! Two-level in-memory index (identifier → store name → entry) mirrored to a
//! persistence adapter under a single aggregate key.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::cache::{CacheEntry, CacheValue};
use crate::codec::Codec;
use crate::error::Result;
use crate::models::{decode_index, encode_index};
use crate::persistence::PersistenceAdapter;

/// identifier → store name → entry
pub type EntryIndex = HashMap<String, HashMap<String, CacheEntry>>;

// == Entry Store ==
/// In-process source of truth for cache entries.
///
/// Mutations only touch memory; callers decide when to [`persist`](Self::persist).
/// Expired entries stay indexed until removed explicitly.
pub struct EntryStore {
    /// Indexed entries
    entries: EntryIndex,
    /// Substrate holding the serialized index
    adapter: Box<dyn PersistenceAdapter>,
    /// Transform applied between JSON and substrate bytes
    codec: Box<dyn Codec>,
    /// Physical key of the serialized index
    aggregate_key: String,
}

impl EntryStore {
    // == Load ==
    /// Creates a store rehydrated from whatever the adapter holds under
    /// `aggregate_key`.
    ///
    /// Never fails: an absent key, an unreadable substrate, a codec failure
    /// or a malformed document all produce an empty index.
    pub fn load(
        adapter: Box<dyn PersistenceAdapter>,
        codec: Box<dyn Codec>,
        aggregate_key: impl Into<String>,
    ) -> Self {
        let aggregate_key = aggregate_key.into();
        let entries = match Self::read_index(adapter.as_ref(), codec.as_ref(), &aggregate_key) {
            Ok(Some(entries)) => {
                let count: usize = entries.values().map(HashMap::len).sum();
                info!(aggregate_key = %aggregate_key, entries = count, "Rehydrated cache index");
                entries
            }
            Ok(None) => {
                debug!(aggregate_key = %aggregate_key, "No persisted cache index");
                EntryIndex::new()
            }
            Err(error) => {
                warn!(
                    aggregate_key = %aggregate_key,
                    codec = codec.name(),
                    %error,
                    "Discarding unreadable cache index"
                );
                EntryIndex::new()
            }
        };

        Self {
            entries,
            adapter,
            codec,
            aggregate_key,
        }
    }

    fn read_index(
        adapter: &dyn PersistenceAdapter,
        codec: &dyn Codec,
        aggregate_key: &str,
    ) -> Result<Option<EntryIndex>> {
        let Some(bytes) = adapter.read(aggregate_key)? else {
            return Ok(None);
        };
        let json = codec.decode(&bytes)?;
        Ok(Some(decode_index(&json)?))
    }

    // == Upsert ==
    /// Creates or overwrites the entry for a key.
    ///
    /// A new entry starts with `set_hit_count = 1`. An existing one gets the
    /// new value and expiration, `last_updated_date = now` and one more set
    /// hit; its read counters are untouched.
    pub fn upsert(
        &mut self,
        identifier: &str,
        store_name: &str,
        value: CacheValue,
        expiration_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> &CacheEntry {
        let stores = self.entries.entry(identifier.to_string()).or_default();
        match stores.get_mut(store_name) {
            Some(entry) => {
                entry.record_set(value, expiration_date, now);
            }
            None => {
                let entry = CacheEntry::new(identifier, store_name, value, expiration_date, now);
                stores.insert(store_name.to_string(), entry);
            }
        }
        // Present: inserted or updated just above
        &stores[store_name]
    }

    // == Lookup ==
    /// Returns a copy of the live entry for a key, recording the access.
    ///
    /// Returns `None` when the key is absent or `now >= expiration_date`.
    /// Expired entries are left in place.
    pub fn lookup(
        &mut self,
        identifier: &str,
        store_name: &str,
        now: DateTime<Utc>,
    ) -> Option<CacheEntry> {
        let entry = self.entries.get_mut(identifier)?.get_mut(store_name)?;
        if entry.is_expired_at(now) {
            return None;
        }
        entry.record_get(now);
        Some(entry.clone())
    }

    /// Borrows an entry without recording an access, expired or not.
    pub fn peek(&self, identifier: &str, store_name: &str) -> Option<&CacheEntry> {
        self.entries.get(identifier)?.get(store_name)
    }

    // == Delete ==
    /// Removes the entry for a key. Returns true if one was removed.
    pub fn delete(&mut self, identifier: &str, store_name: &str) -> bool {
        let Some(stores) = self.entries.get_mut(identifier) else {
            return false;
        };
        let removed = stores.remove(store_name).is_some();
        if stores.is_empty() {
            self.entries.remove(identifier);
        }
        removed
    }

    // == Clear All ==
    /// Empties the index. Returns the number of entries dropped.
    pub fn clear_all(&mut self) -> usize {
        let count = self.len();
        self.entries.clear();
        count
    }

    // == Purge Expired ==
    /// Removes every entry expired at `now`. Returns the number removed.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, stores| {
            let before = stores.len();
            stores.retain(|_, entry| !entry.is_expired_at(now));
            removed += before - stores.len();
            !stores.is_empty()
        });
        removed
    }

    // == Persist ==
    /// Writes the whole index under the aggregate key.
    ///
    /// Returns the number of bytes handed to the adapter.
    pub fn persist(&self) -> Result<usize> {
        let json = encode_index(&self.entries)?;
        let bytes = self.codec.encode(&json)?;
        self.adapter.write(&self.aggregate_key, &bytes)?;
        Ok(bytes.len())
    }

    /// Erases the aggregate key from the adapter.
    pub fn erase_persisted(&self) -> Result<()> {
        self.adapter.erase(&self.aggregate_key)
    }

    pub fn aggregate_key(&self) -> &str {
        &self.aggregate_key
    }

    pub fn contains(&self, identifier: &str, store_name: &str) -> bool {
        self.peek(identifier, store_name).is_some()
    }

    // == Length ==
    /// Returns the number of indexed entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for EntryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryStore")
            .field("aggregate_key", &self.aggregate_key)
            .field("codec", &self.codec.name())
            .field("entries", &self.len())
            .finish()
    }
}
