//! Cache Engine Module
//!
//! Public surface composing the entry store, the notification registry and
//! the injected clock.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::cache::{
    max_expiration, CacheStats, CacheValue, Clock, EntryStore, NotificationRegistry, Subscription,
    SystemClock,
};
use crate::codec::{codec_for, Codec};
use crate::config::{CacheConfig, DEFAULT_AGGREGATE_KEY};
use crate::error::CacheError;
use crate::models::CacheResult;
use crate::persistence::{FileAdapter, MemoryAdapter, PersistenceAdapter};

// == Persist Status ==
/// Whether a mutating call reached the substrate.
///
/// A failure never undoes the in-memory change: the engine keeps serving
/// the new state while storage lags behind.
#[derive(Debug)]
pub enum PersistStatus {
    Persisted,
    Failed(CacheError),
}

impl PersistStatus {
    pub fn is_persisted(&self) -> bool {
        matches!(self, PersistStatus::Persisted)
    }

    pub fn error(&self) -> Option<&CacheError> {
        match self {
            PersistStatus::Persisted => None,
            PersistStatus::Failed(error) => Some(error),
        }
    }
}

// == Cache Engine ==
/// Keyed, time-bounded cache persisted through an injected adapter and codec.
///
/// Operations run to completion in call order. Expiration is checked lazily
/// on `get`; nothing is evicted in the background.
pub struct CacheEngine {
    store: EntryStore,
    registry: NotificationRegistry,
    stats: CacheStats,
    clock: Arc<dyn Clock>,
}

impl CacheEngine {
    // == Constructors ==
    /// Creates an engine on the default aggregate key using the wall clock.
    pub fn new(
        adapter: impl PersistenceAdapter + 'static,
        codec: impl Codec + 'static,
    ) -> Self {
        Self::open(
            Box::new(adapter),
            Box::new(codec),
            DEFAULT_AGGREGATE_KEY,
            Arc::new(SystemClock),
        )
    }

    /// Creates an engine with every collaborator supplied explicitly,
    /// rehydrating whatever the adapter holds under `aggregate_key`.
    pub fn open(
        adapter: Box<dyn PersistenceAdapter>,
        codec: Box<dyn Codec>,
        aggregate_key: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let store = EntryStore::load(adapter, codec, aggregate_key);
        let mut stats = CacheStats::new();
        stats.set_total_entries(store.len());
        Self {
            store,
            registry: NotificationRegistry::new(),
            stats,
            clock,
        }
    }

    /// Wires the adapter and codec selected by `config`.
    pub fn from_config(config: &CacheConfig) -> Self {
        let adapter: Box<dyn PersistenceAdapter> = match &config.storage_dir {
            Some(dir) => Box::new(FileAdapter::new(dir, config.quota_bytes)),
            None => Box::new(MemoryAdapter::new(config.quota_bytes)),
        };
        let codec = codec_for(config.compression);
        info!(
            aggregate_key = %config.aggregate_key,
            codec = codec.name(),
            quota_bytes = config.quota_bytes,
            file_backed = config.storage_dir.is_some(),
            "Opening cache engine"
        );
        Self::open(
            adapter,
            codec,
            config.aggregate_key.clone(),
            Arc::new(SystemClock),
        )
    }

    // == Set ==
    /// Stores `value` under the key until `expiration_date`.
    ///
    /// The entry is updated in memory, the index persisted, then every
    /// listener on the key is called with `value`. Listeners fire even when
    /// persistence failed, since the in-memory state changed either way.
    pub fn set(
        &mut self,
        identifier: &str,
        store_name: &str,
        value: CacheValue,
        expiration_date: DateTime<Utc>,
    ) -> PersistStatus {
        let now = self.clock.now();
        let set_hit_count = self
            .store
            .upsert(identifier, store_name, value.clone(), expiration_date, now)
            .set_hit_count;
        self.stats.record_set();

        let status = self.persist("set", Some((identifier, store_name)));
        let notified = self.registry.publish(identifier, store_name, &value);
        debug!(
            identifier,
            store_name,
            kind = value.kind(),
            set_hit_count,
            notified,
            "Entry set"
        );
        status
    }

    /// [`set`](Self::set) with the expiration `ttl` from now.
    ///
    /// A TTL reaching past [`max_expiration`] saturates to it.
    pub fn set_with_ttl(
        &mut self,
        identifier: &str,
        store_name: &str,
        value: CacheValue,
        ttl: Duration,
    ) -> PersistStatus {
        let now = self.clock.now();
        let expiration_date = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .map_or_else(max_expiration, |date| date.min(max_expiration()));
        self.set(identifier, store_name, value, expiration_date)
    }

    // == Get ==
    /// Looks up a key.
    ///
    /// A live entry has its read counter and access date bumped, the index
    /// is persisted, and the full result returned. A missing or expired key
    /// yields [`CacheResult::not_found`].
    pub fn get(&mut self, identifier: &str, store_name: &str) -> CacheResult {
        let now = self.clock.now();
        match self.store.lookup(identifier, store_name, now) {
            Some(entry) => {
                self.stats.record_hit();
                self.persist("get", Some((identifier, store_name)));
                CacheResult::from(entry)
            }
            None => {
                self.stats.record_miss();
                debug!(identifier, store_name, "Cache miss");
                CacheResult::not_found(identifier, store_name)
            }
        }
    }

    /// Callback form of [`get`](Self::get): `on_result` runs exactly once.
    pub fn get_with<F>(&mut self, identifier: &str, store_name: &str, on_result: F)
    where
        F: FnOnce(CacheResult),
    {
        on_result(self.get(identifier, store_name));
    }

    // == Remove ==
    /// Deletes the key and persists the index. Listeners are not notified.
    pub fn remove(&mut self, identifier: &str, store_name: &str) -> PersistStatus {
        if self.store.delete(identifier, store_name) {
            self.stats.record_removal();
            debug!(identifier, store_name, "Entry removed");
        }
        self.persist("remove", Some((identifier, store_name)))
    }

    // == Clear ==
    /// Drops every entry and erases the aggregate key from the substrate.
    pub fn clear(&mut self) -> PersistStatus {
        let dropped = self.store.clear_all();
        self.stats.record_clear();
        self.stats.set_total_entries(0);

        match self.store.erase_persisted() {
            Ok(()) => {
                info!(aggregate_key = self.store.aggregate_key(), dropped, "Cache cleared");
                PersistStatus::Persisted
            }
            Err(error) => {
                self.stats.record_persist_failure();
                warn!(
                    aggregate_key = self.store.aggregate_key(),
                    dropped,
                    %error,
                    "Failed to erase persisted cache index"
                );
                PersistStatus::Failed(error)
            }
        }
    }

    // == Purge Expired ==
    /// Removes entries that have expired. Never invoked implicitly.
    ///
    /// Returns the number removed; the index is persisted only when that is
    /// non-zero.
    pub fn purge_expired(&mut self) -> usize {
        let removed = self.store.purge_expired(self.clock.now());
        if removed > 0 {
            info!(removed, "Purged expired cache entries");
            self.persist("purge_expired", None);
        }
        removed
    }

    // == Subscribe ==
    /// Registers `listener` for `set` calls on the key.
    pub fn subscribe_to_updates<F>(
        &self,
        identifier: &str,
        store_name: &str,
        listener: F,
    ) -> Subscription
    where
        F: Fn(&CacheValue) + Send + Sync + 'static,
    {
        self.registry.subscribe(identifier, store_name, listener)
    }

    // == Stats ==
    /// Returns current engine statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.store.len());
        stats
    }

    /// Entries currently indexed, expired ones included.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn aggregate_key(&self) -> &str {
        self.store.aggregate_key()
    }

    /// Persists the index, logging and counting any failure. `key` is the
    /// entry the operation touched, if it targeted a single one.
    fn persist(&mut self, operation: &'static str, key: Option<(&str, &str)>) -> PersistStatus {
        match self.store.persist() {
            Ok(bytes) => {
                debug!(operation, bytes, "Cache index persisted");
                PersistStatus::Persisted
            }
            Err(error) => {
                self.stats.record_persist_failure();
                warn!(
                    operation,
                    identifier = key.map(|(identifier, _)| identifier),
                    store_name = key.map(|(_, store_name)| store_name),
                    aggregate_key = self.store.aggregate_key(),
                    quota_exceeded = error.is_quota_exceeded(),
                    %error,
                    "Failed to persist cache index; memory is ahead of storage"
                );
                PersistStatus::Failed(error)
            }
        }
    }
}

impl std::fmt::Debug for CacheEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEngine")
            .field("store", &self.store)
            .field("registry", &self.registry)
            .field("stats", &self.stats)
            .finish()
    }
}
