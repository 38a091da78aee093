//! Notification Registry Module
//!
//! Per-key listener lists fired after every `set`.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::cache::CacheValue;

/// Callback invoked with the raw value of each `set` on its key.
pub type Listener = Arc<dyn Fn(&CacheValue) + Send + Sync>;

struct Registration {
    id: u64,
    listener: Listener,
}

#[derive(Default)]
struct RegistryState {
    next_id: u64,
    /// identifier → store name → listeners in registration order
    listeners: HashMap<String, HashMap<String, Vec<Registration>>>,
}

impl RegistryState {
    fn remove(&mut self, identifier: &str, store_name: &str, id: u64) -> bool {
        let Some(stores) = self.listeners.get_mut(identifier) else {
            return false;
        };
        let Some(registrations) = stores.get_mut(store_name) else {
            return false;
        };

        let before = registrations.len();
        registrations.retain(|r| r.id != id);
        let removed = registrations.len() != before;

        if registrations.is_empty() {
            stores.remove(store_name);
        }
        if stores.is_empty() {
            self.listeners.remove(identifier);
        }
        removed
    }
}

fn lock(state: &Mutex<RegistryState>) -> MutexGuard<'_, RegistryState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

// == Notification Registry ==
/// Maps `(identifier, store_name)` to an ordered list of listeners.
///
/// Cloning yields another handle onto the same registry.
#[derive(Clone, Default)]
pub struct NotificationRegistry {
    state: Arc<Mutex<RegistryState>>,
}

impl NotificationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // == Subscribe ==
    /// Appends `listener` to the key's list.
    ///
    /// Registering the same closure twice creates two independent
    /// registrations, each removed by its own [`Subscription`].
    pub fn subscribe<F>(&self, identifier: &str, store_name: &str, listener: F) -> Subscription
    where
        F: Fn(&CacheValue) + Send + Sync + 'static,
    {
        let mut state = lock(&self.state);
        let id = state.next_id;
        state.next_id += 1;
        state
            .listeners
            .entry(identifier.to_string())
            .or_default()
            .entry(store_name.to_string())
            .or_default()
            .push(Registration {
                id,
                listener: Arc::new(listener),
            });

        Subscription {
            state: Arc::downgrade(&self.state),
            identifier: identifier.to_string(),
            store_name: store_name.to_string(),
            id,
        }
    }

    // == Publish ==
    /// Invokes every listener registered for exactly this key, in
    /// registration order. Returns how many were invoked.
    ///
    /// The list is snapshotted before the first call and the lock released,
    /// so listeners may subscribe or unsubscribe; such changes apply from
    /// the next publish.
    pub fn publish(&self, identifier: &str, store_name: &str, value: &CacheValue) -> usize {
        let listeners: Vec<Listener> = {
            let state = lock(&self.state);
            match state
                .listeners
                .get(identifier)
                .and_then(|stores| stores.get(store_name))
            {
                Some(registrations) => registrations
                    .iter()
                    .map(|r| Arc::clone(&r.listener))
                    .collect(),
                None => return 0,
            }
        };

        for listener in &listeners {
            listener(value);
        }
        listeners.len()
    }

    /// Number of registrations for a key.
    pub fn listener_count(&self, identifier: &str, store_name: &str) -> usize {
        lock(&self.state)
            .listeners
            .get(identifier)
            .and_then(|stores| stores.get(store_name))
            .map_or(0, Vec::len)
    }
}

impl fmt::Debug for NotificationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.state);
        let total: usize = state
            .listeners
            .values()
            .flat_map(|stores| stores.values())
            .map(Vec::len)
            .sum();
        f.debug_struct("NotificationRegistry")
            .field("listeners", &total)
            .finish()
    }
}

// == Subscription ==
/// Handle for one registration.
///
/// Dropping the handle leaves the listener registered; call
/// [`unsubscribe`](Self::unsubscribe) to remove it.
#[derive(Debug)]
pub struct Subscription {
    state: Weak<Mutex<RegistryState>>,
    identifier: String,
    store_name: String,
    id: u64,
}

impl Subscription {
    /// Removes this registration only. Returns false if it was already gone
    /// or the registry no longer exists.
    pub fn unsubscribe(self) -> bool {
        let Some(state) = self.state.upgrade() else {
            return false;
        };
        let removed = lock(&state).remove(&self.identifier, &self.store_name, self.id);
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> Listener) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let make_log = Arc::clone(&log);
        let make = move |tag: &str| -> Listener {
            let log = Arc::clone(&make_log);
            let tag = tag.to_string();
            Arc::new(move |value: &CacheValue| {
                log.lock().unwrap().push(format!("{}:{:?}", tag, value));
            })
        };
        (log, make)
    }

    #[test]
    fn test_publish_in_registration_order() {
        let registry = NotificationRegistry::new();
        let (log, make) = recorder();
        let a = make("a");
        let b = make("b");
        registry.subscribe("u1", "profile", move |v| a(v));
        registry.subscribe("u1", "profile", move |v| b(v));

        let notified = registry.publish("u1", "profile", &CacheValue::Boolean(true));
        assert_eq!(notified, 2);
        assert_eq!(*log.lock().unwrap(), vec!["a:Boolean(true)", "b:Boolean(true)"]);
    }

    #[test]
    fn test_publish_scoped_to_exact_key() {
        let registry = NotificationRegistry::new();
        let (log, make) = recorder();
        let a = make("a");
        registry.subscribe("id1", "storeA", move |v| a(v));

        assert_eq!(registry.publish("id2", "storeA", &CacheValue::from("x")), 0);
        assert_eq!(registry.publish("id1", "storeB", &CacheValue::from("x")), 0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unsubscribe_keeps_others_in_order() {
        let registry = NotificationRegistry::new();
        let (log, make) = recorder();
        let (a, b, c) = (make("a"), make("b"), make("c"));
        registry.subscribe("u1", "s", move |v| a(v));
        let middle = registry.subscribe("u1", "s", move |v| b(v));
        registry.subscribe("u1", "s", move |v| c(v));

        assert!(middle.unsubscribe());
        registry.publish("u1", "s", &CacheValue::Number(1.0));

        assert_eq!(*log.lock().unwrap(), vec!["a:Number(1.0)", "c:Number(1.0)"]);
        assert_eq!(registry.listener_count("u1", "s"), 2);
    }

    #[test]
    fn test_same_listener_registered_twice() {
        let registry = NotificationRegistry::new();
        let (log, make) = recorder();
        let shared = make("same");
        let first_copy = Arc::clone(&shared);
        let first = registry.subscribe("u1", "s", move |v| first_copy(v));
        registry.subscribe("u1", "s", move |v| shared(v));

        first.unsubscribe();
        registry.publish("u1", "s", &CacheValue::from("v"));
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_unsubscribe_after_registry_dropped() {
        let registry = NotificationRegistry::new();
        let subscription = registry.subscribe("u1", "s", |_| {});
        drop(registry);
        assert!(!subscription.unsubscribe());
    }

    #[test]
    fn test_listener_can_subscribe_during_publish() {
        let registry = NotificationRegistry::new();
        let inner = registry.clone();
        registry.subscribe("u1", "s", move |_| {
            inner.subscribe("u1", "s", |_| {});
        });

        assert_eq!(registry.publish("u1", "s", &CacheValue::from("v")), 1);
        assert_eq!(registry.listener_count("u1", "s"), 2);
    }
}
