//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check hit accounting, overwrite, removal, notification
//! scoping and persistence round-trips over arbitrary keys and operation
//! sequences.

use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

use crate::cache::{epoch, CacheEngine, CacheValue, ManualClock};
use crate::codec::{GzipCodec, IdentityCodec};
use crate::persistence::MemoryAdapter;

// == Test Configuration ==
const TEST_AGGREGATE_KEY: &str = "property-index";

fn start_instant() -> DateTime<Utc> {
    epoch() + Duration::days(19_000)
}

fn new_engine(adapter: &MemoryAdapter, clock: &ManualClock) -> CacheEngine {
    CacheEngine::open(
        Box::new(adapter.clone()),
        Box::new(IdentityCodec),
        TEST_AGGREGATE_KEY,
        Arc::new(clock.clone()),
    )
}

// == Strategies ==
/// Key parts: empty, ASCII, or arbitrary printable Unicode
fn key_part_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        "[a-z0-9_]{1,12}",
        "\\PC{1,24}",
    ]
}

fn value_strategy() -> impl Strategy<Value = CacheValue> {
    prop_oneof![
        "\\PC{0,64}".prop_map(CacheValue::String),
        (-1.0e12f64..1.0e12f64).prop_map(CacheValue::Number),
        any::<bool>().prop_map(CacheValue::Boolean),
        ("[a-z]{1,8}", any::<i32>())
            .prop_map(|(k, v)| CacheValue::Json(serde_json::json!({ k: v, "list": [v, v] }))),
    ]
}

/// A small key space so operations collide often
fn small_key_strategy() -> impl Strategy<Value = (String, String)> {
    (
        prop::sample::select(vec!["u1", "u2", ""]),
        prop::sample::select(vec!["profile", "settings"]),
    )
        .prop_map(|(i, s)| (i.to_string(), s.to_string()))
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: (String, String), value: CacheValue },
    Get { key: (String, String) },
    Remove { key: (String, String) },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (small_key_strategy(), value_strategy()).prop_map(|(key, value)| CacheOp::Set { key, value }),
        small_key_strategy().prop_map(|key| CacheOp::Get { key }),
        small_key_strategy().prop_map(|key| CacheOp::Remove { key }),
    ]
}

/// Reference counters for one live key
#[derive(Debug, Clone, Default)]
struct Expected {
    value: Option<CacheValue>,
    sets: u64,
    gets: u64,
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Hit-count accounting: after any interleaving of set/get/remove, every
    // key reports exactly the sets and hitting gets since it was last
    // (re)created, regardless of activity on other keys.
    #[test]
    fn prop_hit_count_accounting(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let clock = ManualClock::new(start_instant());
        let mut engine = new_engine(&MemoryAdapter::default(), &clock);
        let expires = start_instant() + Duration::hours(1);
        let mut model: HashMap<(String, String), Expected> = HashMap::new();

        for op in ops {
            clock.advance(Duration::milliseconds(1));
            match op {
                CacheOp::Set { key, value } => {
                    let _ = engine.set(&key.0, &key.1, value.clone(), expires);
                    let expected = model.entry(key).or_default();
                    expected.value = Some(value);
                    expected.sets += 1;
                }
                CacheOp::Get { key } => {
                    let result = engine.get(&key.0, &key.1);
                    match model.get_mut(&key) {
                        Some(expected) => {
                            expected.gets += 1;
                            prop_assert_eq!(&result.value, &expected.value);
                            prop_assert_eq!(result.get_hit_count, expected.gets);
                            prop_assert_eq!(result.set_hit_count, expected.sets);
                        }
                        None => prop_assert!(!result.is_hit(), "Removed key should miss"),
                    }
                }
                CacheOp::Remove { key } => {
                    let _ = engine.remove(&key.0, &key.1);
                    model.remove(&key);
                }
            }
        }

        prop_assert_eq!(engine.len(), model.len());
    }

    // Overwrite semantics: the last set wins and a key never holds more
    // than one entry.
    #[test]
    fn prop_overwrite_semantics(
        identifier in key_part_strategy(),
        store_name in key_part_strategy(),
        value1 in value_strategy(),
        value2 in value_strategy()
    ) {
        let clock = ManualClock::new(start_instant());
        let mut engine = new_engine(&MemoryAdapter::default(), &clock);
        let expires = start_instant() + Duration::minutes(5);

        let _ = engine.set(&identifier, &store_name, value1, expires);
        let _ = engine.set(&identifier, &store_name, value2.clone(), expires);

        let result = engine.get(&identifier, &store_name);
        prop_assert_eq!(result.value, Some(value2), "Overwrite should return new value");
        prop_assert_eq!(result.set_hit_count, 2);
        prop_assert_eq!(engine.len(), 1, "Should have exactly one entry after overwrite");
    }

    // Remove then re-add starts the counters over.
    #[test]
    fn prop_remove_readd_resets_counters(
        identifier in key_part_strategy(),
        store_name in key_part_strategy(),
        value in value_strategy(),
        extra_sets in 0usize..5
    ) {
        let clock = ManualClock::new(start_instant());
        let mut engine = new_engine(&MemoryAdapter::default(), &clock);
        let expires = start_instant() + Duration::minutes(5);

        for _ in 0..=extra_sets {
            let _ = engine.set(&identifier, &store_name, value.clone(), expires);
        }
        engine.get(&identifier, &store_name);
        let _ = engine.remove(&identifier, &store_name);
        prop_assert!(!engine.get(&identifier, &store_name).is_hit());

        let _ = engine.set(&identifier, &store_name, value, expires);
        let result = engine.get(&identifier, &store_name);
        prop_assert_eq!(result.set_hit_count, 1);
        prop_assert_eq!(result.get_hit_count, 1);
    }

    // Listeners only hear sets on their exact key, and unsubscribing one
    // leaves the others registered.
    #[test]
    fn prop_notification_scoping(
        (id1, id2) in (key_part_strategy(), key_part_strategy()).prop_filter("distinct ids", |(a, b)| a != b),
        (store_a, store_b) in (key_part_strategy(), key_part_strategy()).prop_filter("distinct stores", |(a, b)| a != b),
        value in value_strategy()
    ) {
        let clock = ManualClock::new(start_instant());
        let mut engine = new_engine(&MemoryAdapter::default(), &clock);
        let expires = start_instant() + Duration::minutes(5);

        let heard_a = Arc::new(Mutex::new(0u32));
        let heard_b = Arc::new(Mutex::new(0u32));
        let sink_a = Arc::clone(&heard_a);
        let sink_b = Arc::clone(&heard_b);
        let sub_a = engine.subscribe_to_updates(&id1, &store_a, move |_| *sink_a.lock().unwrap() += 1);
        engine.subscribe_to_updates(&id1, &store_a, move |_| *sink_b.lock().unwrap() += 1);

        let _ = engine.set(&id2, &store_a, value.clone(), expires);
        let _ = engine.set(&id1, &store_b, value.clone(), expires);
        prop_assert_eq!(*heard_a.lock().unwrap(), 0);
        prop_assert_eq!(*heard_b.lock().unwrap(), 0);

        let _ = engine.set(&id1, &store_a, value.clone(), expires);
        prop_assert_eq!(*heard_a.lock().unwrap(), 1);
        prop_assert_eq!(*heard_b.lock().unwrap(), 1);

        prop_assert!(sub_a.unsubscribe());
        let _ = engine.set(&id1, &store_a, value, expires);
        prop_assert_eq!(*heard_a.lock().unwrap(), 1);
        prop_assert_eq!(*heard_b.lock().unwrap(), 2);
    }

    // A fresh engine on the same substrate sees the same value, expiration
    // and counters.
    #[test]
    fn prop_persistence_roundtrip(
        entries in prop::collection::vec(
            (key_part_strategy(), key_part_strategy(), value_strategy(), 1i64..86_400_000),
            1..10
        )
    ) {
        let clock = ManualClock::new(start_instant());
        let adapter = MemoryAdapter::default();
        let mut latest: HashMap<(String, String), (CacheValue, DateTime<Utc>)> = HashMap::new();
        {
            let mut engine = CacheEngine::open(
                Box::new(adapter.clone()),
                Box::new(GzipCodec::default()),
                TEST_AGGREGATE_KEY,
                Arc::new(clock.clone()),
            );
            for (identifier, store_name, value, ttl_ms) in entries {
                let expires = start_instant() + Duration::milliseconds(ttl_ms);
                prop_assert!(engine.set(&identifier, &store_name, value.clone(), expires).is_persisted());
                latest.insert((identifier, store_name), (value, expires));
            }
        }

        let mut reloaded = CacheEngine::open(
            Box::new(adapter),
            Box::new(GzipCodec::default()),
            TEST_AGGREGATE_KEY,
            Arc::new(clock),
        );
        prop_assert_eq!(reloaded.len(), latest.len());
        for ((identifier, store_name), (value, expires)) in latest {
            let result = reloaded.get(&identifier, &store_name);
            prop_assert_eq!(result.value, Some(value));
            prop_assert_eq!(result.expiration_date, expires);
        }
    }
}

// Expiration boundary properties, driven by the manual clock
proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    // Hits strictly before the expiration instant, misses from it onward.
    #[test]
    fn prop_ttl_monotonicity(
        ttl_ms in 1i64..10_000_000,
        before in 1i64..1_000,
        after in 0i64..1_000
    ) {
        let clock = ManualClock::new(start_instant());
        let mut engine = new_engine(&MemoryAdapter::default(), &clock);
        let expires = start_instant() + Duration::milliseconds(ttl_ms);
        let _ = engine.set("u1", "profile", "hello".into(), expires);

        // Never earlier than the set itself
        clock.set(expires - Duration::milliseconds(before.min(ttl_ms)));
        prop_assert!(engine.get("u1", "profile").is_hit(), "Entry should hit before expiration");

        clock.set(expires + Duration::milliseconds(after));
        prop_assert!(!engine.get("u1", "profile").is_hit(), "Entry should miss at or after expiration");
    }
}
