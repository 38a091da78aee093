//! Persisted form of the entry index
//!
//! The whole index is written as one JSON document:
//!
//! ```text
//! { "<identifier>": { "<storeName>": [ EntryRecord ] } }
//! ```
//!
//! Each record sits in a single-element array. Readers take the first
//! element and skip empty arrays; writers always emit exactly one.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::{epoch, CacheEntry, CacheValue, EntryIndex};
use crate::error::Result;

/// One persisted cache entry, without its key parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryRecord {
    pub value: CacheValue,
    #[serde(default = "epoch", with = "wire_date")]
    pub expiration_date: DateTime<Utc>,
    #[serde(default = "epoch", with = "wire_date")]
    pub last_updated_date: DateTime<Utc>,
    #[serde(default = "epoch", with = "wire_date")]
    pub last_accessed_date: DateTime<Utc>,
    #[serde(default)]
    pub get_hit_count: u64,
    #[serde(default)]
    pub set_hit_count: u64,
}

impl EntryRecord {
    pub fn from_entry(entry: &CacheEntry) -> Self {
        Self {
            value: entry.value.clone(),
            expiration_date: entry.expiration_date,
            last_updated_date: entry.last_updated_date,
            last_accessed_date: entry.last_accessed_date,
            get_hit_count: entry.get_hit_count,
            set_hit_count: entry.set_hit_count,
        }
    }

    pub fn into_entry(self, identifier: &str, store_name: &str) -> CacheEntry {
        CacheEntry {
            identifier: identifier.to_string(),
            store_name: store_name.to_string(),
            value: self.value,
            expiration_date: self.expiration_date,
            last_updated_date: self.last_updated_date,
            last_accessed_date: self.last_accessed_date,
            set_hit_count: self.set_hit_count,
            get_hit_count: self.get_hit_count,
        }
    }
}

// == Wire Dates ==
/// Parses a persisted timestamp. Anything that is not RFC 3339 becomes the
/// epoch sentinel.
pub fn parse_wire_date(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|date| date.with_timezone(&Utc))
        .unwrap_or_else(|_| epoch())
}

/// Serde adapter writing RFC 3339 with millisecond precision and reading
/// leniently: strings are parsed, integer milliseconds are accepted, any
/// other JSON value degrades to the epoch.
pub(crate) mod wire_date {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{format_wire_date, parse_wire_date};
    use crate::cache::epoch;

    pub fn serialize<S: Serializer>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_wire_date(date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(match raw {
            serde_json::Value::String(s) => parse_wire_date(&s),
            serde_json::Value::Number(n) => n
                .as_i64()
                .and_then(DateTime::<Utc>::from_timestamp_millis)
                .unwrap_or_else(epoch),
            _ => epoch(),
        })
    }
}

// == Encode ==
/// Serializes the index to the JSON document handed to the codec.
///
/// Maps are ordered so identical indexes produce identical bytes.
pub fn encode_index(index: &EntryIndex) -> Result<Vec<u8>> {
    let document: BTreeMap<&str, BTreeMap<&str, [EntryRecord; 1]>> = index
        .iter()
        .map(|(identifier, stores)| {
            let records = stores
                .iter()
                .map(|(store_name, entry)| (store_name.as_str(), [EntryRecord::from_entry(entry)]))
                .collect();
            (identifier.as_str(), records)
        })
        .collect();

    Ok(serde_json::to_vec(&document)?)
}

// == Decode ==
/// Rebuilds the index from a decoded JSON document.
///
/// A document that is not a JSON object is an error. Identifiers that do
/// not map to an object, records that fail to parse, and empty wrapper
/// arrays are skipped so the rest of the index survives.
pub fn decode_index(bytes: &[u8]) -> Result<EntryIndex> {
    let document: HashMap<String, serde_json::Value> = serde_json::from_slice(bytes)?;

    let mut index = EntryIndex::new();
    for (identifier, stores) in document {
        let serde_json::Value::Object(stores) = stores else {
            debug!(%identifier, "Skipping malformed persisted identifier");
            continue;
        };
        for (store_name, raw) in stores {
            let record = match serde_json::from_value::<Vec<EntryRecord>>(raw) {
                Ok(records) => records.into_iter().next(),
                Err(error) => {
                    debug!(%identifier, %store_name, %error, "Skipping malformed persisted record");
                    None
                }
            };

            if let Some(record) = record {
                let entry = record.into_entry(&identifier, &store_name);
                index
                    .entry(identifier.clone())
                    .or_default()
                    .insert(store_name, entry);
            }
        }
    }
    Ok(index)
}

/// Formats a timestamp the way it is persisted.
pub fn format_wire_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}
