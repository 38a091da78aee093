//! Persisted and returned shapes of cache entries
//!
//! `record` defines the wire form written through the codec and substrate;
//! `result` defines what a `get` hands back to callers.

pub mod record;
pub mod result;

// Re-export commonly used types
pub use record::{decode_index, encode_index, format_wire_date, parse_wire_date, EntryRecord};
pub use result::CacheResult;
