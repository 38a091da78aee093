//! Configuration Module
//!
//! Handles loading cache engine configuration from environment variables.

use std::env;
use std::path::PathBuf;

/// Aggregate key used when none is configured.
pub const DEFAULT_AGGREGATE_KEY: &str = "keyed-cache";

/// Default substrate byte limit (5 MiB, the common browser storage quota).
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

// == Compression ==
/// Codec selection for persisted payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// gzip via flate2
    Gzip,
    /// Bytes are stored exactly as serialized
    None,
}

impl Compression {
    /// Parses a codec name, case-insensitively. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "gzip" | "gz" => Some(Compression::Gzip),
            "none" | "identity" | "off" => Some(Compression::None),
            _ => None,
        }
    }
}

/// Cache engine configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Physical key holding the whole persisted index
    pub aggregate_key: String,
    /// Codec applied between the serialized index and the substrate
    pub compression: Compression,
    /// Byte limit enforced by the shipped substrates
    pub quota_bytes: usize,
    /// Directory for the file-backed substrate; in-memory when unset
    pub storage_dir: Option<PathBuf>,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_AGGREGATE_KEY` - Persisted index key (default: `keyed-cache`)
    /// - `CACHE_COMPRESSION` - `gzip` or `none` (default: `gzip`)
    /// - `CACHE_QUOTA_BYTES` - Substrate byte limit (default: 5 MiB)
    /// - `CACHE_STORAGE_DIR` - Directory for file-backed storage (default: unset)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            aggregate_key: env::var("CACHE_AGGREGATE_KEY")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.aggregate_key),
            compression: env::var("CACHE_COMPRESSION")
                .ok()
                .and_then(|v| Compression::parse(&v))
                .unwrap_or(defaults.compression),
            quota_bytes: env::var("CACHE_QUOTA_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.quota_bytes),
            storage_dir: env::var_os("CACHE_STORAGE_DIR")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            aggregate_key: DEFAULT_AGGREGATE_KEY.to_string(),
            compression: Compression::Gzip,
            quota_bytes: DEFAULT_QUOTA_BYTES,
            storage_dir: None,
        }
    }
}
