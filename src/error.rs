//! Error types for the cache engine
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for persistence and codec failures.
///
/// None of these reach callers of the engine's public operations: the engine
/// logs them and reports the outcome through
/// [`PersistStatus`](crate::cache::PersistStatus).
#[derive(Error, Debug)]
pub enum CacheError {
    /// The substrate refused a write because it would exceed its byte limit
    #[error("Quota exceeded: {requested} bytes requested, {available} bytes available")]
    QuotaExceeded { requested: usize, available: usize },

    /// The substrate could not be reached
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Filesystem failure in a file-backed substrate
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The codec could not encode or decode a payload
    #[error("Codec error: {0}")]
    Codec(String),

    /// The index could not be converted to or from its persisted form
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CacheError {
    /// Returns true when the substrate rejected the write for size reasons.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, CacheError::QuotaExceeded { .. })
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache engine.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_message() {
        let err = CacheError::QuotaExceeded {
            requested: 120,
            available: 100,
        };
        assert!(err.is_quota_exceeded());
        assert_eq!(
            err.to_string(),
            "Quota exceeded: 120 bytes requested, 100 bytes available"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: CacheError = io.into();
        assert!(matches!(err, CacheError::Io(_)));
        assert!(!err.is_quota_exceeded());
    }
}
