//! gzip codec backed by flate2.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use super::Codec;
use crate::error::{CacheError, Result};

/// Compresses persisted payloads with gzip.
#[derive(Debug, Clone, Copy)]
pub struct GzipCodec {
    level: flate2::Compression,
}

impl GzipCodec {
    /// Creates a codec with an explicit compression level (0-9).
    pub fn with_level(level: u32) -> Self {
        Self {
            level: flate2::Compression::new(level.min(9)),
        }
    }
}

impl Default for GzipCodec {
    fn default() -> Self {
        Self {
            level: flate2::Compression::default(),
        }
    }
}

impl Codec for GzipCodec {
    fn name(&self) -> &'static str {
        "gzip"
    }

    fn encode(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::new(), self.level);
        encoder
            .write_all(bytes)
            .map_err(|e| CacheError::Codec(format!("gzip encode failed: {}", e)))?;
        encoder
            .finish()
            .map_err(|e| CacheError::Codec(format!("gzip encode failed: {}", e)))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        let mut decoder = GzDecoder::new(bytes);
        let mut out = Vec::new();
        decoder
            .read_to_end(&mut out)
            .map_err(|e| CacheError::Codec(format!("gzip decode failed: {}", e)))?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gzip_roundtrip() {
        let codec = GzipCodec::default();
        let payload = "{\"u1\":{\"profile\":[]}}".repeat(50);

        let encoded = codec.encode(payload.as_bytes()).unwrap();
        assert!(encoded.len() < payload.len());
        assert_eq!(codec.decode(&encoded).unwrap(), payload.as_bytes());
    }

    #[test]
    fn test_gzip_rejects_garbage() {
        let codec = GzipCodec::with_level(9);
        let result = codec.decode(b"definitely not gzip");
        assert!(matches!(result, Err(CacheError::Codec(_))));
    }
}
