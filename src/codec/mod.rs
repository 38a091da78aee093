//! Codec Module
//!
//! Pluggable encode/decode stage between the serialized index and the bytes
//! handed to a persistence adapter.

mod gzip;

pub use gzip::GzipCodec;

use crate::config::Compression;
use crate::error::Result;

// == Codec Trait ==
/// Lossless transform applied to persisted payloads.
///
/// `decode(encode(x))` must equal `x`. A decode failure while loading is
/// treated as "no data" by the entry store, never propagated.
pub trait Codec: Send + Sync {
    /// Short name used in log events.
    fn name(&self) -> &'static str;

    fn encode(&self, bytes: &[u8]) -> Result<Vec<u8>>;

    fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>>;
}

// == Identity Codec ==
/// Pass-through codec that stores bytes unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityCodec;

impl Codec for IdentityCodec {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn encode(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(bytes.to_vec())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(bytes.to_vec())
    }
}

/// Builds the codec selected by configuration.
pub fn codec_for(compression: Compression) -> Box<dyn Codec> {
    match compression {
        Compression::Gzip => Box::new(GzipCodec::default()),
        Compression::None => Box::new(IdentityCodec),
    }
}
