//! Compression Wrapper
//!
//! zstd around any other serializer.

use crate::error::SerializeResult;
use crate::serializer::{CacheValue, Serializer};

/// Default zstd level, matching zstd's own default.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Compresses the inner serializer's output; decompresses before delegating back.
#[derive(Debug, Clone)]
pub struct CompressedSerializer<S> {
    inner: S,
    level: i32,
}

impl<S: Serializer> CompressedSerializer<S> {
    pub fn new(inner: S) -> Self {
        Self::with_level(inner, DEFAULT_COMPRESSION_LEVEL)
    }

    /// `level` follows zstd: 1 (fastest) to 22 (smallest).
    pub fn with_level(inner: S, level: i32) -> Self {
        Self { inner, level }
    }

    pub fn level(&self) -> i32 {
        self.level
    }
}

impl<S: Serializer> Serializer for CompressedSerializer<S> {
    fn serialize(&self, value: &CacheValue) -> SerializeResult<Vec<u8>> {
        let raw = self.inner.serialize(value)?;
        Ok(zstd::encode_all(raw.as_slice(), self.level)?)
    }

    fn deserialize(&self, bytes: &[u8]) -> SerializeResult<CacheValue> {
        let raw = zstd::decode_all(bytes)?;
        self.inner.deserialize(&raw)
    }

    fn name(&self) -> String {
        format!("zstd({})", self.inner.name())
    }
}
