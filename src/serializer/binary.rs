//! Binary Serializer
//!
//! Full-fidelity encoding with bincode. Output is only meaningful to this
//! crate's `CacheValue` layout.

use crate::error::SerializeResult;
use crate::serializer::{CacheValue, Serializer};

/// Compact binary encoding that preserves every variant exactly.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinarySerializer;

impl Serializer for BinarySerializer {
    fn serialize(&self, value: &CacheValue) -> SerializeResult<Vec<u8>> {
        Ok(bincode::serialize(value)?)
    }

    fn deserialize(&self, bytes: &[u8]) -> SerializeResult<CacheValue> {
        Ok(bincode::deserialize(bytes)?)
    }

    fn name(&self) -> String {
        "binary".to_string()
    }
}
