//! Text-Safe Encoding Wrapper
//!
//! Base64 around any other serializer so its bytes survive text-only channels.

use base64::prelude::BASE64_STANDARD;
use base64::Engine;

use crate::error::SerializeResult;
use crate::serializer::{CacheValue, Serializer};

/// Encodes the inner serializer's output with the standard base64 alphabet.
#[derive(Debug, Clone)]
pub struct Base64Serializer<S> {
    inner: S,
}

impl<S: Serializer> Base64Serializer<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S: Serializer> Serializer for Base64Serializer<S> {
    fn serialize(&self, value: &CacheValue) -> SerializeResult<Vec<u8>> {
        let raw = self.inner.serialize(value)?;
        Ok(BASE64_STANDARD.encode(raw).into_bytes())
    }

    fn deserialize(&self, bytes: &[u8]) -> SerializeResult<CacheValue> {
        let raw = BASE64_STANDARD.decode(bytes)?;
        self.inner.deserialize(&raw)
    }

    fn name(&self) -> String {
        format!("base64({})", self.inner.name())
    }
}
