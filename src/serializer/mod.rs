//! Serializer Module
//!
//! Converts `CacheValue`s to bytes and back for persistence or transport.
//! Wrappers (compression, base64) compose over any base serializer.

mod binary;
mod compression;
mod encoding;
pub(crate) mod json;
mod string;
mod typed;
mod value;

use std::fmt::Debug;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SerializationError, SerializeResult};

pub use binary::BinarySerializer;
pub use compression::{CompressedSerializer, DEFAULT_COMPRESSION_LEVEL};
pub use encoding::Base64Serializer;
pub use json::JsonSerializer;
pub use string::{StringSerializer, TextEncoding};
pub use typed::TypedSerializer;
pub use value::CacheValue;

// == Serializer Trait ==
/// A stateless value <-> bytes transform.
///
/// For every value in a serializer's supported set,
/// `deserialize(&serialize(v)?)? == v`.
pub trait Serializer: Debug + Send + Sync {
    fn serialize(&self, value: &CacheValue) -> SerializeResult<Vec<u8>>;

    fn deserialize(&self, bytes: &[u8]) -> SerializeResult<CacheValue>;

    /// Describes the chain, e.g. `base64(zstd(json))`.
    fn name(&self) -> String;
}

impl Serializer for Box<dyn Serializer> {
    fn serialize(&self, value: &CacheValue) -> SerializeResult<Vec<u8>> {
        (**self).serialize(value)
    }

    fn deserialize(&self, bytes: &[u8]) -> SerializeResult<CacheValue> {
        (**self).deserialize(bytes)
    }

    fn name(&self) -> String {
        (**self).name()
    }
}

// == Factory ==
/// Builds a named base serializer, optionally wrapped in zstd compression.
///
/// Names: `json`, `binary` (alias `bincode`), `string` (alias `str`), `typed`.
pub fn create_serializer(name: &str, compress: bool) -> SerializeResult<Box<dyn Serializer>> {
    let base = base_serializer(name)?;
    if compress {
        Ok(Box::new(CompressedSerializer::new(base)))
    } else {
        Ok(base)
    }
}

fn base_serializer(name: &str) -> SerializeResult<Box<dyn Serializer>> {
    let serializer: Box<dyn Serializer> = match name.trim().to_ascii_lowercase().as_str() {
        "json" => Box::new(JsonSerializer::new()),
        "binary" | "bincode" => Box::new(BinarySerializer),
        "string" | "str" => Box::new(StringSerializer::default()),
        "typed" => Box::new(TypedSerializer),
        _ => return Err(SerializationError::UnknownSerializer(name.to_string())),
    };
    Ok(serializer)
}

// == Serializer Config ==
/// Declarative description of a serializer chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializerConfig {
    /// Base serializer name
    pub format: String,
    /// Text encoding for the string serializer
    pub encoding: TextEncoding,
    /// Wrap in zstd
    pub compress: bool,
    pub compression_level: i32,
    /// Wrap the (possibly compressed) bytes in base64
    pub base64: bool,
}

impl SerializerConfig {
    /// Builds the chain: base, then compression, then base64.
    pub fn build(&self) -> SerializeResult<Box<dyn Serializer>> {
        let mut serializer = match self.format.trim().to_ascii_lowercase().as_str() {
            "string" | "str" => Box::new(StringSerializer::new(self.encoding)),
            _ => base_serializer(&self.format)?,
        };
        if self.compress {
            serializer = Box::new(CompressedSerializer::with_level(
                serializer,
                self.compression_level,
            ));
        }
        if self.base64 {
            serializer = Box::new(Base64Serializer::new(serializer));
        }
        debug!(serializer = %serializer.name(), "serializer chain built");
        Ok(serializer)
    }
}

impl Default for SerializerConfig {
    fn default() -> Self {
        Self {
            format: "json".to_string(),
            encoding: TextEncoding::Utf8,
            compress: false,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            base64: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_names() {
        assert_eq!(create_serializer("json", false).unwrap().name(), "json");
        assert_eq!(create_serializer("BINCODE", false).unwrap().name(), "binary");
        assert_eq!(create_serializer("str", false).unwrap().name(), "string(utf-8)");
        assert_eq!(create_serializer("typed", true).unwrap().name(), "zstd(typed)");
    }

    #[test]
    fn test_factory_unknown_name() {
        let result = create_serializer("xml", false);
        assert!(matches!(result, Err(SerializationError::UnknownSerializer(name)) if name == "xml"));
    }

    #[test]
    fn test_config_builds_full_chain() {
        let config = SerializerConfig {
            format: "binary".to_string(),
            compress: true,
            base64: true,
            ..SerializerConfig::default()
        };
        let serializer = config.build().unwrap();
        assert_eq!(serializer.name(), "base64(zstd(binary))");

        let value = CacheValue::Bytes(vec![9; 64]);
        let bytes = serializer.serialize(&value).unwrap();
        assert!(bytes.is_ascii());
        assert_eq!(serializer.deserialize(&bytes).unwrap(), value);
    }

    #[test]
    fn test_config_string_encoding() {
        let config = SerializerConfig {
            format: "string".to_string(),
            encoding: TextEncoding::Utf16Le,
            ..SerializerConfig::default()
        };
        assert_eq!(config.build().unwrap().name(), "string(utf-16le)");
    }
}
