//! Error types for the cache engine
//!
//! Provides unified error handling using thiserror. Cache misses are not
//! errors; they surface as `None` from the read operations.

use thiserror::Error;

// == Cache Error Enum ==
/// Construction and configuration failures.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Policy name not recognized by a factory
    #[error("Unknown policy: {0}")]
    UnknownPolicy(String),

    /// Configuration could not be parsed or holds an invalid value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serializer construction failed
    #[error(transparent)]
    Serialization(#[from] SerializationError),
}

// == Serialization Error Enum ==
/// Failure converting a value to or from bytes.
#[derive(Error, Debug)]
pub enum SerializationError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Binary encoding error: {0}")]
    Binary(#[from] bincode::Error),

    /// zstd surfaces its failures as io errors
    #[error("Compression error: {0}")]
    Compression(#[from] std::io::Error),

    #[error("Base64 decode error: {0}")]
    Encoding(#[from] base64::DecodeError),

    /// Bytes are not valid in the configured text encoding
    #[error("Invalid text: {0}")]
    InvalidText(String),

    /// Value cannot be represented by this serializer
    #[error("Unsupported value: {0}")]
    Unsupported(String),

    /// Input parsed but does not have the expected shape
    #[error("Malformed input: {0}")]
    Malformed(String),

    #[error("Unknown serializer: {0}")]
    UnknownSerializer(String),
}

// == Result Type Aliases ==
/// Convenience Result type for the cache engine.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Result type returned by serializers.
pub type SerializeResult<T> = std::result::Result<T, SerializationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CacheError::UnknownPolicy("mru".to_string());
        assert_eq!(err.to_string(), "Unknown policy: mru");

        let err = SerializationError::UnknownSerializer("xml".to_string());
        assert_eq!(err.to_string(), "Unknown serializer: xml");
    }

    #[test]
    fn test_serialization_error_converts_into_cache_error() {
        let err: CacheError = SerializationError::Malformed("empty".to_string()).into();
        assert!(matches!(err, CacheError::Serialization(_)));
        assert_eq!(err.to_string(), "Malformed input: empty");
    }
}
