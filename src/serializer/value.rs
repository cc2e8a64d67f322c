//! Cache Value Module
//!
//! Dynamic value type the serializers operate on.

use std::collections::BTreeMap;
use std::fmt;

use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::SerializeResult;
use crate::serializer::json;

// == Cache Value ==
/// A self-describing value that can leave process memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CacheValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<CacheValue>),
    Map(BTreeMap<String, CacheValue>),
}

impl CacheValue {
    /// Short lowercase name of the variant, as used by the typed serializer.
    pub fn type_name(&self) -> &'static str {
        match self {
            CacheValue::Null => "null",
            CacheValue::Bool(_) => "bool",
            CacheValue::Int(_) => "int",
            CacheValue::Float(_) => "float",
            CacheValue::Str(_) => "str",
            CacheValue::Bytes(_) => "bytes",
            CacheValue::List(_) => "list",
            CacheValue::Map(_) => "map",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CacheValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Converts any serde-serializable value through its JSON shape.
    pub fn from_serialize<T: Serialize>(value: &T) -> SerializeResult<Self> {
        Ok(json::from_json(serde_json::to_value(value)?))
    }

    /// Rebuilds a typed value from its JSON shape.
    pub fn deserialize_into<T: DeserializeOwned>(&self) -> SerializeResult<T> {
        Ok(serde_json::from_value(json::to_json(self))?)
    }
}

/// Strings print raw, bytes as base64, containers as JSON.
impl fmt::Display for CacheValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheValue::Null => f.write_str("null"),
            CacheValue::Bool(b) => write!(f, "{}", b),
            CacheValue::Int(n) => write!(f, "{}", n),
            CacheValue::Float(x) => write!(f, "{}", x),
            CacheValue::Str(s) => f.write_str(s),
            CacheValue::Bytes(bytes) => f.write_str(&BASE64_STANDARD.encode(bytes)),
            CacheValue::List(_) | CacheValue::Map(_) => write!(f, "{}", json::to_json(self)),
        }
    }
}

impl From<bool> for CacheValue {
    fn from(value: bool) -> Self {
        CacheValue::Bool(value)
    }
}

impl From<i64> for CacheValue {
    fn from(value: i64) -> Self {
        CacheValue::Int(value)
    }
}

impl From<i32> for CacheValue {
    fn from(value: i32) -> Self {
        CacheValue::Int(value.into())
    }
}

impl From<f64> for CacheValue {
    fn from(value: f64) -> Self {
        CacheValue::Float(value)
    }
}

impl From<&str> for CacheValue {
    fn from(value: &str) -> Self {
        CacheValue::Str(value.to_string())
    }
}

impl From<String> for CacheValue {
    fn from(value: String) -> Self {
        CacheValue::Str(value)
    }
}

impl From<Vec<u8>> for CacheValue {
    fn from(value: Vec<u8>) -> Self {
        CacheValue::Bytes(value)
    }
}

impl From<Vec<CacheValue>> for CacheValue {
    fn from(value: Vec<CacheValue>) -> Self {
        CacheValue::List(value)
    }
}

impl From<BTreeMap<String, CacheValue>> for CacheValue {
    fn from(value: BTreeMap<String, CacheValue>) -> Self {
        CacheValue::Map(value)
    }
}

impl<T: Into<CacheValue>> From<Option<T>> for CacheValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CacheValue::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Session {
        user: String,
        visits: i64,
        admin: bool,
    }

    #[test]
    fn test_display() {
        assert_eq!(CacheValue::from("plain").to_string(), "plain");
        assert_eq!(CacheValue::Int(-4).to_string(), "-4");
        assert_eq!(CacheValue::Bytes(b"hi".to_vec()).to_string(), "aGk=");
        assert_eq!(CacheValue::Null.to_string(), "null");
        assert_eq!(
            CacheValue::List(vec![1.into(), "a".into()]).to_string(),
            r#"[1,"a"]"#
        );
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(CacheValue::from(None::<i64>), CacheValue::Null);
        assert_eq!(CacheValue::from(Some(3)), CacheValue::Int(3));
    }

    #[test]
    fn test_from_serialize_and_back() {
        let session = Session {
            user: "ada".to_string(),
            visits: 3,
            admin: false,
        };

        let value = CacheValue::from_serialize(&session).unwrap();
        assert_eq!(value.type_name(), "map");

        let restored: Session = value.deserialize_into().unwrap();
        assert_eq!(restored, session);
    }
}
