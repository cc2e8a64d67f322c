//! JSON Serializer
//!
//! Structural serialization through `serde_json`; values JSON cannot express
//! fall back to their string form.

use serde_json::{Map, Number, Value};

use crate::error::SerializeResult;
use crate::serializer::{CacheValue, Serializer};

/// Serializes values as JSON text.
///
/// Fidelity limits: raw bytes are written as a base64 string and non-finite
/// floats as their display string, so both decode back as `Str`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer {
    pretty: bool,
}

impl JsonSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indented output.
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl Serializer for JsonSerializer {
    fn serialize(&self, value: &CacheValue) -> SerializeResult<Vec<u8>> {
        let json = to_json(value);
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(&json)?
        } else {
            serde_json::to_vec(&json)?
        };
        Ok(bytes)
    }

    fn deserialize(&self, bytes: &[u8]) -> SerializeResult<CacheValue> {
        let json: Value = serde_json::from_slice(bytes)?;
        Ok(from_json(json))
    }

    fn name(&self) -> String {
        "json".to_string()
    }
}

// == Conversions ==
pub(crate) fn to_json(value: &CacheValue) -> Value {
    match value {
        CacheValue::Null => Value::Null,
        CacheValue::Bool(b) => Value::Bool(*b),
        CacheValue::Int(n) => Value::Number((*n).into()),
        CacheValue::Float(x) => Number::from_f64(*x)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(value.to_string())),
        CacheValue::Str(s) => Value::String(s.clone()),
        CacheValue::Bytes(_) => Value::String(value.to_string()),
        CacheValue::List(items) => Value::Array(items.iter().map(to_json).collect()),
        CacheValue::Map(map) => Value::Object(
            map.iter()
                .map(|(key, item)| (key.clone(), to_json(item)))
                .collect::<Map<String, Value>>(),
        ),
    }
}

pub(crate) fn from_json(json: Value) -> CacheValue {
    match json {
        Value::Null => CacheValue::Null,
        Value::Bool(b) => CacheValue::Bool(b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => CacheValue::Int(i),
            // u64 beyond i64 and real floats
            None => CacheValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => CacheValue::Str(s),
        Value::Array(items) => CacheValue::List(items.into_iter().map(from_json).collect()),
        Value::Object(map) => CacheValue::Map(
            map.into_iter()
                .map(|(key, item)| (key, from_json(item)))
                .collect(),
        ),
    }
}
