//! Typed Serializer
//!
//! JSON envelope carrying an explicit type tag per value, so decoding
//! rebuilds the exact variant instead of a structurally similar one.

use std::collections::BTreeMap;

use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use serde_json::{json, Map, Value};

use crate::error::{SerializationError, SerializeResult};
use crate::serializer::{CacheValue, Serializer};

/// Writes `{"type": ..., "value": ...}` envelopes, nested for containers.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypedSerializer;

impl Serializer for TypedSerializer {
    fn serialize(&self, value: &CacheValue) -> SerializeResult<Vec<u8>> {
        Ok(serde_json::to_vec(&seal(value))?)
    }

    fn deserialize(&self, bytes: &[u8]) -> SerializeResult<CacheValue> {
        let envelope: Value = serde_json::from_slice(bytes)?;
        open_envelope(&envelope)
    }

    fn name(&self) -> String {
        "typed".to_string()
    }
}

fn seal(value: &CacheValue) -> Value {
    let payload = match value {
        CacheValue::Null => Value::Null,
        CacheValue::Bool(b) => json!(b),
        CacheValue::Int(n) => json!(n),
        // Non-finite floats have no JSON number form.
        CacheValue::Float(x) if x.is_finite() => json!(x),
        CacheValue::Float(x) => json!(x.to_string()),
        CacheValue::Str(s) => json!(s),
        CacheValue::Bytes(bytes) => json!(BASE64_STANDARD.encode(bytes)),
        CacheValue::List(items) => Value::Array(items.iter().map(seal).collect()),
        CacheValue::Map(map) => Value::Object(
            map.iter()
                .map(|(key, item)| (key.clone(), seal(item)))
                .collect::<Map<String, Value>>(),
        ),
    };
    json!({ "type": value.type_name(), "value": payload })
}

fn open_envelope(envelope: &Value) -> SerializeResult<CacheValue> {
    let type_name = envelope
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("missing \"type\" tag"))?;
    let payload = envelope
        .get("value")
        .ok_or_else(|| malformed("missing \"value\" field"))?;

    let value = match type_name {
        "null" => CacheValue::Null,
        "bool" => CacheValue::Bool(payload.as_bool().ok_or_else(|| mismatch("bool"))?),
        "int" => CacheValue::Int(payload.as_i64().ok_or_else(|| mismatch("int"))?),
        "float" => CacheValue::Float(match payload {
            Value::String(text) => text.parse().map_err(|_| mismatch("float"))?,
            other => other.as_f64().ok_or_else(|| mismatch("float"))?,
        }),
        "str" => CacheValue::Str(payload.as_str().ok_or_else(|| mismatch("str"))?.to_string()),
        "bytes" => {
            let text = payload.as_str().ok_or_else(|| mismatch("bytes"))?;
            CacheValue::Bytes(BASE64_STANDARD.decode(text)?)
        }
        "list" => CacheValue::List(
            payload
                .as_array()
                .ok_or_else(|| mismatch("list"))?
                .iter()
                .map(open_envelope)
                .collect::<SerializeResult<Vec<_>>>()?,
        ),
        "map" => CacheValue::Map(
            payload
                .as_object()
                .ok_or_else(|| mismatch("map"))?
                .iter()
                .map(|(key, item)| open_envelope(item).map(|value| (key.clone(), value)))
                .collect::<SerializeResult<BTreeMap<_, _>>>()?,
        ),
        other => return Err(malformed(&format!("unknown type tag {:?}", other))),
    };
    Ok(value)
}

fn malformed(reason: &str) -> SerializationError {
    SerializationError::Malformed(reason.to_string())
}

fn mismatch(type_name: &str) -> SerializationError {
    SerializationError::Malformed(format!("payload does not match type {}", type_name))
}
