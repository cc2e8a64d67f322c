//! String Serializer
//!
//! Plain text encode/decode under a configurable character encoding.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{SerializationError, SerializeResult};
use crate::serializer::{CacheValue, Serializer};

// == Text Encoding ==
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextEncoding {
    #[default]
    Utf8,
    Utf16Le,
    Ascii,
    Latin1,
}

impl TextEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Utf16Le => "utf-16le",
            TextEncoding::Ascii => "ascii",
            TextEncoding::Latin1 => "latin-1",
        }
    }

    pub fn encode(&self, text: &str) -> SerializeResult<Vec<u8>> {
        match self {
            TextEncoding::Utf8 => Ok(text.as_bytes().to_vec()),
            TextEncoding::Utf16Le => Ok(text.encode_utf16().flat_map(u16::to_le_bytes).collect()),
            TextEncoding::Ascii => {
                if text.is_ascii() {
                    Ok(text.as_bytes().to_vec())
                } else {
                    Err(SerializationError::Unsupported(
                        "text contains non-ASCII characters".to_string(),
                    ))
                }
            }
            TextEncoding::Latin1 => text
                .chars()
                .map(|c| {
                    u8::try_from(u32::from(c)).map_err(|_| {
                        SerializationError::Unsupported(format!("{:?} is outside Latin-1", c))
                    })
                })
                .collect(),
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> SerializeResult<String> {
        match self {
            TextEncoding::Utf8 => String::from_utf8(bytes.to_vec())
                .map_err(|e| SerializationError::InvalidText(e.to_string())),
            TextEncoding::Utf16Le => {
                if bytes.len() % 2 != 0 {
                    return Err(SerializationError::InvalidText(
                        "odd byte count for UTF-16".to_string(),
                    ));
                }
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect();
                String::from_utf16(&units).map_err(|e| SerializationError::InvalidText(e.to_string()))
            }
            TextEncoding::Ascii => {
                if bytes.is_ascii() {
                    Ok(bytes.iter().map(|&b| char::from(b)).collect())
                } else {
                    Err(SerializationError::InvalidText(
                        "byte outside the ASCII range".to_string(),
                    ))
                }
            }
            TextEncoding::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TextEncoding {
    type Err = SerializationError;

    fn from_str(s: &str) -> SerializeResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(TextEncoding::Utf8),
            "utf-16le" | "utf16le" | "utf-16" => Ok(TextEncoding::Utf16Le),
            "ascii" | "us-ascii" => Ok(TextEncoding::Ascii),
            "latin-1" | "latin1" | "iso-8859-1" => Ok(TextEncoding::Latin1),
            other => Err(SerializationError::Unsupported(format!(
                "unknown text encoding {}",
                other
            ))),
        }
    }
}

// == String Serializer ==
/// Writes a value's text form; always decodes to `CacheValue::Str`.
///
/// Round-trips only string values. Anything else is written through its
/// `Display` form.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringSerializer {
    encoding: TextEncoding,
}

impl StringSerializer {
    pub fn new(encoding: TextEncoding) -> Self {
        Self { encoding }
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }
}

impl Serializer for StringSerializer {
    fn serialize(&self, value: &CacheValue) -> SerializeResult<Vec<u8>> {
        match value {
            CacheValue::Str(text) => self.encoding.encode(text),
            other => self.encoding.encode(&other.to_string()),
        }
    }

    fn deserialize(&self, bytes: &[u8]) -> SerializeResult<CacheValue> {
        self.encoding.decode(bytes).map(CacheValue::Str)
    }

    fn name(&self) -> String {
        format!("string({})", self.encoding)
    }
}
