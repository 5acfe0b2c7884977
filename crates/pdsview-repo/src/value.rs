//! Generic DAG-CBOR values
//!
//! Repository blocks are self-describing DAG-CBOR. [`decode`] turns any block payload
//! into a [`Value`] without knowing its schema; [`encode`] is the inverse.
//!
//! A payload must hold exactly one well-formed value and nothing else. Trailing bytes,
//! truncated values, indefinite-length items, non-string map keys and tags other than
//! 42 (CID link) are rejected. Non-minimal integer heads and 32-bit floats are accepted
//! and normalized, so re-encoding may not reproduce the input bytes.

use std::collections::BTreeMap;

use base64::{Engine, prelude::BASE64_STANDARD_NO_PAD};
use bytes::Bytes;
use cid::Cid as IpldCid;
use ipld_core::ipld::Ipld;
use smol_str::SmolStr;

use crate::error::{DecodeError, EncodeError};

/// Reserved key holding a record's schema type
pub const TYPE_KEY: &str = "$type";

/// A decoded DAG-CBOR value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// CBOR null
    Null,
    /// CBOR boolean
    Boolean(bool),
    /// Integer, exact over the full CBOR range (-2^64 ..= 2^64 - 1)
    Integer(i128),
    /// 64-bit float
    Float(f64),
    /// UTF-8 text
    String(SmolStr),
    /// Raw byte string
    Bytes(Bytes),
    /// Tag-42 content link
    Link(IpldCid),
    /// Ordered list
    Array(Vec<Value>),
    /// Map with text keys
    Object(BTreeMap<SmolStr, Value>),
}

/// Coarse type of a [`Value`], for diagnostics
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Boolean,
    Integer,
    Float,
    String,
    Bytes,
    Link,
    Array,
    Object,
}

/// Decode one DAG-CBOR value that spans the whole of `data`
pub fn decode(data: &[u8]) -> Result<Value, DecodeError> {
    let ipld: Ipld = serde_ipld_dagcbor::from_slice(data).map_err(DecodeError::new)?;
    Ok(Value::from(ipld))
}

/// Encode a value as DAG-CBOR
///
/// Map keys are written in DAG-CBOR canonical order, so encoding is deterministic.
pub fn encode(value: &Value) -> Result<Vec<u8>, EncodeError> {
    let ipld = Ipld::from(value.clone());
    serde_ipld_dagcbor::to_vec(&ipld).map_err(EncodeError::new)
}

impl Value {
    /// The coarse type of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Integer(_) => ValueKind::Integer,
            Value::Float(_) => ValueKind::Float,
            Value::String(_) => ValueKind::String,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::Link(_) => ValueKind::Link,
            Value::Array(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
        }
    }

    /// Borrow the map if this is an object
    pub fn as_object(&self) -> Option<&BTreeMap<SmolStr, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Borrow the text if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Look up a key if this is an object
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// The `$type` string of a record, if this value is one
    pub fn type_discriminator(&self) -> Option<&str> {
        self.get(TYPE_KEY).and_then(Value::as_str)
    }

    /// Render as AT Protocol JSON
    ///
    /// Links become `{"$link": cid}` and byte strings `{"$bytes": base64}`.
    /// Integers outside the `i64`/`u64` range are rendered as strings.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Value::Null => Json::Null,
            Value::Boolean(b) => Json::Bool(*b),
            Value::Integer(i) => {
                if let Ok(v) = i64::try_from(*i) {
                    Json::from(v)
                } else if let Ok(v) = u64::try_from(*i) {
                    Json::from(v)
                } else {
                    Json::String(i.to_string())
                }
            }
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::String(s) => Json::String(s.to_string()),
            Value::Bytes(b) => {
                let mut map = serde_json::Map::new();
                map.insert(
                    "$bytes".to_string(),
                    Json::String(BASE64_STANDARD_NO_PAD.encode(b)),
                );
                Json::Object(map)
            }
            Value::Link(cid) => {
                let mut map = serde_json::Map::new();
                map.insert("$link".to_string(), Json::String(cid.to_string()));
                Json::Object(map)
            }
            Value::Array(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Object(map) => Json::Object(
                map.iter()
                    .map(|(k, v)| (k.to_string(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<Ipld> for Value {
    fn from(ipld: Ipld) -> Self {
        match ipld {
            Ipld::Null => Value::Null,
            Ipld::Bool(b) => Value::Boolean(b),
            Ipld::Integer(i) => Value::Integer(i),
            Ipld::Float(f) => Value::Float(f),
            Ipld::String(s) => Value::String(SmolStr::from(s)),
            Ipld::Bytes(b) => Value::Bytes(Bytes::from(b)),
            Ipld::Link(cid) => Value::Link(cid),
            Ipld::List(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            Ipld::Map(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (SmolStr::from(k), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for Ipld {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Ipld::Null,
            Value::Boolean(b) => Ipld::Bool(b),
            Value::Integer(i) => Ipld::Integer(i),
            Value::Float(f) => Ipld::Float(f),
            Value::String(s) => Ipld::String(s.to_string()),
            Value::Bytes(b) => Ipld::Bytes(b.to_vec()),
            Value::Link(cid) => Ipld::Link(cid),
            Value::Array(items) => Ipld::List(items.into_iter().map(Ipld::from).collect()),
            Value::Object(map) => Ipld::Map(
                map.into_iter()
                    .map(|(k, v)| (k.to_string(), Ipld::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(SmolStr::new(s))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i as i128)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<BTreeMap<SmolStr, Value>> for Value {
    fn from(map: BTreeMap<SmolStr, Value>) -> Self {
        Value::Object(map)
    }
}
