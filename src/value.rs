// used for persistence
use rusqlite::types::{FromSql, FromSqlResult, Null, ToSql, ToSqlOutput, ValueRef};

// used for the opaque Array/Object payloads
use serde_json::Value as Json;

// used to print out readable forms of a value
use std::fmt;

/// A single typed field of a record.
///
/// Scalars map one-to-one onto SQLite storage classes. `Sequence` holds a
/// decomposed multi-valued field, or any array/object payload read back from
/// an opaque column; it is stored as JSON text.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Blob(Vec<u8>),
    Sequence(Vec<Value>),
}

/// The kind of a [`Value`], used when deciding column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Null,
    Bool,
    Integer,
    Float,
    Text,
    Blob,
    Sequence,
}

pub type Record = Vec<Value>;

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Null => Kind::Null,
            Value::Bool(_) => Kind::Bool,
            Value::Integer(_) => Kind::Integer,
            Value::Float(_) => Kind::Float,
            Value::Text(_) => Kind::Text,
            Value::Blob(_) => Kind::Blob,
            Value::Sequence(_) => Kind::Sequence,
        }
    }
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
    pub fn to_json(&self) -> Json {
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::from(*b),
            Value::Integer(i) => Json::from(*i),
            // non-finite floats have no JSON form and become null
            Value::Float(f) => Json::from(*f),
            Value::Text(s) => Json::from(s.as_str()),
            Value::Blob(b) => Json::from(b.clone()),
            Value::Sequence(items) => Json::Array(items.iter().map(Value::to_json).collect()),
        }
    }
    pub fn from_json(json: &Json) -> Value {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
            },
            Json::String(s) => Value::Text(s.clone()),
            Json::Array(items) => Value::Sequence(items.iter().map(Value::from_json).collect()),
            Json::Object(_) => Value::Text(json.to_string()),
        }
    }
    /// Decodes a raw SQLite value. Text that is not valid UTF-8 is kept as a blob.
    pub fn convert(value: ValueRef<'_>) -> Value {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Float(f),
            ValueRef::Text(t) => match std::str::from_utf8(t) {
                Ok(s) => Value::Text(s.to_owned()),
                Err(_) => Value::Blob(t.to_vec()),
            },
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        }
    }
}

/// Column types whose payload is serialized on write and deserialized on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpaqueType {
    Array,
    Object,
}

impl OpaqueType {
    pub const ARRAY: &'static str = "Array";
    pub const OBJECT: &'static str = "Object";

    pub fn from_declared(declared: &str) -> Option<OpaqueType> {
        let declared = declared.trim();
        if declared.eq_ignore_ascii_case(Self::ARRAY) {
            Some(OpaqueType::Array)
        } else if declared.eq_ignore_ascii_case(Self::OBJECT) {
            Some(OpaqueType::Object)
        } else {
            None
        }
    }
    pub fn name(&self) -> &'static str {
        match self {
            OpaqueType::Array => Self::ARRAY,
            OpaqueType::Object => Self::OBJECT,
        }
    }
    /// Reverses the JSON serialization done by `ToSql`. Payloads that are not
    /// JSON are returned as they were stored.
    pub fn decode(&self, value: ValueRef<'_>) -> Value {
        let parsed = match value {
            ValueRef::Text(t) | ValueRef::Blob(t) => serde_json::from_slice::<Json>(t).ok(),
            _ => None,
        };
        match parsed {
            Some(json) => Value::from_json(&json),
            None => Value::convert(value),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::from(Null),
            Value::Bool(b) => ToSqlOutput::from(*b),
            Value::Integer(i) => ToSqlOutput::from(*i),
            Value::Float(f) => ToSqlOutput::from(*f),
            Value::Text(s) => ToSqlOutput::from(s.as_str()),
            Value::Blob(b) => ToSqlOutput::from(b.as_slice()),
            Value::Sequence(_) => ToSqlOutput::from(self.to_json().to_string()),
        })
    }
}
impl FromSql for Value {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Ok(Value::convert(value))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Null => write!(f, "None"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Integer(i) => write!(f, "{}", i),
            // Debug keeps the fractional part, so 2.0 prints as "2.0" and reads back as a float
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Text(s) => write!(f, "{}", s),
            Value::Blob(b) => write!(f, "<{} bytes>", b.len()),
            Value::Sequence(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "({})", parts.join(", "))
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self { Value::Bool(b) }
}
impl From<i64> for Value {
    fn from(i: i64) -> Self { Value::Integer(i) }
}
impl From<i32> for Value {
    fn from(i: i32) -> Self { Value::Integer(i as i64) }
}
impl From<f64> for Value {
    fn from(x: f64) -> Self { Value::Float(x) }
}
impl From<&str> for Value {
    fn from(s: &str) -> Self { Value::Text(s.to_owned()) }
}
impl From<String> for Value {
    fn from(s: String) -> Self { Value::Text(s) }
}
impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self { Value::Sequence(items) }
}
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(o: Option<T>) -> Self {
        o.map(Into::into).unwrap_or(Value::Null)
    }
}
