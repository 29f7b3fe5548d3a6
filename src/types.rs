use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Tag for the variant held by a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Null,
    Int,
    Float,
    Text,
    Bool,
    Other,
}

impl ValueKind {
    /// Narrows a database-reported column type name to the kind its values
    /// should be converted to. Unknown names return `None` and are ingested
    /// as-is.
    pub fn from_type_name(type_name: &str) -> Option<Self> {
        match type_name.trim().to_uppercase().as_str() {
            "VARCHAR" | "TEXT" | "CHAR" | "BPCHAR" | "NAME" | "STRING" => Some(ValueKind::Text),
            "INT" | "INTEGER" | "INT2" | "INT4" | "INT8" | "SMALLINT" | "BIGINT" => {
                Some(ValueKind::Int)
            }
            "FLOAT" | "DOUBLE" | "REAL" | "FLOAT4" | "FLOAT8" | "NUMERIC" => Some(ValueKind::Float),
            "BOOL" | "BOOLEAN" => Some(ValueKind::Bool),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Int => "integer",
            ValueKind::Float => "float",
            ValueKind::Text => "text",
            ValueKind::Bool => "boolean",
            ValueKind::Other => "other",
        }
    }
}

/// A single cell.
///
/// Equality is structural: two values are equal only when they hold the same
/// variant and the same payload, so `Int(1)`, `Float(1.0)` and `Text("1")` are
/// all distinct. `Null` equals `Null`.
///
/// Non-finite floats are written to JSON as the strings `"NaN"`, `"inf"` and
/// `"-inf"`, since JSON numbers cannot carry them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Null,
    Int(i64),
    Float(#[serde(with = "float_repr")] f64),
    Text(String),
    Bool(bool),
    Other(Vec<u8>),
}

/// A value as handed over by a database driver, before narrowing.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Bytes(Vec<u8>),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Text(_) => ValueKind::Text,
            Value::Bool(_) => ValueKind::Bool,
            Value::Other(_) => ValueKind::Other,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Converts a driver value using the column's reported type name.
    ///
    /// Text types decode bytes as (lossy) UTF-8, integer and float types widen
    /// to `i64`/`f64`. A type name that is not recognized, or a raw value that
    /// does not fit the reported type, is passed through unchanged with bytes
    /// kept as [`Value::Other`].
    pub fn from_raw(type_name: &str, raw: RawValue) -> Self {
        match (ValueKind::from_type_name(type_name), raw) {
            (_, RawValue::Null) => Value::Null,
            (Some(ValueKind::Text), RawValue::Bytes(bytes)) => {
                Value::Text(String::from_utf8_lossy(&bytes).into_owned())
            }
            (Some(ValueKind::Int), RawValue::Int(i)) => Value::Int(i),
            (Some(ValueKind::Int), RawValue::Bytes(bytes)) => {
                let parsed = String::from_utf8_lossy(&bytes).trim().parse::<i64>();
                match parsed {
                    Ok(i) => Value::Int(i),
                    Err(_) => Value::Other(bytes),
                }
            }
            (Some(ValueKind::Float), RawValue::Float(f)) => Value::Float(f),
            (Some(ValueKind::Float), RawValue::Int(i)) => Value::Float(i as f64),
            (Some(ValueKind::Float), RawValue::Bytes(bytes)) => {
                let parsed = String::from_utf8_lossy(&bytes).trim().parse::<f64>();
                match parsed {
                    Ok(f) => Value::Float(f),
                    Err(_) => Value::Other(bytes),
                }
            }
            (_, raw) => Value::from_raw_as_is(raw),
        }
    }

    fn from_raw_as_is(raw: RawValue) -> Self {
        match raw {
            RawValue::Null => Value::Null,
            RawValue::Bytes(bytes) => Value::Other(bytes),
            RawValue::Int(i) => Value::Int(i),
            RawValue::Float(f) => Value::Float(f),
            RawValue::Bool(b) => Value::Bool(b),
        }
    }
}

impl PartialOrd for Value {
    /// Only values of the same variant are ordered; anything else, including
    /// `Null` against a non-null value, is incomparable.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Other(a), Value::Other(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

mod float_repr {
    use serde::de::{self, Deserializer};
    use serde::ser::Serializer;
    use serde::Deserialize;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Tag(String),
    }

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_str("NaN")
        } else if value.is_infinite() {
            serializer.serialize_str(if *value > 0.0 { "inf" } else { "-inf" })
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::Tag(tag) => match tag.as_str() {
                "NaN" => Ok(f64::NAN),
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                other => Err(de::Error::custom(format!("invalid float '{}'", other))),
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::Text(s) => write!(f, "{}", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Other(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Other(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}
