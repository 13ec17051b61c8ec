//! Loosely-typed row values and their semantic comparison
//!
//! Rows come out of a store (or a fixture file) as column → value maps where
//! numbers may arrive as text, nulls as the string `"None"`, and JSON documents
//! as embedded text. Everything here works over one closed [`Value`] type.

use bigdecimal::BigDecimal;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// One persisted or expected record, column order preserved
pub type Row = IndexMap<String, Value>;

/// Shared `Null` used when a column is absent from a row
pub static NULL: Value = Value::Null;

/// A loosely-typed value as read from a store or a fixture
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    /// Arbitrary-precision decimal, so `10` and `10.00` keep their magnitude
    Number(BigDecimal),
    String(String),
    Array(Vec<Value>),
    Object(IndexMap<String, Value>),
}

impl Value {
    /// Parse JSON text into a value
    pub fn parse_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<serde_json::Value>(text).map(Value::from)
    }

    /// Convert into a `serde_json::Value`
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => {
                let text = n.to_string();
                match serde_json::Number::from_str(&text) {
                    Ok(number) => serde_json::Value::Number(number),
                    Err(_) => serde_json::Value::String(text),
                }
            }
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Array(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Self::Object(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }

    /// True for any null-like value: `null`, `""`, `"null"`, `"none"` (any case)
    pub fn is_null_like(&self) -> bool {
        matches!(normalize(self), Normalized::NullLike)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Field lookup on an object; `None` for missing fields and non-objects
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|map| map.get(key))
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Self::Array(_) | Self::Object(_))
    }

    /// True when the value is a document, or text shaped like one (`{..}` / `[..]`)
    pub fn looks_like_json(&self) -> bool {
        match self {
            Self::Array(_) | Self::Object(_) => true,
            Self::String(s) => {
                let s = s.trim();
                (s.starts_with('{') && s.ends_with('}')) || (s.starts_with('[') && s.ends_with(']'))
            }
            _ => false,
        }
    }

    /// Short type label for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Number(n) => write!(f, "{}", n),
            Self::String(s) => write!(f, "{}", s),
            Self::Array(_) | Self::Object(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => {
                let text = n.to_string();
                match BigDecimal::from_str(&text) {
                    Ok(decimal) => Self::Number(decimal),
                    Err(_) => Self::String(text),
                }
            }
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => Self::Array(items.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Number(BigDecimal::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        // Non-finite floats have no decimal form; keep their text
        match BigDecimal::from_str(&value.to_string()) {
            Ok(decimal) => Self::Number(decimal),
            Err(_) => Self::String(value.to_string()),
        }
    }
}

impl From<BigDecimal> for Value {
    fn from(value: BigDecimal) -> Self {
        Self::Number(value)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

/// Canonical comparable form of a scalar
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    /// `null`, empty string, `"null"`, `"none"`
    NullLike,

    /// Numeric-typed value, magnitude preserved
    Number(BigDecimal),

    /// Trimmed string form of anything else
    Text(String),
}

impl Normalized {
    /// Decimal magnitude for numbers and numeric strings
    pub fn as_decimal(&self) -> Option<BigDecimal> {
        match self {
            Self::NullLike => None,
            Self::Number(n) => Some(n.clone()),
            Self::Text(t) => parse_decimal(t),
        }
    }

    /// Canonical key text: equal values produce equal keys
    pub fn key(&self) -> String {
        match self.as_decimal() {
            Some(decimal) => decimal.normalized().to_string(),
            None => self.to_string(),
        }
    }
}

impl fmt::Display for Normalized {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NullLike => write!(f, "null"),
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(t) => write!(f, "{}", t),
        }
    }
}

impl From<Normalized> for Value {
    fn from(value: Normalized) -> Self {
        match value {
            Normalized::NullLike => Value::Null,
            Normalized::Number(n) => Value::Number(n),
            Normalized::Text(t) => Value::String(t),
        }
    }
}

/// Canonicalize a value for comparison
///
/// Idempotent: normalizing the value form of a normalized result yields the
/// same result.
pub fn normalize(value: &Value) -> Normalized {
    match value {
        Value::Null => Normalized::NullLike,
        Value::Number(n) => Normalized::Number(n.clone()),
        Value::Bool(b) => Normalized::Text(b.to_string()),
        Value::String(s) => {
            let trimmed = s.trim();
            if is_null_token(trimmed) {
                Normalized::NullLike
            } else {
                Normalized::Text(trimmed.to_string())
            }
        }
        Value::Array(_) | Value::Object(_) => Normalized::Text(value.to_json().to_string()),
    }
}

/// Semantic equality of two values
///
/// Null-like values are mutually equal, numeric values (including numeric
/// strings) compare by decimal magnitude, everything else by trimmed text.
pub fn values_equal(expected: &Value, actual: &Value) -> bool {
    normalized_equal(&normalize(expected), &normalize(actual))
}

/// Semantic equality over already-normalized values
pub fn normalized_equal(expected: &Normalized, actual: &Normalized) -> bool {
    match (expected, actual) {
        (Normalized::NullLike, Normalized::NullLike) => true,
        (Normalized::NullLike, _) | (_, Normalized::NullLike) => false,
        _ => match (expected.as_decimal(), actual.as_decimal()) {
            (Some(a), Some(b)) => a == b,
            _ => expected.to_string() == actual.to_string(),
        },
    }
}

fn is_null_token(trimmed: &str) -> bool {
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") || trimmed.eq_ignore_ascii_case("none")
}

fn parse_decimal(text: &str) -> Option<BigDecimal> {
    // BigDecimal accepts exponents; reject words like "e5" that it would not
    // otherwise see as numbers anyway, and stray whitespace inside
    if text.is_empty() || text.chars().any(char::is_whitespace) {
        return None;
    }
    BigDecimal::from_str(text).ok()
}
