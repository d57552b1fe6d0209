use derive_more::Display;
use serde::{Deserialize, Serialize};

/// A single cell of a [`crate::Table`].
///
/// Trace events carry more than numbers: a task name or a CPU id is just as likely
/// as a frequency. Only numeric cells take part in arithmetic, see [`Value::as_f64`].
#[derive(Debug, Clone, Display, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[display("{_0}")]
    Bool(bool),
    #[display("{_0}")]
    Int(i64),
    #[display("{_0}")]
    Float(f64),
    #[display("{_0}")]
    Str(String),
}

impl Value {
    /// Numeric view of the cell. Booleans and strings have none, and neither does a NaN.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) if !v.is_nan() => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }
}

impl PartialEq for Value {
    /// Numbers compare by value regardless of representation, so a filter on
    /// `cpu == 2` matches both `Int(2)` and `Float(2.0)`.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (a, b) if a.is_numeric() && b.is_numeric() => {
                matches!((a.as_f64(), b.as_f64()), (Some(a), Some(b)) if a == b)
            }
            _ => false,
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}
