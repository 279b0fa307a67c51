//! The value universe of observable quantities.
//!
//! Signals carry values of type [`Value`]: booleans, integers, floats and
//! opaque symbols. Every variant is `Eq + Ord + Hash` so that values can be
//! stored in combination sets and used as canonical bucket representatives.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single observable value.
///
/// Floats are wrapped in [`OrderedFloat`] to obtain total ordering and
/// hashing. Symbols identify caller-defined enumeration handles by a stable
/// name and compare by that name only.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Value {
    /// Boolean values.
    Bool(bool),
    /// Signed integer values.
    Int(i64),
    /// Double-precision float values.
    Float(OrderedFloat<f64>),
    /// Opaque enumeration handles, identified by a stable name.
    Symbol(String),
}

impl Value {
    /// Creates a symbol value from its stable name.
    pub fn symbol(name: impl Into<String>) -> Self {
        Value::Symbol(name.into())
    }

    /// The numeric reading of the value, if it has one.
    ///
    /// Booleans and symbols are not numbers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(f.into_inner()),
            Value::Bool(_) | Value::Symbol(_) => None,
        }
    }

    /// The boolean reading of the value, if it has one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(OrderedFloat(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Symbol(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Symbol(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Symbol(s) => write!(f, "{s}"),
        }
    }
}
