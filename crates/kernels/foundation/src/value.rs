//! Scalar values, element dtypes and declared value ranges.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::TypeId;

/// Element type of a dense tensor.
///
/// Enum-valued pvariables are stored as [`DType::Int`]; the literal's index
/// within its enum type is the stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Bool,
    Int,
    Real,
}

impl DType {
    /// Default element for this dtype (`false`, `0`, `0.0`).
    pub fn default_value(self) -> Value {
        match self {
            DType::Bool => Value::Bool(false),
            DType::Int => Value::Int(0),
            DType::Real => Value::Real(0.0),
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DType::Bool => "bool",
            DType::Int => "int",
            DType::Real => "real",
        };
        f.write_str(name)
    }
}

/// A single grounded value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Real(f64),
}

impl Value {
    /// The dtype this value is stored as.
    pub fn dtype(&self) -> DType {
        match self {
            Value::Bool(_) => DType::Bool,
            Value::Int(_) => DType::Int,
            Value::Real(_) => DType::Real,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view of the value; booleans read as `0.0` / `1.0`.
    pub fn as_real(&self) -> f64 {
        match self {
            Value::Bool(v) => f64::from(u8::from(*v)),
            Value::Int(v) => *v as f64,
            Value::Real(v) => *v,
        }
    }

    /// Truthiness used when a constraint function returns a non-boolean.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(v) => *v,
            Value::Int(v) => *v != 0,
            Value::Real(v) => *v != 0.0,
        }
    }

    /// Convert to `dtype` without losing information.
    ///
    /// Booleans widen to integers, integers widen to reals. Narrowing
    /// conversions (real to int, number to bool) return `None`.
    pub fn widen_to(self, dtype: DType) -> Option<Value> {
        match (self, dtype) {
            (v, d) if v.dtype() == d => Some(v),
            (Value::Bool(b), DType::Int) => Some(Value::Int(i64::from(b))),
            (Value::Bool(b), DType::Real) => Some(Value::Real(f64::from(u8::from(b)))),
            (Value::Int(i), DType::Real) => Some(Value::Real(i as f64)),
            _ => None,
        }
    }

    /// Convert to `dtype` the way a numeric evaluation would cast.
    ///
    /// Reals truncate toward zero when cast to int; any nonzero number is
    /// `true` when cast to bool.
    pub fn cast(self, dtype: DType) -> Value {
        match dtype {
            DType::Bool => Value::Bool(self.is_truthy()),
            DType::Int => match self {
                Value::Bool(b) => Value::Int(i64::from(b)),
                Value::Int(i) => Value::Int(i),
                Value::Real(r) => Value::Int(r as i64),
            },
            DType::Real => Value::Real(self.as_real()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Real(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

/// The resolved value range of a pvariable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueRange {
    Bool,
    Int,
    Real,
    /// Values are literals of the named enum type, stored as their index.
    Enum(TypeId),
}

impl ValueRange {
    /// Resolve a primitive range keyword (`bool`, `int`, `real`).
    pub fn primitive(name: &str) -> Option<Self> {
        match name {
            "bool" => Some(ValueRange::Bool),
            "int" => Some(ValueRange::Int),
            "real" => Some(ValueRange::Real),
            _ => None,
        }
    }

    /// Storage dtype for values in this range.
    pub fn dtype(&self) -> DType {
        match self {
            ValueRange::Bool => DType::Bool,
            ValueRange::Int | ValueRange::Enum(_) => DType::Int,
            ValueRange::Real => DType::Real,
        }
    }

    /// Value used for any grounding left unspecified.
    pub fn default_value(&self) -> Value {
        self.dtype().default_value()
    }

    pub fn enum_type(&self) -> Option<&TypeId> {
        match self {
            ValueRange::Enum(t) => Some(t),
            _ => None,
        }
    }
}

impl fmt::Display for ValueRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueRange::Bool => f.write_str("bool"),
            ValueRange::Int => f.write_str("int"),
            ValueRange::Real => f.write_str("real"),
            ValueRange::Enum(t) => write!(f, "{}", t),
        }
    }
}
