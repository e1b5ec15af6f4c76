//! Scalar value types carried by the bus.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Semantic type of a bus entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Float,
    Int,
    Bool,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Float => "float",
            ValueKind::Int => "int",
            ValueKind::Bool => "bool",
        };
        f.write_str(name)
    }
}

/// Scalar bus value.
///
/// Deserializes untagged so configuration can write `true`, `3` or `2.5`
/// directly; integers land in `Int` and are coerced to `Float` on registration
/// where the entry is a float (see [`BusValue::coerce_to`]).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BusValue {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl BusValue {
    /// Semantic kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            BusValue::Float(_) => ValueKind::Float,
            BusValue::Int(_) => ValueKind::Int,
            BusValue::Bool(_) => ValueKind::Bool,
        }
    }

    /// Numeric view: booleans read as 0.0 / 1.0.
    pub fn as_f64(&self) -> f64 {
        match *self {
            BusValue::Float(v) => v,
            BusValue::Int(v) => v as f64,
            BusValue::Bool(v) => {
                if v {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Truth view: non-zero numbers are true.
    pub fn as_bool(&self) -> bool {
        match *self {
            BusValue::Float(v) => v != 0.0,
            BusValue::Int(v) => v != 0,
            BusValue::Bool(v) => v,
        }
    }

    /// Zero value of a given kind.
    pub fn zero(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Float => BusValue::Float(0.0),
            ValueKind::Int => BusValue::Int(0),
            ValueKind::Bool => BusValue::Bool(false),
        }
    }

    /// Lossless conversion to another kind, if one exists.
    ///
    /// Integers widen to floats; integral floats narrow to integers; 0/1
    /// integers become booleans. Anything else returns `None`.
    pub fn coerce_to(self, kind: ValueKind) -> Option<BusValue> {
        match (self, kind) {
            (v, k) if v.kind() == k => Some(v),
            (BusValue::Int(v), ValueKind::Float) => Some(BusValue::Float(v as f64)),
            (BusValue::Float(v), ValueKind::Int) if v.fract() == 0.0 && v.is_finite() => {
                Some(BusValue::Int(v as i64))
            }
            (BusValue::Int(0), ValueKind::Bool) => Some(BusValue::Bool(false)),
            (BusValue::Int(1), ValueKind::Bool) => Some(BusValue::Bool(true)),
            _ => None,
        }
    }

    /// Build a value of `kind` from a numeric result (script actions, ramps).
    pub fn from_f64(kind: ValueKind, v: f64) -> Self {
        match kind {
            ValueKind::Float => BusValue::Float(v),
            ValueKind::Int => BusValue::Int(v.round() as i64),
            ValueKind::Bool => BusValue::Bool(v != 0.0),
        }
    }
}

impl From<f64> for BusValue {
    fn from(value: f64) -> Self {
        BusValue::Float(value)
    }
}

impl From<i64> for BusValue {
    fn from(value: i64) -> Self {
        BusValue::Int(value)
    }
}

impl From<bool> for BusValue {
    fn from(value: bool) -> Self {
        BusValue::Bool(value)
    }
}

impl fmt::Display for BusValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusValue::Float(v) => write!(f, "{v}"),
            BusValue::Int(v) => write!(f, "{v}"),
            BusValue::Bool(v) => write!(f, "{v}"),
        }
    }
}
