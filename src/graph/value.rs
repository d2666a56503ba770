//! Numeric value kinds stored in arc maps
//!
//! A map's value kind is fixed at creation and drawn from six numeric kinds.
//! `ValueKind` is the runtime tag, `ArcValue` the tagged value that carries a
//! single entry across dynamically-typed boundaries, and `MapValue` ties each
//! Rust primitive to its tag for the statically-typed `ArcMap<V>`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Runtime tag for the value kind of an arc map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
}

impl ValueKind {
    pub const ALL: [ValueKind; 6] = [
        ValueKind::Int32,
        ValueKind::UInt32,
        ValueKind::Int64,
        ValueKind::UInt64,
        ValueKind::Float32,
        ValueKind::Float64,
    ];

    /// Decode a numeric tag (0..=5, in declaration order)
    pub fn from_tag(tag: u32) -> Option<Self> {
        Self::ALL.get(tag as usize).copied()
    }

    pub fn tag(&self) -> u32 {
        *self as u32
    }

    pub fn is_integer(&self) -> bool {
        !matches!(self, ValueKind::Float32 | ValueKind::Float64)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Int32 => "int32",
            ValueKind::UInt32 => "uint32",
            ValueKind::Int64 => "int64",
            ValueKind::UInt64 => "uint64",
            ValueKind::Float32 => "float32",
            ValueKind::Float64 => "float64",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single arc-map entry tagged with its kind
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ArcValue {
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
}

impl ArcValue {
    /// Zero value of a kind (the default for freshly covered arcs)
    pub fn zero(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Int32 => ArcValue::Int32(0),
            ValueKind::UInt32 => ArcValue::UInt32(0),
            ValueKind::Int64 => ArcValue::Int64(0),
            ValueKind::UInt64 => ArcValue::UInt64(0),
            ValueKind::Float32 => ArcValue::Float32(0.0),
            ValueKind::Float64 => ArcValue::Float64(0.0),
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            ArcValue::Int32(_) => ValueKind::Int32,
            ArcValue::UInt32(_) => ValueKind::UInt32,
            ArcValue::Int64(_) => ValueKind::Int64,
            ArcValue::UInt64(_) => ValueKind::UInt64,
            ArcValue::Float32(_) => ValueKind::Float32,
            ArcValue::Float64(_) => ValueKind::Float64,
        }
    }

    /// Integer value if this is an integer kind that fits in `i64`
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            ArcValue::Int32(v) => Some(v as i64),
            ArcValue::UInt32(v) => Some(v as i64),
            ArcValue::Int64(v) => Some(v),
            ArcValue::UInt64(v) => i64::try_from(v).ok(),
            ArcValue::Float32(_) | ArcValue::Float64(_) => None,
        }
    }

    /// Value widened to `f64` (may round for large 64-bit integers)
    pub fn as_f64(&self) -> f64 {
        match *self {
            ArcValue::Int32(v) => v as f64,
            ArcValue::UInt32(v) => v as f64,
            ArcValue::Int64(v) => v as f64,
            ArcValue::UInt64(v) => v as f64,
            ArcValue::Float32(v) => v as f64,
            ArcValue::Float64(v) => v,
        }
    }
}

impl fmt::Display for ArcValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArcValue::Int32(v) => write!(f, "{}", v),
            ArcValue::UInt32(v) => write!(f, "{}", v),
            ArcValue::Int64(v) => write!(f, "{}", v),
            ArcValue::UInt64(v) => write!(f, "{}", v),
            ArcValue::Float32(v) => write!(f, "{}", v),
            ArcValue::Float64(v) => write!(f, "{}", v),
        }
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Primitive types an `ArcMap` can hold
pub trait MapValue:
    sealed::Sealed + Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static
{
    const KIND: ValueKind;

    fn into_value(self) -> ArcValue;

    fn from_value(value: ArcValue) -> Option<Self>;
}

macro_rules! map_value {
    ($ty:ty, $variant:ident) => {
        impl sealed::Sealed for $ty {}

        impl MapValue for $ty {
            const KIND: ValueKind = ValueKind::$variant;

            fn into_value(self) -> ArcValue {
                ArcValue::$variant(self)
            }

            fn from_value(value: ArcValue) -> Option<Self> {
                match value {
                    ArcValue::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }

        impl From<$ty> for ArcValue {
            fn from(v: $ty) -> Self {
                ArcValue::$variant(v)
            }
        }
    };
}

map_value!(i32, Int32);
map_value!(u32, UInt32);
map_value!(i64, Int64);
map_value!(u64, UInt64);
map_value!(f32, Float32);
map_value!(f64, Float64);
