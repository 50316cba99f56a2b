//! Closed-set type classification.
//!
//! Every value is mapped to exactly one [`Kind`]. The recognized kinds are listed in
//! fixed order in [`AtomicKind::ALL`] and [`CompositeKind::ALL`]; tag lookups scan
//! those lists and the first name that matches wins. Extending the supported set
//! means adding a variant and its table entry.

use num_complex::{Complex32, Complex64};
use std::fmt;
use std::str::FromStr;

use crate::array::DType;
use crate::error::{NestcodeError, Result};
use crate::value::Value;

/// Leaf kinds: stored as a single dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomicKind {
    /// `int`
    Int,
    /// `float`
    Float,
    /// `bool`
    Bool,
    /// `str`
    Str,
    /// `int8`
    Int8,
    /// `int16`
    Int16,
    /// `int32`
    Int32,
    /// `int64`
    Int64,
    /// `uint8`
    UInt8,
    /// `uint16`
    UInt16,
    /// `uint32`
    UInt32,
    /// `uint64`
    UInt64,
    /// `float32`
    Float32,
    /// `float64`
    Float64,
    /// `bool_`
    NpBool,
    /// `complex64`
    Complex64,
    /// `complex128`
    Complex128,
    /// `ndarray`
    NdArray,
}

impl AtomicKind {
    /// Recognized atomic kinds in lookup order.
    pub const ALL: [AtomicKind; 18] = [
        Self::Int,
        Self::Float,
        Self::Bool,
        Self::Str,
        Self::Int8,
        Self::Int16,
        Self::Int32,
        Self::Int64,
        Self::UInt8,
        Self::UInt16,
        Self::UInt32,
        Self::UInt64,
        Self::Float32,
        Self::Float64,
        Self::NpBool,
        Self::Complex64,
        Self::Complex128,
        Self::NdArray,
    ];

    /// Tag text.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Str => "str",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::NpBool => "bool_",
            Self::Complex64 => "complex64",
            Self::Complex128 => "complex128",
            Self::NdArray => "ndarray",
        }
    }

    /// Finds the kind whose tag text is `name`.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// The dataset element type a scalar of this kind is stored with.
    ///
    /// `None` for [`AtomicKind::NdArray`], which keeps the array's own dtype.
    pub fn scalar_dtype(&self) -> Option<DType> {
        Some(match self {
            Self::Int | Self::Int64 => DType::Int64,
            Self::Float | Self::Float64 => DType::Float64,
            Self::Bool | Self::NpBool => DType::Bool,
            Self::Str => DType::Str,
            Self::Int8 => DType::Int8,
            Self::Int16 => DType::Int16,
            Self::Int32 => DType::Int32,
            Self::UInt8 => DType::UInt8,
            Self::UInt16 => DType::UInt16,
            Self::UInt32 => DType::UInt32,
            Self::UInt64 => DType::UInt64,
            Self::Float32 => DType::Float32,
            Self::Complex64 => DType::Complex64,
            Self::Complex128 => DType::Complex128,
            Self::NdArray => return None,
        })
    }

    /// Reconstructs a mapping key of this kind from its stored text.
    pub fn parse_key(&self, text: &str) -> Result<Value> {
        let bad = || {
            NestcodeError::Format(format!("key '{text}' is not a valid {}", self.name()))
        };
        Ok(match self {
            Self::Str => Value::Str(text.to_owned()),
            Self::Int => Value::Int(parse(text).ok_or_else(bad)?),
            Self::Float => Value::Float(parse(text).ok_or_else(bad)?),
            Self::Bool => Value::Bool(parse_bool(text).ok_or_else(bad)?),
            Self::Int8 => Value::Int8(parse(text).ok_or_else(bad)?),
            Self::Int16 => Value::Int16(parse(text).ok_or_else(bad)?),
            Self::Int32 => Value::Int32(parse(text).ok_or_else(bad)?),
            Self::Int64 => Value::Int64(parse(text).ok_or_else(bad)?),
            Self::UInt8 => Value::UInt8(parse(text).ok_or_else(bad)?),
            Self::UInt16 => Value::UInt16(parse(text).ok_or_else(bad)?),
            Self::UInt32 => Value::UInt32(parse(text).ok_or_else(bad)?),
            Self::UInt64 => Value::UInt64(parse(text).ok_or_else(bad)?),
            Self::Float32 => Value::Float32(parse(text).ok_or_else(bad)?),
            Self::Float64 => Value::Float64(parse(text).ok_or_else(bad)?),
            Self::NpBool => Value::NpBool(parse_bool(text).ok_or_else(bad)?),
            Self::Complex64 => Value::Complex64(parse::<Complex32>(text).ok_or_else(bad)?),
            Self::Complex128 => Value::Complex128(parse::<Complex64>(text).ok_or_else(bad)?),
            Self::NdArray => {
                return Err(NestcodeError::Format(format!(
                    "key '{text}' claims to be an ndarray"
                )));
            }
        })
    }
}

fn parse<T: FromStr>(text: &str) -> Option<T> {
    text.parse().ok()
}

fn parse_bool(text: &str) -> Option<bool> {
    match text {
        "True" => Some(true),
        "False" => Some(false),
        _ => None,
    }
}

/// Container kinds: stored as a group with one child per element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompositeKind {
    /// `dict`: children named by key text.
    Dict,
    /// `list`: children named by index.
    List,
    /// `tuple`: children named by index, rebuilt immutable.
    Tuple,
}

impl CompositeKind {
    /// Recognized composite kinds in lookup order.
    pub const ALL: [CompositeKind; 3] = [Self::Dict, Self::List, Self::Tuple];

    /// Tag text.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Dict => "dict",
            Self::List => "list",
            Self::Tuple => "tuple",
        }
    }

    /// Finds the kind whose tag text is `name`.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

/// A recognized `original_type` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    /// Leaf dataset.
    Atomic(AtomicKind),
    /// Group with children.
    Composite(CompositeKind),
}

impl TypeTag {
    /// Resolves tag text, atomic kinds first.
    pub fn from_name(name: &str) -> Option<Self> {
        AtomicKind::from_name(name)
            .map(Self::Atomic)
            .or_else(|| CompositeKind::from_name(name).map(Self::Composite))
    }

    /// Tag text.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Atomic(k) => k.name(),
            Self::Composite(k) => k.name(),
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of classifying a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Written as one leaf.
    Atomic(AtomicKind),
    /// Written as a group plus one child per element.
    Composite(CompositeKind),
    /// Rejected by the encoder.
    Unsupported,
}

impl Kind {
    /// The tag this kind is stored with, if it is encodable.
    pub fn tag(&self) -> Option<TypeTag> {
        match self {
            Self::Atomic(k) => Some(TypeTag::Atomic(*k)),
            Self::Composite(k) => Some(TypeTag::Composite(*k)),
            Self::Unsupported => None,
        }
    }
}

/// Maps a value to its kind. Total over [`Value`].
pub fn classify(value: &Value) -> Kind {
    use AtomicKind as A;
    match value {
        Value::Int(_) => Kind::Atomic(A::Int),
        Value::Float(_) => Kind::Atomic(A::Float),
        Value::Bool(_) => Kind::Atomic(A::Bool),
        Value::Str(_) => Kind::Atomic(A::Str),
        Value::Int8(_) => Kind::Atomic(A::Int8),
        Value::Int16(_) => Kind::Atomic(A::Int16),
        Value::Int32(_) => Kind::Atomic(A::Int32),
        Value::Int64(_) => Kind::Atomic(A::Int64),
        Value::UInt8(_) => Kind::Atomic(A::UInt8),
        Value::UInt16(_) => Kind::Atomic(A::UInt16),
        Value::UInt32(_) => Kind::Atomic(A::UInt32),
        Value::UInt64(_) => Kind::Atomic(A::UInt64),
        Value::Float32(_) => Kind::Atomic(A::Float32),
        Value::Float64(_) => Kind::Atomic(A::Float64),
        Value::NpBool(_) => Kind::Atomic(A::NpBool),
        Value::Complex64(_) => Kind::Atomic(A::Complex64),
        Value::Complex128(_) => Kind::Atomic(A::Complex128),
        Value::Array(_) => Kind::Atomic(A::NdArray),
        Value::Dict(_) => Kind::Composite(CompositeKind::Dict),
        Value::List(_) => Kind::Composite(CompositeKind::List),
        Value::Tuple(_) => Kind::Composite(CompositeKind::Tuple),
        Value::None | Value::Lazy(_) | Value::Group(_) => Kind::Unsupported,
    }
}
