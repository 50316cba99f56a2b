//! The closed in-memory value model.
//!
//! A [`Value`] is either an atomic leaf (scalar, string, N-d array), a composite
//! (mapping, list, tuple) whose elements are again values, or one of the
//! non-encodable variants produced only by the decoder.

use num_complex::{Complex32, Complex64};
use std::fmt;

use crate::array::NdArray;
use crate::store::LazyArray;

/// A nested value that can be written to and read back from a container.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The absent value. Never encodable.
    None,
    /// Native boolean.
    Bool(bool),
    /// Native integer.
    Int(i64),
    /// Native float.
    Float(f64),
    /// Text.
    Str(String),
    /// Fixed-width signed 8-bit scalar.
    Int8(i8),
    /// Fixed-width signed 16-bit scalar.
    Int16(i16),
    /// Fixed-width signed 32-bit scalar.
    Int32(i32),
    /// Fixed-width signed 64-bit scalar.
    Int64(i64),
    /// Fixed-width unsigned 8-bit scalar.
    UInt8(u8),
    /// Fixed-width unsigned 16-bit scalar.
    UInt16(u16),
    /// Fixed-width unsigned 32-bit scalar.
    UInt32(u32),
    /// Fixed-width unsigned 64-bit scalar.
    UInt64(u64),
    /// Single precision scalar.
    Float32(f32),
    /// Double precision scalar.
    Float64(f64),
    /// Array-library boolean scalar, kept distinct from [`Value::Bool`].
    NpBool(bool),
    /// Complex scalar of two `f32`.
    Complex64(Complex32),
    /// Complex scalar of two `f64`.
    Complex128(Complex64),
    /// N-dimensional homogeneous array.
    Array(NdArray),
    /// Insertion-ordered mapping.
    Dict(Dict),
    /// Mutable sequence.
    List(Vec<Value>),
    /// Immutable sequence.
    Tuple(Box<[Value]>),
    /// Deferred reference to a stored array. Produced by lazy reads only.
    Lazy(LazyArray),
    /// Untagged group passed through unchanged. Produced by reads only.
    Group(GroupRef),
}

impl Value {
    /// Builds a tuple from any sequence of values.
    pub fn tuple<I: IntoIterator<Item = Value>>(items: I) -> Self {
        Self::Tuple(items.into_iter().collect())
    }

    /// Builds a list from any sequence of values.
    pub fn list<I: IntoIterator<Item = Value>>(items: I) -> Self {
        Self::List(items.into_iter().collect())
    }

    /// Name of the value's kind; also the text of its `original_type` tag.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "NoneType",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Int8(_) => "int8",
            Self::Int16(_) => "int16",
            Self::Int32(_) => "int32",
            Self::Int64(_) => "int64",
            Self::UInt8(_) => "uint8",
            Self::UInt16(_) => "uint16",
            Self::UInt32(_) => "uint32",
            Self::UInt64(_) => "uint64",
            Self::Float32(_) => "float32",
            Self::Float64(_) => "float64",
            Self::NpBool(_) => "bool_",
            Self::Complex64(_) => "complex64",
            Self::Complex128(_) => "complex128",
            Self::Array(_) => "ndarray",
            Self::Dict(_) => "dict",
            Self::List(_) => "list",
            Self::Tuple(_) => "tuple",
            Self::Lazy(_) => "LazyArray",
            Self::Group(_) => "GroupRef",
        }
    }

    /// Returns true for scalar variants usable as mapping keys.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Self::Bool(_)
                | Self::Int(_)
                | Self::Float(_)
                | Self::Str(_)
                | Self::Int8(_)
                | Self::Int16(_)
                | Self::Int32(_)
                | Self::Int64(_)
                | Self::UInt8(_)
                | Self::UInt16(_)
                | Self::UInt32(_)
                | Self::UInt64(_)
                | Self::Float32(_)
                | Self::Float64(_)
                | Self::NpBool(_)
                | Self::Complex64(_)
                | Self::Complex128(_)
        )
    }

    /// Borrows the mapping if this is a `Dict`.
    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Self::Dict(d) => Some(d),
            _ => None,
        }
    }

    /// Borrows the elements if this is a `List` or a `Tuple`.
    pub fn as_slice(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            Self::Tuple(items) => Some(items),
            _ => None,
        }
    }

    /// Borrows the array if this is an eagerly loaded `Array`.
    pub fn as_array(&self) -> Option<&NdArray> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Borrows the lazy reference if this is a `Lazy` value.
    pub fn as_lazy(&self) -> Option<&LazyArray> {
        match self {
            Self::Lazy(l) => Some(l),
            _ => None,
        }
    }

    /// Mapping lookup by key; `None` for non-mappings.
    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.as_dict().and_then(|d| d.get(key))
    }

    /// Sequence lookup by position; `None` for non-sequences.
    pub fn at(&self, index: usize) -> Option<&Value> {
        self.as_slice().and_then(|s| s.get(index))
    }
}

/// Displays scalars the way their key text is stored: booleans as `True`/`False`,
/// floats always with a fractional part. Composites use a compact literal form.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bool(b) | Self::NpBool(b) => f.write_str(if *b { "True" } else { "False" }),
            Self::Int(v) | Self::Int64(v) => write!(f, "{v}"),
            Self::Int8(v) => write!(f, "{v}"),
            Self::Int16(v) => write!(f, "{v}"),
            Self::Int32(v) => write!(f, "{v}"),
            Self::UInt8(v) => write!(f, "{v}"),
            Self::UInt16(v) => write!(f, "{v}"),
            Self::UInt32(v) => write!(f, "{v}"),
            Self::UInt64(v) => write!(f, "{v}"),
            Self::Float(v) | Self::Float64(v) => write!(f, "{v:?}"),
            Self::Float32(v) => write!(f, "{v:?}"),
            Self::Complex64(c) => write!(f, "{c}"),
            Self::Complex128(c) => write!(f, "{c}"),
            Self::Str(s) => f.write_str(s),
            Self::Array(a) => write!(f, "ndarray(shape={:?}, dtype={})", a.shape(), a.dtype()),
            Self::Lazy(l) => write!(f, "<dataset '{}' shape={:?} dtype={}>", l.path(), l.shape(), l.dtype()),
            Self::Group(g) => write!(f, "<group '{}'>", g.path()),
            Self::Dict(d) => {
                f.write_str("{")?;
                for (i, (k, v)) in d.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
            Self::List(items) => write_seq(f, items, "[", "]"),
            Self::Tuple(items) => write_seq(f, items, "(", ")"),
        }
    }
}

fn write_seq(f: &mut fmt::Formatter<'_>, items: &[Value], open: &str, close: &str) -> fmt::Result {
    f.write_str(open)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    f.write_str(close)
}

macro_rules! impl_from_scalar {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    }
}

impl_from_scalar!(
    bool => Bool,
    i64 => Int,
    f64 => Float,
    String => Str,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float32,
    Complex32 => Complex64,
    Complex64 => Complex128,
    NdArray => Array,
    Dict => Dict,
    Vec<Value> => List,
);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}

impl<T: crate::array::Element> From<ndarray::ArrayD<T>> for Value {
    fn from(array: ndarray::ArrayD<T>) -> Self {
        Self::Array(NdArray::from(array))
    }
}

/// An insertion-ordered mapping with arbitrary scalar keys.
///
/// Keys compare by value, so `Int(1)` and `Str("1")` are distinct keys. Inserting an
/// existing key replaces its value and keeps its position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dict {
    entries: Vec<(Value, Value)>,
}

impl Dict {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces; returns the previous value for `key`.
    pub fn insert(&mut self, key: impl Into<Value>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Looks up a key.
    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(k, _)| k)
    }
}

impl<K: Into<Value>, V: Into<Value>> FromIterator<(K, V)> for Dict {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut dict = Dict::new();
        for (k, v) in iter {
            dict.insert(k, v);
        }
        dict
    }
}

impl IntoIterator for Dict {
    type Item = (Value, Value);
    type IntoIter = std::vec::IntoIter<(Value, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// A group node read back without tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRef {
    path: String,
    children: Vec<String>,
}

impl GroupRef {
    pub(crate) fn new(path: String, children: Vec<String>) -> Self {
        Self { path, children }
    }

    /// Canonical path of the group.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Child names in stored order.
    pub fn children(&self) -> &[String] {
        &self.children
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dict_keeps_insertion_order_and_replaces_in_place() {
        let mut d = Dict::new();
        d.insert("b", 1i64);
        d.insert(10i64, "x");
        d.insert("a", 2i64);
        assert_eq!(d.insert("b", 3i64), Some(Value::Int(1)));
        let keys: Vec<String> = d.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, ["b", "10", "a"]);
        assert_eq!(d.get(&Value::from("b")), Some(&Value::Int(3)));
        assert_eq!(d.get(&Value::from("10")), None);
    }

    #[test]
    fn scalar_display_matches_stored_key_text() {
        assert_eq!(Value::Bool(true).to_string(), "True");
        assert_eq!(Value::Float(1.0).to_string(), "1.0");
        assert_eq!(Value::Float(22.2).to_string(), "22.2");
        assert_eq!(Value::UInt8(7).to_string(), "7");
    }
}
