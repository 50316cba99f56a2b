//! The hierarchical storage backend.
//!
//! A container is a tree of named **groups** and **datasets**. Groups hold child
//! nodes in insertion order; datasets hold one typed payload. Every node carries an
//! ordered attribute map. The codec only talks to storage through the [`Backend`]
//! trait; [`Container`] is the file- and memory-backed implementation.

mod container;
mod lazy;
pub(crate) mod tree;

pub use container::Container;
pub(crate) use container::serialize_tree;
pub use lazy::LazyArray;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::array::{DType, Element, NdArray, byte_len};
use crate::compression::preferred_compression_id;
use crate::error::{NestcodeError, Result};

/// The storage surface the encoder and decoder rely on.
///
/// Keys are canonical `/`-separated paths relative to the container root; the
/// empty key addresses the root group.
pub trait Backend {
    /// Creates an empty group. Missing intermediate groups are created too.
    ///
    /// # Errors
    /// `PathCollision` if a node already exists at `key`.
    fn create_group(&mut self, key: &str) -> Result<()>;

    /// Creates a dataset holding `data`. Missing intermediate groups are created.
    ///
    /// # Errors
    /// `PathCollision` if a node already exists at `key`.
    fn create_dataset(&mut self, key: &str, data: Payload, options: &StorageOptions) -> Result<()>;

    /// Removes the node at `key` and its whole subtree.
    fn delete(&mut self, key: &str) -> Result<()>;

    /// Copies the node at `src`, its attributes and its whole subtree to `dest`.
    /// Missing groups above `dest` are created.
    ///
    /// # Errors
    /// `NotFound` if nothing exists at `src`, `PathCollision` if a node already
    /// exists at `dest`.
    fn copy(&mut self, src: &str, dest: &str) -> Result<()>;

    /// Returns true if a node exists at `key`.
    fn exists(&self, key: &str) -> bool;

    /// Group or dataset.
    fn node_kind(&self, key: &str) -> Result<NodeKind>;

    /// Reads one attribute of the node at `key`.
    fn get_attr(&self, key: &str, name: &str) -> Result<Option<AttrValue>>;

    /// Sets one attribute of the node at `key`, keeping insertion order.
    fn set_attr(&mut self, key: &str, name: &str, value: AttrValue) -> Result<()>;

    /// Child names of the group at `key`, in insertion order.
    fn children(&self, key: &str) -> Result<Vec<String>>;

    /// A lazy reference to the dataset at `key`. No payload bytes are read.
    fn dataset(&self, key: &str) -> Result<LazyArray>;
}

/// The two kinds of stored node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeKind {
    /// Container of named children.
    Group,
    /// Leaf with a typed payload.
    Dataset,
}

/// A value stored in a node's attribute map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    /// Text.
    Str(String),
    /// Integer.
    Int(i64),
    /// Float.
    Float(f64),
    /// Boolean.
    Bool(bool),
}

impl AttrValue {
    /// Borrows the text of a `Str` attribute.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
        }
    }
}

/// A fully materialized dataset payload: element type, shape and element bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    /// Element type.
    pub dtype: DType,
    /// Extent of every axis; empty for scalars and strings.
    pub shape: Vec<usize>,
    /// Row-major little-endian element bytes, or UTF-8 text for `DType::Str`.
    pub bytes: Vec<u8>,
}

impl Payload {
    /// A zero-dimensional payload holding one element.
    pub fn scalar<T: Element>(value: T) -> Self {
        let mut bytes = Vec::with_capacity(T::DTYPE.size());
        value.write_le(&mut bytes);
        Self {
            dtype: T::DTYPE,
            shape: Vec::new(),
            bytes,
        }
    }

    /// A string payload.
    pub fn text(text: &str) -> Self {
        Self {
            dtype: DType::Str,
            shape: Vec::new(),
            bytes: text.as_bytes().to_vec(),
        }
    }

    /// The payload of an array.
    pub fn array(array: &NdArray) -> Self {
        Self {
            dtype: array.dtype(),
            shape: array.shape().to_vec(),
            bytes: array.to_le_bytes(),
        }
    }

    /// Interprets the payload as an array.
    pub fn to_array(&self) -> Result<NdArray> {
        NdArray::from_le_bytes(self.dtype, &self.shape, &self.bytes)
    }

    /// Interprets the payload as text.
    pub fn to_text(&self) -> Result<String> {
        if self.dtype != DType::Str {
            return Err(NestcodeError::Format(format!(
                "expected a string payload, found {}",
                self.dtype
            )));
        }
        String::from_utf8(self.bytes.clone())
            .map_err(|e| NestcodeError::Format(format!("string payload is not UTF-8: {e}")))
    }

    /// Checks that the byte length agrees with dtype and shape.
    pub fn validate(&self) -> Result<()> {
        if self.dtype == DType::Str {
            if !self.shape.is_empty() {
                return Err(NestcodeError::InvalidArgument(
                    "string payloads must be zero-dimensional".into(),
                ));
            }
            return Ok(());
        }
        let expected = byte_len(self.dtype, &self.shape).ok_or_else(|| {
            NestcodeError::InvalidArgument(format!(
                "{} payload of shape {:?} is too large",
                self.dtype, self.shape
            ))
        })?;
        if self.bytes.len() != expected {
            return Err(NestcodeError::InvalidArgument(format!(
                "{} payload of shape {:?} needs {expected} bytes, got {}",
                self.dtype,
                self.shape,
                self.bytes.len()
            )));
        }
        Ok(())
    }
}

/// Per-write hints passed through unchanged to the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageOptions {
    compression: bool,
}

impl StorageOptions {
    /// No compression.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables payload compression.
    pub fn compression(mut self, enabled: bool) -> Self {
        self.compression = enabled;
        self
    }

    /// The algorithm ID stored with payloads written under these options.
    pub fn compression_id(&self) -> u8 {
        if self.compression {
            preferred_compression_id()
        } else {
            0
        }
    }
}

/// How a container file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// `r`: read only, the file must exist.
    Read,
    /// `r+`: read/write, the file must exist.
    ReadWrite,
    /// `w`: create, truncating any existing file.
    Truncate,
    /// `w-` or `x`: create, failing if the file exists.
    Exclusive,
    /// `a`: read/write if the file exists, create otherwise.
    Append,
}

impl Mode {
    /// Returns true if the mode permits mutation.
    pub fn is_writable(&self) -> bool {
        !matches!(self, Self::Read)
    }

    /// Short mode string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "r",
            Self::ReadWrite => "r+",
            Self::Truncate => "w",
            Self::Exclusive => "w-",
            Self::Append => "a",
        }
    }
}

impl FromStr for Mode {
    type Err = NestcodeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "r" => Ok(Self::Read),
            "r+" => Ok(Self::ReadWrite),
            "w" => Ok(Self::Truncate),
            "w-" | "x" => Ok(Self::Exclusive),
            "a" => Ok(Self::Append),
            other => Err(NestcodeError::InvalidArgument(format!("unknown mode '{other}'"))),
        }
    }
}

impl TryFrom<&str> for Mode {
    type Error = NestcodeError;

    fn try_from(s: &str) -> Result<Self> {
        s.parse()
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
