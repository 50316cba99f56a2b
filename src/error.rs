//! Centralized error handling for Nestcode.
//!
//! Every failure in the crate is surfaced as a [`NestcodeError`] through the
//! [`Result`] alias. Nothing is retried, coerced or logged internally: the caller
//! decides whether to abort or skip.
//!
//! ## Error Categories
//!
//! - **Codec errors** raised by the encoder and decoder:
//!   [`NestcodeError::UnsupportedType`], [`NestcodeError::UnknownTypeTag`],
//!   [`NestcodeError::InvalidKey`], [`NestcodeError::DepthLimit`].
//! - **Container errors** raised by the storage backend:
//!   [`NestcodeError::PathCollision`], [`NestcodeError::NotFound`],
//!   [`NestcodeError::ReadOnly`], [`NestcodeError::ResourceClosed`].
//! - **Low-level errors**: I/O, bincode, compression and file format violations.
//!
//! Codec and container errors always carry the canonical path of the node that
//! caused them.
//!
//! ## Usage
//!
//! ```rust
//! use nestcode::{File, NestcodeError, Value};
//!
//! let mut file = File::in_memory();
//! file.set("answer", Value::Int(42))?;
//!
//! match file.write("answer", &Value::Int(7), false) {
//!     Err(NestcodeError::PathCollision { path }) => assert_eq!(path, "answer"),
//!     other => panic!("unexpected: {other:?}"),
//! }
//! # Ok::<(), NestcodeError>(())
//! ```

use std::fmt;
use std::io;
use std::sync::Arc;

/// A specialized `Result` type for Nestcode operations.
pub type Result<T> = std::result::Result<T, NestcodeError>;

/// The master error enum covering all failure domains in Nestcode.
///
/// This type is `Clone`; I/O errors are wrapped in `Arc` to make that cheap.
#[derive(Debug, Clone)]
pub enum NestcodeError {
    /// Low-level I/O failure (file not found, permission denied, disk full, ...).
    Io(Arc<io::Error>),

    /// bincode could not encode or decode a chunk header.
    Serialization(String),

    /// Compression or decompression of a dataset payload failed.
    Compression(String),

    /// The container file or a stored node is malformed: wrong magic bytes,
    /// checksum mismatch, truncated chunk, or a payload that contradicts its tags.
    Format(String),

    /// The value at `path` is outside the closed set of encodable kinds.
    ///
    /// Raised before anything is written for the offending value.
    UnsupportedType {
        /// Canonical path of the offending value.
        path: String,
        /// Type name of the offending value.
        type_name: String,
    },

    /// A stored `original_type` (or `key_origin`) tag names no known kind.
    UnknownTypeTag {
        /// Canonical path of the node carrying the tag.
        path: String,
        /// The unrecognized tag text.
        tag: String,
    },

    /// A node already exists at `path` and no overwrite was requested.
    PathCollision {
        /// The canonical path that is already taken.
        path: String,
    },

    /// Nothing is stored at `path`.
    NotFound {
        /// The canonical path that was looked up.
        path: String,
    },

    /// A lazy reference was used after its container was closed, or after the
    /// dataset it points to was deleted or overwritten.
    ResourceClosed {
        /// Path of the dataset the reference was created for.
        path: String,
    },

    /// A mutation was attempted on a container opened in read-only mode.
    ReadOnly {
        /// The path that was about to be mutated.
        path: String,
    },

    /// A mapping key cannot be used as a path segment.
    InvalidKey {
        /// Canonical path of the mapping.
        path: String,
        /// Display form of the rejected key.
        key: String,
    },

    /// Nesting exceeded the configured maximum depth.
    DepthLimit {
        /// Canonical path at which the limit was hit.
        path: String,
        /// The configured limit.
        limit: usize,
    },

    /// An argument is out of range or otherwise unusable (row index, mode string, ...).
    InvalidArgument(String),

    /// Logic error in the write scheduler. Should not occur in production.
    Internal(String),
}

impl NestcodeError {
    /// Returns the canonical node path attached to this error, if any.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::UnsupportedType { path, .. }
            | Self::UnknownTypeTag { path, .. }
            | Self::PathCollision { path }
            | Self::NotFound { path }
            | Self::ResourceClosed { path }
            | Self::ReadOnly { path }
            | Self::InvalidKey { path, .. }
            | Self::DepthLimit { path, .. } => Some(path),
            _ => None,
        }
    }
}

impl fmt::Display for NestcodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O Error: {e}"),
            Self::Serialization(s) => write!(f, "Serialization Error: {s}"),
            Self::Compression(s) => write!(f, "Compression Error: {s}"),
            Self::Format(s) => write!(f, "Format Error: {s}"),
            Self::UnsupportedType { path, type_name } => {
                write!(f, "Unsupported Type: {type_name} at '{path}'")
            }
            Self::UnknownTypeTag { path, tag } => {
                write!(f, "Unknown Type Tag: '{tag}' at '{path}'")
            }
            Self::PathCollision { path } => write!(f, "Path Collision: '{path}' already exists"),
            Self::NotFound { path } => write!(f, "Not Found: '{path}'"),
            Self::ResourceClosed { path } => {
                write!(f, "Resource Closed: '{path}' is no longer backed by an open container")
            }
            Self::ReadOnly { path } => write!(f, "Read Only: cannot modify '{path}'"),
            Self::InvalidKey { path, key } => {
                write!(f, "Invalid Key: '{key}' cannot be stored under '{path}'")
            }
            Self::DepthLimit { path, limit } => {
                write!(f, "Depth Limit: nesting deeper than {limit} at '{path}'")
            }
            Self::InvalidArgument(s) => write!(f, "Invalid Argument: {s}"),
            Self::Internal(s) => write!(f, "Internal Logic Error: {s}"),
        }
    }
}

impl std::error::Error for NestcodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for NestcodeError {
    fn from(err: io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl From<bincode::error::EncodeError> for NestcodeError {
    fn from(err: bincode::error::EncodeError) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for NestcodeError {
    fn from(err: bincode::error::DecodeError) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::convert::Infallible> for NestcodeError {
    fn from(err: std::convert::Infallible) -> Self {
        match err {}
    }
}
