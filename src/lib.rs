//! # Nestcode
//!
//! Lossless storage of nested in-memory values in a hierarchical, self-describing
//! container, with lazy access to large arrays.
//!
//! ## Overview
//!
//! A [`Value`] is either atomic (booleans, integers and floats of the usual widths,
//! complex numbers, strings, N-dimensional arrays) or composite (insertion-ordered
//! mappings, lists, tuples). Writing a value maps it onto a tree of **groups** and
//! **datasets**:
//!
//! *   Every atomic value becomes one dataset.
//! *   Every composite becomes one group with a child per element. Mapping children
//!     are named by the text of their key, sequence children by their index.
//! *   Every node is tagged with `original_type` (the kind that produced it) and
//!     `key_origin` (the kind of key that addressed it).
//!
//! Reading inverts the mapping from the tags alone: mapping keys get their original
//! type back, sequences are re-ordered by numeric index, tuples stay tuples. Arrays
//! can be returned as [`LazyArray`] references that only read the rows they are
//! asked for.
//!
//! ## Architecture
//!
//! ```text
//! File::write ─► encoder ─► Backend (store::Container) ─► flush ─► graph + executor ─► disk
//! File::read  ◄─ decoder ◄─ Backend ◄─ reader (memory-mapped, payloads left on disk)
//! ```
//!
//! The codec only talks to storage through the [`Backend`] trait. [`Container`] is
//! the bundled implementation: it keeps group and dataset metadata in memory and
//! writes the whole tree bottom-up on flush, compressing payloads in parallel on
//! Rayon workers.
//!
//! ### File Format
//!
//! ```text
//! [Leaf Chunk] [Leaf Chunk] ... [Group Chunk] [Root Chunk] [Global Header]
//! ```
//!
//! Each chunk is `[Header] [Body] [Children Table (groups)] [HeaderLen] [MetaByte]`.
//! See [`format`] for details.
//!
//! ## Usage
//!
//! ```rust
//! use nestcode::{Dict, File, Value};
//! use ndarray::ArrayD;
//!
//! let mut file = File::in_memory();
//!
//! let mut dict = Dict::new();
//! dict.insert("name", "sensor");
//! dict.insert(10i64, Value::tuple([Value::Int(1), Value::Float(2.0)]));
//! dict.insert("data", ArrayD::<f64>::zeros(ndarray::IxDyn(&[100, 3])));
//! file.write("run", &Value::Dict(dict.clone()), false)?;
//!
//! // Lazy: the array comes back as a reference.
//! let run = file.get("run")?;
//! let data = run.get(&Value::from("data")).and_then(Value::as_lazy).unwrap();
//! assert_eq!(data.get(42)?.shape(), &[3]);
//!
//! // Eager: everything is materialized and equal to the input.
//! let (eager, _) = file.read("run", false)?;
//! assert_eq!(eager, Value::Dict(dict));
//! # Ok::<(), nestcode::NestcodeError>(())
//! ```
//!
//! ### Safety and Error Handling
//!
//! * **Encapsulated Unsafe:** the only `unsafe` block maps container files in
//!   [`reader`].
//! * **No Panics:** no `unwrap()` or `panic!()` in the library (enforced by clippy
//!   lints).
//! * **All-or-nothing writes:** values are validated before anything is written.
//! * **Comprehensive Errors:** every failure is a [`NestcodeError`] carrying the
//!   offending path.

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::panic))]

// --- PUBLIC API MODULES ---
pub mod api;
pub mod array;
pub mod compression;
pub mod error;
pub mod file;
pub mod format;
pub mod inspector;
pub mod kind;
pub mod path;
pub mod reader;
pub mod store;
pub mod value;

// --- INTERNAL IMPLEMENTATION MODULES (Hidden from Docs) ---
#[doc(hidden)]
pub mod executor;
#[doc(hidden)]
pub mod graph;
#[doc(hidden)]
pub mod io;

// Private modules
mod decoder;
mod encoder;
mod visitor;

// --- RE-EXPORTS ---

#[cfg(feature = "lz4_flex")]
pub use compression::Lz4Compressor;
pub use compression::{Compressor, NoCompression};

pub use api::{FileBuilder, FileOptions, Nestcode};
pub use array::{DType, NdArray};
pub use constants::{KEY_ORIGIN_ATTR, ORIGINAL_TYPE_ATTR};
pub use error::{NestcodeError, Result};
pub use file::File;
pub use inspector::Inspector;
pub use kind::{AtomicKind, CompositeKind, Kind, TypeTag, classify};
pub use path::{NodePath, Segment};
pub use store::{AttrValue, Backend, Container, LazyArray, Mode, NodeKind, Payload, StorageOptions};
pub use value::{Dict, GroupRef, Value};

/// Constants used throughout the library.
pub mod constants {
    /// Attribute naming the kind a node was written from.
    pub const ORIGINAL_TYPE_ATTR: &str = "original_type";
    /// Attribute naming the kind of key that addressed a node.
    pub const KEY_ORIGIN_ATTR: &str = "key_origin";
    /// Default composite nesting limit for reads and writes.
    pub const DEFAULT_MAX_DEPTH: usize = 64;
}
