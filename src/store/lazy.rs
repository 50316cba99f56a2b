use std::fmt;
use std::ops::Range;
use std::sync::{Arc, Weak};

use super::Payload;
use super::tree::Blob;
use crate::array::{DType, NdArray, byte_len, check_row_range, row_range};
use crate::compression::CompressorRegistry;
use crate::error::{NestcodeError, Result};

/// A deferred reference to a stored dataset.
///
/// Holds the dataset's path, element type and shape, but no element data. Use
/// `.load()` to materialize the whole array, or `.get(i)` / `.slice(range)` to read
/// rows along the first axis.
///
/// The reference is only valid while the dataset it points at is alive: once the
/// container is closed, or the dataset is deleted or overwritten, every access
/// fails with `ResourceClosed`.
#[derive(Clone)]
pub struct LazyArray {
    path: String,
    dtype: DType,
    shape: Vec<usize>,
    blob: Weak<Blob>,
}

impl LazyArray {
    pub(crate) fn new(path: String, dtype: DType, shape: Vec<usize>, blob: &Arc<Blob>) -> Self {
        Self {
            path,
            dtype,
            shape,
            blob: Arc::downgrade(blob),
        }
    }

    /// Canonical path of the dataset.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Element type.
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Extent of every axis.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of axes.
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Length of the first axis (0 for zero-dimensional data).
    pub fn len(&self) -> usize {
        self.shape.first().copied().unwrap_or(0)
    }

    /// Returns true if the first axis is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true while the underlying dataset is still reachable.
    pub fn is_open(&self) -> bool {
        self.blob.strong_count() > 0
    }

    fn blob(&self) -> Result<Arc<Blob>> {
        self.blob.upgrade().ok_or_else(|| NestcodeError::ResourceClosed {
            path: self.path.clone(),
        })
    }

    /// Reads the raw payload, including string payloads.
    pub fn load_payload(&self) -> Result<Payload> {
        let blob = self.blob()?;
        let bytes = blob.read_all(CompressorRegistry::global())?.into_owned();
        Ok(Payload {
            dtype: self.dtype,
            shape: self.shape.clone(),
            bytes,
        })
    }

    /// Loads the entire array into memory.
    pub fn load(&self) -> Result<NdArray> {
        self.load_payload()?.to_array()
    }

    /// Row `index` along the first axis. Reads only that row when the payload is
    /// stored uncompressed.
    pub fn get(&self, index: usize) -> Result<NdArray> {
        let bytes = self.read_rows(row_range(&self.shape, index)?)?;
        NdArray::from_le_bytes(self.dtype, self.shape.get(1..).unwrap_or(&[]), &bytes)
    }

    /// Rows `range` along the first axis.
    pub fn slice(&self, range: Range<usize>) -> Result<NdArray> {
        check_row_range(&self.shape, range.clone())?;
        let bytes = self.read_rows(range.clone())?;
        let mut shape = self.shape.clone();
        shape[0] = range.len();
        NdArray::from_le_bytes(self.dtype, &shape, &bytes)
    }

    /// Streams rows along the first axis one at a time.
    pub fn iter(&self) -> impl Iterator<Item = Result<NdArray>> + '_ {
        (0..self.len()).map(move |i| self.get(i))
    }

    fn read_rows(&self, rows: Range<usize>) -> Result<Vec<u8>> {
        if !self.dtype.is_numeric() {
            return Err(NestcodeError::Format(format!(
                "dataset '{}' holds a string, not an array",
                self.path
            )));
        }
        let too_large = || NestcodeError::Format(format!("dataset '{}' is too large", self.path));
        let row_bytes =
            byte_len(self.dtype, self.shape.get(1..).unwrap_or(&[])).ok_or_else(too_large)?;
        let start = rows.start.checked_mul(row_bytes).ok_or_else(too_large)?;
        let end = rows.end.checked_mul(row_bytes).ok_or_else(too_large)?;
        self.blob()?.read_range(start..end, CompressorRegistry::global())
    }
}

impl PartialEq for LazyArray {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
            && self.dtype == other.dtype
            && self.shape == other.shape
            && Weak::ptr_eq(&self.blob, &other.blob)
    }
}

impl fmt::Debug for LazyArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyArray")
            .field("path", &self.path)
            .field("dtype", &self.dtype)
            .field("shape", &self.shape)
            .field("open", &self.is_open())
            .finish()
    }
}
