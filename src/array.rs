//! N-dimensional homogeneous arrays and their stored element layout.
//!
//! Arrays are kept as `ndarray::ArrayD<T>` for every supported element type.
//! On disk an array is its elements in logical row-major order, each element in
//! little-endian byte order (`bool` as one byte, complex numbers as real part then
//! imaginary part). Fixed element widths let a lazy reader address single rows
//! without touching the rest of the payload.

use ndarray::{ArrayD, IxDyn};
use num_complex::{Complex32, Complex64};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

use crate::error::{NestcodeError, Result};

/// Element type of a stored dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DType {
    /// One byte, 0 or 1.
    Bool,
    /// Signed 8-bit integer.
    Int8,
    /// Signed 16-bit integer.
    Int16,
    /// Signed 32-bit integer.
    Int32,
    /// Signed 64-bit integer.
    Int64,
    /// Unsigned 8-bit integer.
    UInt8,
    /// Unsigned 16-bit integer.
    UInt16,
    /// Unsigned 32-bit integer.
    UInt32,
    /// Unsigned 64-bit integer.
    UInt64,
    /// IEEE 754 single precision.
    Float32,
    /// IEEE 754 double precision.
    Float64,
    /// Pair of `Float32`.
    Complex64,
    /// Pair of `Float64`.
    Complex128,
    /// UTF-8 text. Only ever used for 0-d string datasets.
    Str,
}

impl DType {
    /// Size in bytes of one element. `Str` datasets are addressed per byte.
    pub fn size(&self) -> usize {
        match self {
            Self::Bool | Self::Int8 | Self::UInt8 | Self::Str => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 | Self::Complex64 => 8,
            Self::Complex128 => 16,
        }
    }

    /// Numeric-library style name of the element type.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
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
            Self::Complex64 => "complex64",
            Self::Complex128 => "complex128",
            Self::Str => "str",
        }
    }

    /// Returns true for element types an [`NdArray`] can hold.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, Self::Str)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fixed-width element that can live in an [`NdArray`].
pub trait Element: Copy + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Stored element type.
    const DTYPE: DType;

    /// Appends the little-endian form of `self` to `out`.
    fn write_le(&self, out: &mut Vec<u8>);

    /// Reads one element from exactly `DTYPE.size()` bytes.
    fn read_le(bytes: &[u8]) -> Self;

    /// Wraps a typed array into the type-erased [`NdArray`].
    fn wrap(array: ArrayD<Self>) -> NdArray;
}

macro_rules! impl_numeric_element {
    ($($t:ty => $dtype:ident, $n:literal);* $(;)?) => {
        $(
            impl Element for $t {
                const DTYPE: DType = DType::$dtype;

                fn write_le(&self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                fn read_le(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; $n];
                    buf.copy_from_slice(&bytes[..$n]);
                    <$t>::from_le_bytes(buf)
                }

                fn wrap(array: ArrayD<Self>) -> NdArray {
                    NdArray::$dtype(array)
                }
            }
        )*
    }
}

impl_numeric_element!(
    i8 => Int8, 1;
    i16 => Int16, 2;
    i32 => Int32, 4;
    i64 => Int64, 8;
    u8 => UInt8, 1;
    u16 => UInt16, 2;
    u32 => UInt32, 4;
    u64 => UInt64, 8;
    f32 => Float32, 4;
    f64 => Float64, 8;
);

impl Element for bool {
    const DTYPE: DType = DType::Bool;

    fn write_le(&self, out: &mut Vec<u8>) {
        out.push(u8::from(*self));
    }

    fn read_le(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }

    fn wrap(array: ArrayD<Self>) -> NdArray {
        NdArray::Bool(array)
    }
}

impl Element for Complex32 {
    const DTYPE: DType = DType::Complex64;

    fn write_le(&self, out: &mut Vec<u8>) {
        self.re.write_le(out);
        self.im.write_le(out);
    }

    fn read_le(bytes: &[u8]) -> Self {
        Complex32::new(f32::read_le(&bytes[..4]), f32::read_le(&bytes[4..8]))
    }

    fn wrap(array: ArrayD<Self>) -> NdArray {
        NdArray::Complex64(array)
    }
}

impl Element for Complex64 {
    const DTYPE: DType = DType::Complex128;

    fn write_le(&self, out: &mut Vec<u8>) {
        self.re.write_le(out);
        self.im.write_le(out);
    }

    fn read_le(bytes: &[u8]) -> Self {
        Complex64::new(f64::read_le(&bytes[..8]), f64::read_le(&bytes[8..16]))
    }

    fn wrap(array: ArrayD<Self>) -> NdArray {
        NdArray::Complex128(array)
    }
}

/// A type-erased N-dimensional homogeneous array.
///
/// Zero-dimensional arrays are valid and behave as array scalars.
#[derive(Debug, Clone, PartialEq)]
pub enum NdArray {
    /// `bool` elements.
    Bool(ArrayD<bool>),
    /// `i8` elements.
    Int8(ArrayD<i8>),
    /// `i16` elements.
    Int16(ArrayD<i16>),
    /// `i32` elements.
    Int32(ArrayD<i32>),
    /// `i64` elements.
    Int64(ArrayD<i64>),
    /// `u8` elements.
    UInt8(ArrayD<u8>),
    /// `u16` elements.
    UInt16(ArrayD<u16>),
    /// `u32` elements.
    UInt32(ArrayD<u32>),
    /// `u64` elements.
    UInt64(ArrayD<u64>),
    /// `f32` elements.
    Float32(ArrayD<f32>),
    /// `f64` elements.
    Float64(ArrayD<f64>),
    /// `Complex32` elements.
    Complex64(ArrayD<Complex32>),
    /// `Complex64` elements.
    Complex128(ArrayD<Complex64>),
}

/// Runs `$body` with `$a` bound to the typed array inside any variant.
macro_rules! dispatch {
    ($value:expr, $a:ident => $body:expr) => {
        match $value {
            NdArray::Bool($a) => $body,
            NdArray::Int8($a) => $body,
            NdArray::Int16($a) => $body,
            NdArray::Int32($a) => $body,
            NdArray::Int64($a) => $body,
            NdArray::UInt8($a) => $body,
            NdArray::UInt16($a) => $body,
            NdArray::UInt32($a) => $body,
            NdArray::UInt64($a) => $body,
            NdArray::Float32($a) => $body,
            NdArray::Float64($a) => $body,
            NdArray::Complex64($a) => $body,
            NdArray::Complex128($a) => $body,
        }
    };
}

impl NdArray {
    /// Element type.
    pub fn dtype(&self) -> DType {
        match self {
            Self::Bool(_) => DType::Bool,
            Self::Int8(_) => DType::Int8,
            Self::Int16(_) => DType::Int16,
            Self::Int32(_) => DType::Int32,
            Self::Int64(_) => DType::Int64,
            Self::UInt8(_) => DType::UInt8,
            Self::UInt16(_) => DType::UInt16,
            Self::UInt32(_) => DType::UInt32,
            Self::UInt64(_) => DType::UInt64,
            Self::Float32(_) => DType::Float32,
            Self::Float64(_) => DType::Float64,
            Self::Complex64(_) => DType::Complex64,
            Self::Complex128(_) => DType::Complex128,
        }
    }

    /// Extent of every axis.
    pub fn shape(&self) -> &[usize] {
        dispatch!(self, a => a.shape())
    }

    /// Number of axes (0 for array scalars).
    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        dispatch!(self, a => a.len())
    }

    /// Returns true if the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row-major little-endian element bytes.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len() * self.dtype().size());
        dispatch!(self, a => a.iter().for_each(|e| e.write_le(&mut out)));
        out
    }

    /// Rebuilds an array from its stored element bytes.
    pub fn from_le_bytes(dtype: DType, shape: &[usize], bytes: &[u8]) -> Result<Self> {
        match dtype {
            DType::Bool => decode::<bool>(shape, bytes),
            DType::Int8 => decode::<i8>(shape, bytes),
            DType::Int16 => decode::<i16>(shape, bytes),
            DType::Int32 => decode::<i32>(shape, bytes),
            DType::Int64 => decode::<i64>(shape, bytes),
            DType::UInt8 => decode::<u8>(shape, bytes),
            DType::UInt16 => decode::<u16>(shape, bytes),
            DType::UInt32 => decode::<u32>(shape, bytes),
            DType::UInt64 => decode::<u64>(shape, bytes),
            DType::Float32 => decode::<f32>(shape, bytes),
            DType::Float64 => decode::<f64>(shape, bytes),
            DType::Complex64 => decode::<Complex32>(shape, bytes),
            DType::Complex128 => decode::<Complex64>(shape, bytes),
            DType::Str => Err(NestcodeError::Format(
                "string payloads cannot be decoded as arrays".into(),
            )),
        }
    }
}

impl<T: Element> From<ArrayD<T>> for NdArray {
    fn from(array: ArrayD<T>) -> Self {
        T::wrap(array)
    }
}

fn decode<T: Element>(shape: &[usize], bytes: &[u8]) -> Result<NdArray> {
    let size = T::DTYPE.size();
    let expected = byte_len(T::DTYPE, shape).ok_or_else(|| {
        NestcodeError::Format(format!("{} payload of shape {shape:?} is too large", T::DTYPE))
    })?;
    if bytes.len() != expected {
        return Err(NestcodeError::Format(format!(
            "{} payload of shape {shape:?} needs {expected} bytes, found {}",
            T::DTYPE,
            bytes.len()
        )));
    }
    let elements: Vec<T> = bytes.chunks_exact(size).map(T::read_le).collect();
    let array = ArrayD::from_shape_vec(IxDyn(shape), elements)
        .map_err(|e| NestcodeError::Format(e.to_string()))?;
    Ok(T::wrap(array))
}

/// Number of elements of an array of `shape`, or `None` if it overflows `usize`.
pub(crate) fn element_count(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |n, &d| n.checked_mul(d))
}

/// Byte length of a `dtype` payload of `shape`, or `None` on overflow.
pub(crate) fn byte_len(dtype: DType, shape: &[usize]) -> Option<usize> {
    element_count(shape)?.checked_mul(dtype.size())
}

/// The single-row range at `index`, validated against the first axis of `shape`.
pub(crate) fn row_range(shape: &[usize], index: usize) -> Result<Range<usize>> {
    let end = index.checked_add(1).ok_or_else(|| {
        NestcodeError::InvalidArgument(format!("row {index} out of bounds"))
    })?;
    check_row_range(shape, index..end)?;
    Ok(index..end)
}

/// Validates a row range against the first axis of `shape`.
pub(crate) fn check_row_range(shape: &[usize], range: Range<usize>) -> Result<()> {
    let rows = match shape.first() {
        Some(rows) => *rows,
        None => {
            return Err(NestcodeError::InvalidArgument(
                "cannot index a zero-dimensional array".into(),
            ));
        }
    };
    if range.start > range.end || range.end > rows {
        return Err(NestcodeError::InvalidArgument(format!(
            "rows {}..{} out of bounds for axis of length {rows}",
            range.start, range.end
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn, arr2};

    #[test]
    fn element_bytes_are_little_endian_row_major() {
        let a = NdArray::from(arr2(&[[1u16, 2], [3, 0x0102]]).into_dyn());
        assert_eq!(a.to_le_bytes(), vec![1, 0, 2, 0, 3, 0, 2, 1]);
    }

    #[test]
    fn decode_rejects_wrong_length() {
        let err = NdArray::from_le_bytes(DType::Int32, &[2, 2], &[0u8; 15]).unwrap_err();
        assert!(matches!(err, NestcodeError::Format(_)));
    }

    #[test]
    fn complex_round_trips_through_bytes() {
        let data = vec![Complex64::new(1.5, -2.0), Complex64::new(0.0, 3.25)];
        let a = NdArray::from(ArrayD::from_shape_vec(IxDyn(&[2]), data).unwrap());
        let back = NdArray::from_le_bytes(DType::Complex128, &[2], &a.to_le_bytes()).unwrap();
        assert_eq!(a, back);
    }

    #[test]
    fn zero_dimensional_array_has_one_element() {
        let a = NdArray::from(ArrayD::from_elem(IxDyn(&[]), 7i64));
        assert_eq!(a.ndim(), 0);
        assert_eq!(a.len(), 1);
        assert!(row_range(a.shape(), 0).is_err());
    }

    #[test]
    fn row_ranges_reject_overflowing_indices() {
        assert_eq!(row_range(&[3, 2], 2).unwrap(), 2..3);
        assert!(matches!(row_range(&[3, 2], 3), Err(NestcodeError::InvalidArgument(_))));
        assert!(matches!(
            row_range(&[3, 2], usize::MAX),
            Err(NestcodeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn oversized_shapes_are_reported_not_overflowed() {
        let huge = [usize::MAX / 2, 4];
        assert_eq!(element_count(&huge), None);
        assert_eq!(byte_len(DType::Int8, &[usize::MAX]), Some(usize::MAX));
        assert_eq!(byte_len(DType::Int16, &[usize::MAX]), None);
        assert!(matches!(
            NdArray::from_le_bytes(DType::Float64, &huge, &[]),
            Err(NestcodeError::Format(_))
        ));
    }
}
