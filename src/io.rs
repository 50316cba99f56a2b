//! Low-level sequential writing.
//!
//! Worker threads submit finished chunks here. Each chunk is appended in one
//! locked step, so chunks never interleave and every chunk learns the exact offset
//! it landed at.

use std::io::{BufWriter, Write};
use std::sync::Mutex;

use crate::error::{NestcodeError, Result};

/// A thread-safe writer that appends data and tracks the current offset.
#[derive(Debug)]
pub struct SeqWriter<W: Write> {
    inner: Mutex<WriterState<W>>,
}

#[derive(Debug)]
struct WriterState<W: Write> {
    writer: BufWriter<W>,
    current_offset: u64,
}

impl<W: Write + Send> SeqWriter<W> {
    /// Wraps a sink. Offsets start at zero.
    pub fn new(sink: W) -> Self {
        Self {
            inner: Mutex::new(WriterState {
                writer: BufWriter::new(sink),
                current_offset: 0,
            }),
        }
    }

    /// Atomically writes a complete buffer.
    /// Returns the offset where the writing started.
    pub fn write_all(&self, buffer: &[u8]) -> Result<u64> {
        let mut state = self
            .inner
            .lock()
            .map_err(|_| NestcodeError::Internal("SeqWriter Mutex poisoned".into()))?;

        let start_offset = state.current_offset;
        state.writer.write_all(buffer)?;
        state.current_offset += buffer.len() as u64;

        Ok(start_offset)
    }

    /// Returns the current write position.
    pub fn current_offset(&self) -> Result<u64> {
        let state = self
            .inner
            .lock()
            .map_err(|_| NestcodeError::Internal("SeqWriter Mutex poisoned".into()))?;
        Ok(state.current_offset)
    }

    /// Flushes buffered bytes and returns the underlying sink.
    pub fn into_inner(self) -> Result<W> {
        let state = self
            .inner
            .into_inner()
            .map_err(|_| NestcodeError::Internal("SeqWriter Mutex poisoned".into()))?;
        state.writer.into_inner().map_err(|e| e.into_error().into())
    }
}
