//! High-level entry points and per-file configuration.

use std::path::Path;

use crate::constants::DEFAULT_MAX_DEPTH;
use crate::error::Result;
use crate::file::File;
use crate::path::NodePath;
use crate::store::{Mode, StorageOptions};
use crate::value::Value;

/// Options applied to every codec operation of a [`File`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileOptions {
    /// Compress leaf payloads written through [`File::write`].
    pub compression: bool,
    /// Maximum composite nesting accepted by writes and reads.
    pub max_depth: usize,
}

impl Default for FileOptions {
    fn default() -> Self {
        Self {
            compression: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl FileOptions {
    /// The storage options handed to the backend for each leaf.
    pub fn storage(&self) -> StorageOptions {
        StorageOptions::new().compression(self.compression)
    }
}

/// The main entry point.
#[derive(Debug)]
pub struct Nestcode;

impl Nestcode {
    /// Starts configuring a file.
    ///
    /// ```
    /// use nestcode::{Nestcode, Value};
    ///
    /// let mut file = Nestcode::builder().compression(true).max_depth(8).in_memory();
    /// file.set("x", Value::Float(2.5))?;
    /// assert_eq!(file.get("x")?, Value::Float(2.5));
    /// # Ok::<(), nestcode::NestcodeError>(())
    /// ```
    pub fn builder() -> FileBuilder {
        FileBuilder::default()
    }

    /// Writes `value` at `id` in the file at `path`, creating the file if needed and
    /// replacing whatever was stored at `id`.
    pub fn save<P: AsRef<Path>>(path: P, id: impl Into<NodePath>, value: &Value) -> Result<()> {
        let mut file = File::open(path, Mode::Append)?;
        file.write(id, value, true)?;
        file.close()
    }

    /// Reads the value at `id` from the file at `path`, fully materialized.
    pub fn load<P: AsRef<Path>>(path: P, id: impl Into<NodePath>) -> Result<Value> {
        let file = File::open(path, Mode::Read)?;
        Ok(file.read(id, false)?.0)
    }
}

/// Configures and opens a [`File`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FileBuilder {
    options: FileOptions,
}

impl FileBuilder {
    /// Enables payload compression (LZ4 when the `lz4_flex` feature is on).
    pub fn compression(mut self, enable: bool) -> Self {
        self.options.compression = enable;
        self
    }

    /// Sets the nesting limit.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.options.max_depth = depth;
        self
    }

    /// Opens a container file.
    pub fn open<P: AsRef<Path>>(self, path: P, mode: Mode) -> Result<File> {
        File::open_with(path, mode, self.options)
    }

    /// Creates an in-memory container.
    pub fn in_memory(self) -> File {
        File::with_options(crate::store::Container::in_memory(), self.options)
    }

    /// Loads an in-memory container from a file image.
    pub fn from_bytes(self, bytes: Vec<u8>) -> Result<File> {
        Ok(File::with_options(
            crate::store::Container::from_bytes(bytes)?,
            self.options,
        ))
    }
}
