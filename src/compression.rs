//! Pluggable compression for dataset payloads.
//!
//! Each stored chunk records the ID of the algorithm that produced its body in the
//! `MetaByte` (bits 1-3), so payloads written with different settings can live in
//! the same container. Group chunks are never compressed.

use crate::error::{NestcodeError, Result};
use std::borrow::Cow;
use std::sync::OnceLock;

/// Interface for compression algorithms.
pub trait Compressor: Send + Sync + std::fmt::Debug {
    /// Unique ID stored in the `MetaByte`. 0 is reserved for no compression.
    fn id(&self) -> u8;

    /// Human-readable algorithm name.
    fn name(&self) -> &'static str;

    /// Compresses the data. May borrow the input when nothing is done.
    fn compress<'a>(&self, data: &'a [u8]) -> Result<Cow<'a, [u8]>>;

    /// Restores the original bytes.
    fn decompress<'a>(&self, data: &'a [u8]) -> Result<Cow<'a, [u8]>>;
}

// --- No Compression (Pass-through) ---

/// Stores payloads unchanged (ID 0). Uncompressed payloads support row access
/// straight from the mapped file.
#[derive(Debug, Clone, Copy)]
pub struct NoCompression;

impl Compressor for NoCompression {
    fn id(&self) -> u8 {
        0
    }

    fn name(&self) -> &'static str {
        "None"
    }

    fn compress<'a>(&self, data: &'a [u8]) -> Result<Cow<'a, [u8]>> {
        Ok(Cow::Borrowed(data))
    }

    fn decompress<'a>(&self, data: &'a [u8]) -> Result<Cow<'a, [u8]>> {
        Ok(Cow::Borrowed(data))
    }
}

// --- LZ4 Implementation ---

#[cfg(feature = "lz4_flex")]
/// LZ4 block compression with the uncompressed size prepended (ID 1).
#[derive(Debug, Clone, Copy)]
pub struct Lz4Compressor;

#[cfg(feature = "lz4_flex")]
impl Compressor for Lz4Compressor {
    fn id(&self) -> u8 {
        1
    }

    fn name(&self) -> &'static str {
        "LZ4"
    }

    fn compress<'a>(&self, data: &'a [u8]) -> Result<Cow<'a, [u8]>> {
        Ok(Cow::Owned(lz4_flex::compress_prepend_size(data)))
    }

    fn decompress<'a>(&self, data: &'a [u8]) -> Result<Cow<'a, [u8]>> {
        let vec = lz4_flex::decompress_size_prepended(data)
            .map_err(|e| NestcodeError::Compression(e.to_string()))?;
        Ok(Cow::Owned(vec))
    }
}

/// ID used when a write asks for compression. Falls back to 0 when no
/// compressing algorithm is compiled in.
pub fn preferred_compression_id() -> u8 {
    #[cfg(feature = "lz4_flex")]
    {
        Lz4Compressor.id()
    }
    #[cfg(not(feature = "lz4_flex"))]
    {
        NoCompression.id()
    }
}

// --- REGISTRY ---

/// Maps algorithm IDs stored in the file to `Compressor` implementations.
#[derive(Debug)]
pub struct CompressorRegistry {
    algorithms: Vec<Option<Box<dyn Compressor>>>,
}

impl CompressorRegistry {
    /// Creates a registry with the built-in algorithms.
    ///
    /// *   ID 0: `NoCompression`
    /// *   ID 1: `Lz4Compressor` (if `lz4_flex` feature is enabled)
    pub fn new() -> Self {
        let mut reg = Self {
            algorithms: (0..8).map(|_| None).collect(),
        };

        reg.register(Box::new(NoCompression));

        #[cfg(feature = "lz4_flex")]
        reg.register(Box::new(Lz4Compressor));

        reg
    }

    /// Registers a compressor under its own ID, replacing any previous one.
    pub fn register(&mut self, algo: Box<dyn Compressor>) {
        let id = usize::from(algo.id());
        if id >= self.algorithms.len() {
            self.algorithms.resize_with(id + 1, || None);
        }
        if let Some(slot) = self.algorithms.get_mut(id) {
            *slot = Some(algo);
        }
    }

    /// Retrieves a compressor by its ID.
    ///
    /// # Errors
    /// Returns `NestcodeError::Compression` if the ID is not registered.
    pub fn get(&self, id: u8) -> Result<&dyn Compressor> {
        self.algorithms
            .get(usize::from(id))
            .and_then(|opt| opt.as_deref())
            .ok_or_else(|| {
                NestcodeError::Compression(format!(
                    "Algorithm ID {id} is not registered or available"
                ))
            })
    }

    /// The process-wide registry holding the built-in algorithms.
    pub fn global() -> &'static CompressorRegistry {
        static GLOBAL: OnceLock<CompressorRegistry> = OnceLock::new();
        GLOBAL.get_or_init(CompressorRegistry::new)
    }

    /// Display name for an algorithm ID, including unknown ones.
    pub fn name_of(&self, id: u8) -> String {
        match self.get(id) {
            Ok(algo) => algo.name().to_string(),
            Err(_) => format!("Unknown({id})"),
        }
    }
}

impl Default for CompressorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_borrows_input() {
        let data = b"plain bytes";
        let out = CompressorRegistry::global().get(0).unwrap().compress(data).unwrap();
        assert!(matches!(out, Cow::Borrowed(_)));
    }

    #[cfg(feature = "lz4_flex")]
    #[test]
    fn lz4_restores_payload() {
        let data = vec![7u8; 4096];
        let algo = CompressorRegistry::global().get(1).unwrap();
        let packed = algo.compress(&data).unwrap().into_owned();
        assert!(packed.len() < data.len());
        assert_eq!(algo.decompress(&packed).unwrap().as_ref(), data.as_slice());
    }

    #[test]
    fn unknown_ids_are_reported() {
        let registry = CompressorRegistry::new();
        assert!(registry.get(6).is_err());
        assert_eq!(registry.name_of(6), "Unknown(6)");
    }
}
