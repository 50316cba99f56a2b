//! Physical layout of a container file.
//!
//! # Layout Strategy
//! The file is a sequence of chunks written bottom-up (children before their
//! group), followed by a Global Header at the very end of the file.
//!
//! File: `[Chunk 0] [Chunk 1] ... [Root Chunk] [Global Header]`
//!
//! ## Chunk Anatomy
//! `[ Header ] [ Body ] [ Children Table (groups only) ] [ HeaderLen u32 ] [ MetaByte ]`
//!
//! * Header: bincode-encoded [`NodeHeader`] (attributes, child names or dtype/shape).
//! * Body: dataset elements, possibly compressed. Empty for groups.
//! * Children Table: `ChildRef * N` followed by `N` as `u32`.

use serde::{Deserialize, Serialize};
use std::hash::Hasher;
use twox_hash::XxHash64;

use crate::array::DType;
use crate::error::{NestcodeError, Result};
use crate::store::AttrValue;

/// Magic bytes identifying the file format: "NST1".
pub const MAGIC_BYTES: [u8; 4] = *b"NST1";

/// Current format version.
pub const FORMAT_VERSION: u16 = 1;

/// The fixed size of the Global Header.
/// Magic(4) + Version(2) + RootOffset(8) + RootLength(8) + Checksum(4) = 26
pub const GLOBAL_HEADER_SIZE: usize = 26;

/// Bytes of chunk trailer common to all chunks: HeaderLen(4) + MetaByte(1).
pub const CHUNK_TRAILER_SIZE: usize = 5;

/// Configuration flags for a chunk, stored in its last byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetaByte(u8);

impl MetaByte {
    const GROUP_MASK: u8 = 0b0000_0001; // Bit 0
    const COMPRESSION_MASK: u8 = 0b0000_1110; // Bits 1-3

    /// Creates a new MetaByte.
    pub fn new(is_group: bool, compression_id: u8) -> Self {
        let mut byte = 0;
        if is_group {
            byte |= Self::GROUP_MASK;
        }
        byte |= (compression_id & 0x07) << 1;
        Self(byte)
    }

    /// Decodes the byte.
    pub fn from_byte(byte: u8) -> Self {
        Self(byte)
    }

    /// Returns true if the chunk is a group and carries a children table.
    pub fn is_group(&self) -> bool {
        (self.0 & Self::GROUP_MASK) != 0
    }

    /// Returns the compression algorithm ID (0-7) of the body.
    pub fn compression_method(&self) -> u8 {
        (self.0 & Self::COMPRESSION_MASK) >> 1
    }

    /// Returns the raw byte representation.
    pub fn as_u8(&self) -> u8 {
        self.0
    }
}

/// Location of a child chunk, stored in its group's children table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildRef {
    /// Absolute offset in the file where the child chunk starts.
    pub offset: u64,
    /// Total length of the child chunk (including trailer).
    pub length: u64,
}

impl ChildRef {
    /// The size in bytes of a serialized ChildRef.
    pub const SIZE: usize = 16;

    /// Serializes to a fixed-size byte array (Little Endian).
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..8].copy_from_slice(&self.offset.to_le_bytes());
        buf[8..16].copy_from_slice(&self.length.to_le_bytes());
        buf
    }

    /// Deserializes from a fixed-size byte array.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(NestcodeError::Format("Buffer too small for ChildRef".into()));
        }
        Ok(Self {
            offset: read_u64(&bytes[0..8]),
            length: read_u64(&bytes[8..16]),
        })
    }
}

/// Metadata stored at the start of every chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeHeader {
    /// A group: its attributes and the names of its children, in table order.
    Group {
        /// Attributes in insertion order.
        attrs: Vec<(String, AttrValue)>,
        /// Child names; entry `i` names child reference `i`.
        names: Vec<String>,
    },
    /// A dataset: its attributes and the element type and shape of the body.
    Dataset {
        /// Attributes in insertion order.
        attrs: Vec<(String, AttrValue)>,
        /// Element type.
        dtype: DType,
        /// Extent of every axis.
        shape: Vec<u64>,
    },
}

impl NodeHeader {
    /// Encodes with the standard bincode configuration.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serde::encode_to_vec(self, bincode::config::standard())?)
    }

    /// Decodes a header written by [`NodeHeader::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (header, _) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())?;
        Ok(header)
    }
}

/// The Global Header located at the very end of the file.
/// It points to the Root Chunk, which is the entry point for the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalHeader {
    /// Format identifier, always [`MAGIC_BYTES`].
    pub magic: [u8; 4],
    /// Format version.
    pub version: u16,
    /// Pointer to the Root Chunk.
    pub root_offset: u64,
    /// Length of the Root Chunk.
    pub root_length: u64,
    /// Low 32 bits of XxHash64 over the preceding header bytes.
    pub checksum: u32,
}

impl GlobalHeader {
    /// Creates a header pointing at the given root chunk.
    pub fn new(root_offset: u64, root_length: u64) -> Self {
        let mut header = Self {
            magic: MAGIC_BYTES,
            version: FORMAT_VERSION,
            root_offset,
            root_length,
            checksum: 0,
        };
        header.checksum = header.compute_checksum();
        header
    }

    /// Serializes the header to bytes.
    pub fn to_bytes(&self) -> [u8; GLOBAL_HEADER_SIZE] {
        let mut buf = [0u8; GLOBAL_HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.magic);
        buf[4..6].copy_from_slice(&self.version.to_le_bytes());
        buf[6..14].copy_from_slice(&self.root_offset.to_le_bytes());
        buf[14..22].copy_from_slice(&self.root_length.to_le_bytes());
        buf[22..26].copy_from_slice(&self.checksum.to_le_bytes());
        buf
    }

    /// Parses and validates the trailing header bytes of a file.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != GLOBAL_HEADER_SIZE {
            return Err(NestcodeError::Format("Global header has the wrong size".into()));
        }
        if bytes[0..4] != MAGIC_BYTES {
            return Err(NestcodeError::Format("Invalid Magic Bytes".into()));
        }
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != FORMAT_VERSION {
            return Err(NestcodeError::Format(format!("Unsupported version: {version}")));
        }
        let header = Self {
            magic: MAGIC_BYTES,
            version,
            root_offset: read_u64(&bytes[6..14]),
            root_length: read_u64(&bytes[14..22]),
            checksum: read_u32(&bytes[22..26]),
        };
        if header.checksum != header.compute_checksum() {
            return Err(NestcodeError::Format("Global header checksum mismatch".into()));
        }
        Ok(header)
    }

    fn compute_checksum(&self) -> u32 {
        let bytes = self.to_bytes();
        let mut hasher = XxHash64::with_seed(0);
        hasher.write(&bytes[..GLOBAL_HEADER_SIZE - 4]);
        hasher.finish() as u32
    }
}

pub(crate) fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(buf)
}

pub(crate) fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(buf)
}
