//! The read-side engine.
//!
//! Memory-maps a container file, validates the Global Header and gives random
//! access to chunks. Opening a container rebuilds the group/dataset metadata
//! from the chunks; dataset bodies stay in the mapping until they are read.

use memmap2::Mmap;
use std::fs::File;
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::array::byte_len;
use crate::error::{NestcodeError, Result};
use crate::format::{
    CHUNK_TRAILER_SIZE, ChildRef, GLOBAL_HEADER_SIZE, GlobalHeader, MetaByte, NodeHeader,
    read_u32,
};
use crate::store::tree::{Blob, Dataset, Entry, Group, Source};

/// Nesting limit when walking a file. Guards against malformed or cyclic
/// children tables.
pub(crate) const MAX_READ_DEPTH: usize = 1024;

/// The handle for reading a container file.
/// Holds the mapped bytes and the validated Global Header.
#[derive(Debug)]
pub struct ContainerReader {
    source: Arc<Source>,
    header: GlobalHeader,
}

/// A view of one chunk within the file.
/// A lightweight handle that points into the mapping.
#[derive(Debug, Clone)]
pub struct ChunkNode<'a> {
    reader: &'a ContainerReader,
    offset: u64,
    length: u64,
    meta: MetaByte,
    header_len: usize,
    child_count: u32,
    body_end: usize,
}

impl ContainerReader {
    /// Opens a container file and validates its header.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let file_size = file.metadata()?.len();
        if file_size < GLOBAL_HEADER_SIZE as u64 {
            return Err(NestcodeError::Format("File smaller than header".into()));
        }

        // SAFETY: the mapping is read only. Concurrent modification of the file by
        // another process is outside the supported usage.
        #[allow(unsafe_code)]
        let mmap = unsafe { Mmap::map(&file)? };
        debug!(path = %path.as_ref().display(), size = file_size, "mapped container file");
        Self::from_source(Source::Mapped(mmap))
    }

    /// Reads a container from an in-memory image.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::from_source(Source::Memory(bytes))
    }

    fn from_source(source: Source) -> Result<Self> {
        let bytes = source.bytes();
        if bytes.len() < GLOBAL_HEADER_SIZE {
            return Err(NestcodeError::Format("File smaller than header".into()));
        }
        let header = GlobalHeader::from_bytes(&bytes[bytes.len() - GLOBAL_HEADER_SIZE..])?;
        Ok(Self {
            source: Arc::new(source),
            header,
        })
    }

    /// The validated Global Header.
    pub fn header(&self) -> &GlobalHeader {
        &self.header
    }

    /// Total file size in bytes.
    pub fn file_size(&self) -> u64 {
        self.source.bytes().len() as u64
    }

    /// Returns a view of the Root Chunk.
    pub fn root(&self) -> Result<ChunkNode<'_>> {
        self.get_chunk(self.header.root_offset, self.header.root_length)
    }

    /// Retrieves any chunk by its physical location.
    pub fn get_chunk(&self, offset: u64, length: u64) -> Result<ChunkNode<'_>> {
        let data_end = self.file_size() - GLOBAL_HEADER_SIZE as u64;
        let end = offset
            .checked_add(length)
            .filter(|&end| end <= data_end)
            .ok_or_else(|| NestcodeError::Format("Chunk out of file bounds".into()))?;
        if length < CHUNK_TRAILER_SIZE as u64 {
            return Err(NestcodeError::Format("Chunk too small for trailer".into()));
        }

        let bytes = self.source.bytes();
        let start = offset as usize;
        let chunk_end = end as usize;
        let meta = MetaByte::from_byte(bytes[chunk_end - 1]);
        let header_len = read_u32(&bytes[chunk_end - 5..chunk_end - 1]) as usize;

        let mut child_count = 0;
        let mut body_end = chunk_end - CHUNK_TRAILER_SIZE;
        if meta.is_group() {
            if body_end < start + 4 {
                return Err(NestcodeError::Format("Group chunk too small for its table".into()));
            }
            child_count = read_u32(&bytes[body_end - 4..body_end]);
            let table = (child_count as usize)
                .checked_mul(ChildRef::SIZE)
                .and_then(|t| t.checked_add(4))
                .ok_or_else(|| NestcodeError::Format("Invalid child count".into()))?;
            body_end = body_end
                .checked_sub(table)
                .filter(|&e| e >= start)
                .ok_or_else(|| NestcodeError::Format("Invalid child count for chunk size".into()))?;
        }
        if start + header_len > body_end {
            return Err(NestcodeError::Format("Chunk header exceeds chunk".into()));
        }

        Ok(ChunkNode {
            reader: self,
            offset,
            length,
            meta,
            header_len,
            child_count,
            body_end,
        })
    }

    /// Rebuilds the group/dataset tree. Dataset bodies are referenced, not read.
    pub(crate) fn read_tree(&self) -> Result<Entry> {
        let root = self.root()?;
        if !root.is_group() {
            return Err(NestcodeError::Format("Root chunk is not a group".into()));
        }
        self.read_entry(&root, 0)
    }

    fn read_entry(&self, chunk: &ChunkNode<'_>, depth: usize) -> Result<Entry> {
        if depth > MAX_READ_DEPTH {
            return Err(NestcodeError::Format("Group nesting too deep".into()));
        }
        match chunk.header()? {
            NodeHeader::Group { attrs, names } => {
                if names.len() != chunk.child_count() {
                    return Err(NestcodeError::Format(
                        "Child names do not match the children table".into(),
                    ));
                }
                let mut group = Group {
                    attrs: attrs.into_iter().collect(),
                    ..Group::default()
                };
                for (i, name) in names.into_iter().enumerate() {
                    let child = chunk.get_child(i)?;
                    let entry = self.read_entry(&child, depth + 1)?;
                    group.children.insert(name, entry);
                }
                Ok(Entry::Group(group))
            }
            NodeHeader::Dataset {
                attrs,
                dtype,
                shape,
            } => {
                let shape = shape
                    .into_iter()
                    .map(usize::try_from)
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|_| NestcodeError::Format("Dataset shape overflows".into()))?;
                let payload_len = byte_len(dtype, &shape)
                    .ok_or_else(|| NestcodeError::Format("Dataset shape overflows".into()))?;
                let compression_id = chunk.meta().compression_method();
                if compression_id == 0 && dtype.is_numeric() && payload_len != chunk.body_len() {
                    return Err(NestcodeError::Format(format!(
                        "{dtype} dataset of shape {shape:?} needs {payload_len} bytes, chunk holds {}",
                        chunk.body_len()
                    )));
                }
                Ok(Entry::Dataset(Dataset {
                    attrs: attrs.into_iter().collect(),
                    dtype,
                    shape,
                    blob: Arc::new(Blob::Stored {
                        source: Arc::clone(&self.source),
                        range: chunk.body_range(),
                        compression_id,
                    }),
                    compression_id,
                }))
            }
        }
    }
}

impl<'a> ChunkNode<'a> {
    /// Absolute offset of the chunk.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Total length of the chunk on disk.
    pub fn length(&self) -> u64 {
        self.length
    }

    /// The chunk's flags.
    pub fn meta(&self) -> MetaByte {
        self.meta
    }

    /// True for group chunks.
    pub fn is_group(&self) -> bool {
        self.meta.is_group()
    }

    /// Number of entries in the children table.
    pub fn child_count(&self) -> usize {
        self.child_count as usize
    }

    /// Decodes the chunk's header.
    pub fn header(&self) -> Result<NodeHeader> {
        let start = self.offset as usize;
        NodeHeader::from_bytes(&self.reader.source.bytes()[start..start + self.header_len])
    }

    /// Stored (possibly compressed) body size.
    pub fn body_len(&self) -> usize {
        self.body_range().len()
    }

    fn body_range(&self) -> Range<usize> {
        self.offset as usize + self.header_len..self.body_end
    }

    /// Views of every child chunk, in table order.
    pub fn children(&self) -> Result<Vec<ChunkNode<'a>>> {
        (0..self.child_count()).map(|i| self.get_child(i)).collect()
    }

    /// Random access to one child without parsing the whole table.
    pub fn get_child(&self, index: usize) -> Result<ChunkNode<'a>> {
        if index >= self.child_count() {
            return Err(NestcodeError::Format("Child index out of bounds".into()));
        }
        let entry_start = self.body_end + index * ChildRef::SIZE;
        let child_ref = ChildRef::from_bytes(
            &self.reader.source.bytes()[entry_start..entry_start + ChildRef::SIZE],
        )?;
        if child_ref.offset >= self.offset {
            return Err(NestcodeError::Format(
                "Child chunk does not precede its group".into(),
            ));
        }
        self.reader.get_chunk(child_ref.offset, child_ref.length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::DType;
    use crate::store::serialize_tree;

    fn image_with(dtype: DType, shape: Vec<usize>, body: Vec<u8>) -> Vec<u8> {
        let mut root = Group::default();
        root.children.insert(
            "x".into(),
            Entry::Dataset(Dataset {
                attrs: Default::default(),
                dtype,
                shape,
                blob: Arc::new(Blob::Memory(body)),
                compression_id: 0,
            }),
        );
        serialize_tree(&Entry::Group(root), Vec::new()).unwrap()
    }

    #[test]
    fn consistent_datasets_are_accepted() {
        let image = image_with(DType::Int32, vec![2, 2], vec![0; 16]);
        let tree = ContainerReader::from_bytes(image).unwrap().read_tree().unwrap();
        assert_eq!(tree.node_count(), 2);
    }

    #[test]
    fn overflowing_shapes_are_rejected() {
        let image = image_with(DType::Float64, vec![usize::MAX / 2, 4], vec![0; 8]);
        let reader = ContainerReader::from_bytes(image).unwrap();
        assert!(matches!(reader.read_tree(), Err(NestcodeError::Format(_))));
    }

    #[test]
    fn shapes_must_match_uncompressed_bodies() {
        let image = image_with(DType::Int32, vec![3], vec![0; 8]);
        let reader = ContainerReader::from_bytes(image).unwrap();
        assert!(matches!(reader.read_tree(), Err(NestcodeError::Format(_))));
    }

    #[test]
    fn children_are_reachable_from_the_root_table() {
        let image = image_with(DType::UInt8, vec![1], vec![7]);
        let reader = ContainerReader::from_bytes(image).unwrap();
        let root = reader.root().unwrap();
        assert!(root.is_group());
        assert_eq!(root.child_count(), 1);
        assert!(root.get_child(0).unwrap().offset() < root.offset());
        assert!(root.get_child(1).is_err());
    }
}
