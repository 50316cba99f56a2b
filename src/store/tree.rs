//! In-memory shape of an open container.
//!
//! Group and dataset metadata are always resident. Dataset payloads are either
//! owned bytes (written since the container was opened) or a window into the
//! mapped file that is only decoded on demand.

use indexmap::IndexMap;
use memmap2::Mmap;
use std::borrow::Cow;
use std::ops::Range;
use std::sync::Arc;

use crate::array::DType;
use crate::compression::CompressorRegistry;
use crate::error::{NestcodeError, Result};

/// Ordered attribute map.
pub(crate) type Attributes = IndexMap<String, crate::store::AttrValue>;

/// Backing bytes of an opened container file.
#[derive(Debug)]
pub(crate) enum Source {
    Mapped(Mmap),
    Memory(Vec<u8>),
}

impl Source {
    pub(crate) fn bytes(&self) -> &[u8] {
        match self {
            Self::Mapped(m) => m,
            Self::Memory(v) => v,
        }
    }
}

/// Storage of one dataset payload.
#[derive(Debug, Clone)]
pub(crate) enum Blob {
    /// Uncompressed bytes held in memory.
    Memory(Vec<u8>),
    /// A chunk body inside an opened container file.
    Stored {
        source: Arc<Source>,
        range: Range<usize>,
        compression_id: u8,
    },
}

impl Blob {
    /// The whole uncompressed payload.
    pub(crate) fn read_all<'b>(&'b self, registry: &CompressorRegistry) -> Result<Cow<'b, [u8]>> {
        match self {
            Self::Memory(bytes) => Ok(Cow::Borrowed(bytes)),
            Self::Stored {
                source,
                range,
                compression_id,
            } => {
                let raw = source
                    .bytes()
                    .get(range.clone())
                    .ok_or_else(|| NestcodeError::Format("Payload out of file bounds".into()))?;
                registry.get(*compression_id)?.decompress(raw)
            }
        }
    }

    /// Bytes `range` of the uncompressed payload.
    ///
    /// Uncompressed stored payloads are sliced in place; compressed ones have to be
    /// decompressed in full first.
    pub(crate) fn read_range(
        &self,
        range: Range<usize>,
        registry: &CompressorRegistry,
    ) -> Result<Vec<u8>> {
        let out_of_bounds = || NestcodeError::Format("Requested bytes exceed the payload".into());
        match self {
            Self::Stored {
                source,
                range: stored,
                compression_id: 0,
            } => {
                let start = stored.start.checked_add(range.start).ok_or_else(out_of_bounds)?;
                let end = stored
                    .start
                    .checked_add(range.end)
                    .filter(|&end| end <= stored.end)
                    .ok_or_else(out_of_bounds)?;
                source
                    .bytes()
                    .get(start..end)
                    .map(<[u8]>::to_vec)
                    .ok_or_else(out_of_bounds)
            }
            _ => {
                let all = self.read_all(registry)?;
                all.get(range).map(<[u8]>::to_vec).ok_or_else(out_of_bounds)
            }
        }
    }
}

/// A group node.
#[derive(Debug, Default)]
pub(crate) struct Group {
    pub(crate) attrs: Attributes,
    pub(crate) children: IndexMap<String, Entry>,
}

/// A dataset node.
#[derive(Debug)]
pub(crate) struct Dataset {
    pub(crate) attrs: Attributes,
    pub(crate) dtype: DType,
    pub(crate) shape: Vec<usize>,
    pub(crate) blob: Arc<Blob>,
    /// Algorithm applied when this dataset is next written out.
    pub(crate) compression_id: u8,
}

/// Any node of the tree.
#[derive(Debug)]
pub(crate) enum Entry {
    Group(Group),
    Dataset(Dataset),
}

impl Entry {
    pub(crate) fn attrs(&self) -> &Attributes {
        match self {
            Self::Group(g) => &g.attrs,
            Self::Dataset(d) => &d.attrs,
        }
    }

    pub(crate) fn attrs_mut(&mut self) -> &mut Attributes {
        match self {
            Self::Group(g) => &mut g.attrs,
            Self::Dataset(d) => &mut d.attrs,
        }
    }

    /// Copies the subtree with its attributes. The copy gets payload handles of its
    /// own, so lazy references into `self` never observe it.
    pub(crate) fn deep_clone(&self) -> Entry {
        match self {
            Self::Group(g) => Self::Group(Group {
                attrs: g.attrs.clone(),
                children: g
                    .children
                    .iter()
                    .map(|(name, child)| (name.clone(), child.deep_clone()))
                    .collect(),
            }),
            Self::Dataset(d) => Self::Dataset(Dataset {
                attrs: d.attrs.clone(),
                dtype: d.dtype,
                shape: d.shape.clone(),
                blob: Arc::new(Blob::clone(&d.blob)),
                compression_id: d.compression_id,
            }),
        }
    }

    /// Number of nodes in this subtree, including itself.
    pub(crate) fn node_count(&self) -> usize {
        match self {
            Self::Group(g) => 1 + g.children.values().map(Entry::node_count).sum::<usize>(),
            Self::Dataset(_) => 1,
        }
    }
}
