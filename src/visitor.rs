//! Turns an in-memory container tree into a write graph.
//!
//! Every group and dataset becomes one node. Jobs borrow the tree instead of
//! copying it, so payload bytes are only touched when a worker encodes them.

use std::borrow::Cow;

use crate::compression::CompressorRegistry;
use crate::error::Result;
use crate::format::{ChildRef, NodeHeader};
use crate::graph::{ChunkId, JobConfig, SerializationJob, TaskGraph};
use crate::store::tree::{Attributes, Dataset, Entry, Group};

/// Types that can be structurally visited to populate a [`TaskGraph`].
///
/// Distinct from encoding bytes: a visitor only adds tasks, in stored order, so
/// children tables come out in the same order as the tree.
pub(crate) trait TreeVisitor {
    /// Adds `self` (and its subtree) to `graph` under `parent`.
    ///
    /// # Lifetimes
    /// * `'a`: the graph borrows `self` for as long as it lives.
    fn visit<'a>(&'a self, graph: &mut TaskGraph<'a>, parent: Option<ChunkId>) -> Result<ChunkId>;
}

impl TreeVisitor for Entry {
    fn visit<'a>(&'a self, graph: &mut TaskGraph<'a>, parent: Option<ChunkId>) -> Result<ChunkId> {
        match self {
            Entry::Group(g) => g.visit(graph, parent),
            Entry::Dataset(d) => d.visit(graph, parent),
        }
    }
}

impl TreeVisitor for Group {
    fn visit<'a>(&'a self, graph: &mut TaskGraph<'a>, parent: Option<ChunkId>) -> Result<ChunkId> {
        let id = graph.add(Box::new(GroupJob { group: self }), parent)?;
        for child in self.children.values() {
            child.visit(graph, Some(id))?;
        }
        Ok(id)
    }
}

impl TreeVisitor for Dataset {
    fn visit<'a>(&'a self, graph: &mut TaskGraph<'a>, parent: Option<ChunkId>) -> Result<ChunkId> {
        graph.add(Box::new(DatasetJob { dataset: self }), parent)
    }
}

fn attr_list(attrs: &Attributes) -> Vec<(String, crate::store::AttrValue)> {
    attrs.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

/// Writes a group: attributes and child names, no body.
struct GroupJob<'a> {
    group: &'a Group,
}

impl<'a> SerializationJob<'a> for GroupJob<'a> {
    fn header(&self, _children: &[ChildRef]) -> Result<Vec<u8>> {
        NodeHeader::Group {
            attrs: attr_list(&self.group.attrs),
            names: self.group.children.keys().cloned().collect(),
        }
        .to_bytes()
    }

    fn body(&self) -> Result<Cow<'a, [u8]>> {
        Ok(Cow::Borrowed(&[]))
    }

    fn is_group(&self) -> bool {
        true
    }
}

/// Writes a dataset: attributes, dtype and shape, and the element bytes.
struct DatasetJob<'a> {
    dataset: &'a Dataset,
}

impl<'a> SerializationJob<'a> for DatasetJob<'a> {
    fn header(&self, _children: &[ChildRef]) -> Result<Vec<u8>> {
        NodeHeader::Dataset {
            attrs: attr_list(&self.dataset.attrs),
            dtype: self.dataset.dtype,
            shape: self.dataset.shape.iter().map(|&d| d as u64).collect(),
        }
        .to_bytes()
    }

    fn body(&self) -> Result<Cow<'a, [u8]>> {
        self.dataset.blob.read_all(CompressorRegistry::global())
    }

    fn is_group(&self) -> bool {
        false
    }

    fn config(&self) -> JobConfig {
        JobConfig {
            compression_id: self.dataset.compression_id,
        }
    }
}
