//! Tools for inspecting the physical structure of container files.
//! Useful for debugging tag layouts and verifying what a write produced.

use serde::Serialize;
use std::path::Path;

use crate::array::DType;
use crate::compression::CompressorRegistry;
use crate::error::{NestcodeError, Result};
use crate::format::NodeHeader;
use crate::reader::{ChunkNode, ContainerReader, MAX_READ_DEPTH};
use crate::store::{AttrValue, NodeKind};
use crate::{KEY_ORIGIN_ATTR, ORIGINAL_TYPE_ATTR};

/// A structural report of a container file.
#[derive(Debug, Serialize)]
pub struct Report {
    /// Total size of the file.
    pub file_size: u64,
    /// Offset where the root chunk starts.
    pub root_offset: u64,
    /// Format version.
    pub version: u16,
    /// The node tree.
    pub tree: NodeInfo,
}

/// Metadata for a single stored node.
#[derive(Debug, Serialize)]
pub struct NodeInfo {
    /// Name within the parent group; empty for the root.
    pub name: String,
    /// Group or dataset.
    pub kind: NodeKind,
    /// Value of the `original_type` tag, if present.
    pub original_type: Option<String>,
    /// Value of the `key_origin` tag, if present.
    pub key_origin: Option<String>,
    /// Element type of a dataset.
    pub dtype: Option<DType>,
    /// Shape of a dataset.
    pub shape: Option<Vec<u64>>,
    /// Stored body size in bytes.
    pub payload_size: usize,
    /// Compression algorithm of the body.
    pub compression: String,
    /// Child nodes.
    pub children: Vec<NodeInfo>,
}

/// The container inspector.
#[derive(Debug)]
pub struct Inspector;

impl Inspector {
    /// Analyzes a file and returns a structural report.
    pub fn inspect<P: AsRef<Path>>(path: P) -> Result<Report> {
        Self::report(&ContainerReader::open(path)?)
    }

    /// Analyzes an in-memory file image.
    pub fn inspect_bytes(bytes: Vec<u8>) -> Result<Report> {
        Self::report(&ContainerReader::from_bytes(bytes)?)
    }

    fn report(reader: &ContainerReader) -> Result<Report> {
        let root = reader.root()?;
        Ok(Report {
            file_size: reader.file_size(),
            root_offset: root.offset(),
            version: reader.header().version,
            tree: Self::inspect_node(String::new(), &root, 0)?,
        })
    }

    fn inspect_node(name: String, node: &ChunkNode<'_>, depth: usize) -> Result<NodeInfo> {
        if depth > MAX_READ_DEPTH {
            return Err(NestcodeError::Format("Group nesting too deep".into()));
        }
        let compression = CompressorRegistry::global().name_of(node.meta().compression_method());
        let tag = |attrs: &[(String, AttrValue)], key: &str| {
            attrs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.to_string())
        };

        let info = match node.header()? {
            NodeHeader::Group { attrs, names } => {
                let mut children = Vec::with_capacity(names.len());
                for (child, child_name) in node.children()?.iter().zip(names) {
                    children.push(Self::inspect_node(child_name, child, depth + 1)?);
                }
                NodeInfo {
                    name,
                    kind: NodeKind::Group,
                    original_type: tag(attrs.as_slice(), ORIGINAL_TYPE_ATTR),
                    key_origin: tag(attrs.as_slice(), KEY_ORIGIN_ATTR),
                    dtype: None,
                    shape: None,
                    payload_size: node.body_len(),
                    compression,
                    children,
                }
            }
            NodeHeader::Dataset {
                attrs,
                dtype,
                shape,
            } => NodeInfo {
                name,
                kind: NodeKind::Dataset,
                original_type: tag(attrs.as_slice(), ORIGINAL_TYPE_ATTR),
                key_origin: tag(attrs.as_slice(), KEY_ORIGIN_ATTR),
                dtype: Some(dtype),
                shape: Some(shape),
                payload_size: node.body_len(),
                compression,
                children: Vec::new(),
            },
        };
        Ok(info)
    }
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== NESTCODE INSPECTOR REPORT ===")?;
        writeln!(f, "File Size:      {}", self.file_size)?;
        writeln!(f, "Root Offset:    {}", self.root_offset)?;
        writeln!(f, "Version:        {}", self.version)?;
        writeln!(f, "\n[TREE]")?;
        self.tree.fmt_recursive(f, "", true)
    }
}

impl NodeInfo {
    fn fmt_recursive(
        &self,
        f: &mut std::fmt::Formatter<'_>,
        prefix: &str,
        is_last: bool,
    ) -> std::fmt::Result {
        let connector = if is_last { "└── " } else { "├── " };
        let child_prefix = if is_last { "    " } else { "│   " };
        let name = if self.name.is_empty() { "/" } else { &self.name };
        let tag = self.original_type.as_deref().unwrap_or("-");
        let origin = self
            .key_origin
            .as_deref()
            .map(|o| format!(" key:{o}"))
            .unwrap_or_default();

        match self.kind {
            NodeKind::Group => writeln!(
                f,
                "{prefix}{connector}{name} [{tag}]{origin} | Children: {}",
                self.children.len()
            )?,
            NodeKind::Dataset => writeln!(
                f,
                "{prefix}{connector}{name} [{tag}]{origin} | {} {:?} | Size: {}b | Algo: {}",
                self.dtype.map(|d| d.name()).unwrap_or("?"),
                self.shape.as_deref().unwrap_or(&[]),
                self.payload_size,
                self.compression
            )?,
        }

        for (i, child) in self.children.iter().enumerate() {
            let is_last_child = i + 1 == self.children.len();
            child.fmt_recursive(f, &format!("{prefix}{child_prefix}"), is_last_child)?;
        }
        Ok(())
    }
}
