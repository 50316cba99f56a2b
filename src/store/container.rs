use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::tree::{Blob, Dataset, Entry, Group};
use super::{AttrValue, Backend, LazyArray, Mode, NodeKind, Payload, StorageOptions};
use crate::compression::CompressorRegistry;
use crate::error::{NestcodeError, Result};
use crate::executor::execute_graph;
use crate::format::GlobalHeader;
use crate::graph::TaskGraph;
use crate::io::SeqWriter;
use crate::reader::ContainerReader;
use crate::visitor::TreeVisitor;

/// A hierarchical container of groups and datasets.
///
/// File-backed containers load their metadata on open and map dataset bodies
/// lazily; changes are written back on [`Container::flush`], [`Container::close`]
/// or drop. In-memory containers never touch the filesystem.
#[derive(Debug)]
pub struct Container {
    root: Entry,
    path: Option<PathBuf>,
    mode: Mode,
    dirty: bool,
}

impl Container {
    /// Opens or creates a container file.
    ///
    /// | mode | file exists | file missing |
    /// |------|-------------|--------------|
    /// | `r`, `r+` | opened | `Io` error |
    /// | `w` | truncated | created |
    /// | `w-`, `x` | `Io` error | created |
    /// | `a` | opened | created |
    pub fn open<P: AsRef<Path>>(path: P, mode: Mode) -> Result<Self> {
        let path = path.as_ref();
        let exists = path.exists();
        let (root, dirty) = match mode {
            Mode::Read | Mode::ReadWrite => (ContainerReader::open(path)?.read_tree()?, false),
            Mode::Append if exists => (ContainerReader::open(path)?.read_tree()?, false),
            Mode::Exclusive if exists => {
                return Err(NestcodeError::Io(Arc::new(std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    format!("{} already exists", path.display()),
                ))));
            }
            Mode::Truncate | Mode::Exclusive | Mode::Append => {
                (Entry::Group(Group::default()), true)
            }
        };
        debug!(path = %path.display(), %mode, nodes = root.node_count(), "opened container");
        let mut container = Self {
            root,
            path: Some(path.to_path_buf()),
            mode,
            dirty,
        };
        if dirty {
            // Materialize the file right away so the path exists while open.
            container.flush()?;
        }
        Ok(container)
    }

    /// A writable container that lives only in memory.
    pub fn in_memory() -> Self {
        Self {
            root: Entry::Group(Group::default()),
            path: None,
            mode: Mode::ReadWrite,
            dirty: false,
        }
    }

    /// A writable in-memory container initialized from a serialized image.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let root = ContainerReader::from_bytes(bytes)?.read_tree()?;
        Ok(Self {
            root,
            path: None,
            mode: Mode::ReadWrite,
            dirty: false,
        })
    }

    /// Serializes the whole container into a file image.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serialize_tree(&self.root, Vec::new())
    }

    /// File path, if file-backed.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The mode the container was opened with.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Number of nodes, the root group included.
    pub fn node_count(&self) -> usize {
        self.root.node_count()
    }

    /// Writes pending changes to disk.
    ///
    /// The new image goes to a temporary file next to the target, which then
    /// replaces the target in one rename. No-op for clean or in-memory containers.
    pub fn flush(&mut self) -> Result<()> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        if !self.dirty {
            return Ok(());
        }
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let tmp = NamedTempFile::new_in(dir)?;
        let (file, tmp_path) = tmp.into_parts();
        let file = serialize_tree(&self.root, file)?;
        file.sync_all()?;
        tmp_path
            .persist(path)
            .map_err(|e| NestcodeError::from(e.error))?;
        debug!(path = %path.display(), nodes = self.root.node_count(), "flushed container");
        self.dirty = false;
        Ok(())
    }

    /// Flushes and releases the container. Lazy references into it become
    /// unusable.
    pub fn close(mut self) -> Result<()> {
        self.flush()?;
        debug!(path = ?self.path, "closed container");
        Ok(())
    }

    /// Calls `f` for every node below the root, parents before children, in
    /// stored order.
    pub fn visit(&self, f: &mut dyn FnMut(&str, NodeKind)) {
        fn walk(group: &Group, prefix: &str, f: &mut dyn FnMut(&str, NodeKind)) {
            for (name, entry) in &group.children {
                let key = join(prefix, name);
                match entry {
                    Entry::Group(g) => {
                        f(&key, NodeKind::Group);
                        walk(g, &key, f);
                    }
                    Entry::Dataset(_) => f(&key, NodeKind::Dataset),
                }
            }
        }
        if let Entry::Group(root) = &self.root {
            walk(root, "", f);
        }
    }

    fn ensure_writable(&self, key: &str) -> Result<()> {
        if self.mode.is_writable() {
            Ok(())
        } else {
            Err(NestcodeError::ReadOnly { path: key.into() })
        }
    }

    fn lookup(&self, key: &str) -> Result<&Entry> {
        let mut entry = &self.root;
        for name in split(key) {
            entry = match entry {
                Entry::Group(g) => g.children.get(name),
                Entry::Dataset(_) => None,
            }
            .ok_or_else(|| NestcodeError::NotFound { path: key.into() })?;
        }
        Ok(entry)
    }

    fn lookup_mut(&mut self, key: &str) -> Result<&mut Entry> {
        let mut entry = &mut self.root;
        for name in split(key) {
            entry = match entry {
                Entry::Group(g) => g.children.get_mut(name),
                Entry::Dataset(_) => None,
            }
            .ok_or_else(|| NestcodeError::NotFound { path: key.into() })?;
        }
        Ok(entry)
    }

    /// Inserts `entry` at `key`, creating missing parent groups.
    fn insert(&mut self, key: &str, entry: Entry) -> Result<()> {
        self.ensure_writable(key)?;
        let names: Vec<&str> = split(key).collect();
        let Some((leaf, parents)) = names.split_last() else {
            return Err(NestcodeError::PathCollision { path: String::new() });
        };
        let mut group = match &mut self.root {
            Entry::Group(g) => g,
            Entry::Dataset(_) => return Err(NestcodeError::Internal("Root is not a group".into())),
        };
        for name in parents {
            let child = group
                .children
                .entry((*name).to_owned())
                .or_insert_with(|| Entry::Group(Group::default()));
            group = match child {
                Entry::Group(g) => g,
                Entry::Dataset(_) => {
                    return Err(NestcodeError::PathCollision { path: key.into() });
                }
            };
        }
        if group.children.contains_key(*leaf) {
            return Err(NestcodeError::PathCollision { path: key.into() });
        }
        group.children.insert((*leaf).to_owned(), entry);
        self.dirty = true;
        Ok(())
    }
}

impl Backend for Container {
    fn create_group(&mut self, key: &str) -> Result<()> {
        self.insert(key, Entry::Group(Group::default()))
    }

    fn create_dataset(&mut self, key: &str, data: Payload, options: &StorageOptions) -> Result<()> {
        data.validate()?;
        self.insert(
            key,
            Entry::Dataset(Dataset {
                attrs: Default::default(),
                dtype: data.dtype,
                shape: data.shape,
                blob: Arc::new(Blob::Memory(data.bytes)),
                compression_id: options.compression_id(),
            }),
        )
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        self.ensure_writable(key)?;
        let names: Vec<&str> = split(key).collect();
        let Some((leaf, parents)) = names.split_last() else {
            return Err(NestcodeError::InvalidArgument(
                "the root group cannot be deleted".into(),
            ));
        };
        let parent = self.lookup_mut(&parents.join("/"))?;
        let removed = match parent {
            Entry::Group(g) => g.children.shift_remove(*leaf),
            Entry::Dataset(_) => None,
        };
        if removed.is_none() {
            return Err(NestcodeError::NotFound { path: key.into() });
        }
        self.dirty = true;
        Ok(())
    }

    fn copy(&mut self, src: &str, dest: &str) -> Result<()> {
        self.ensure_writable(dest)?;
        let entry = self.lookup(src)?.deep_clone();
        debug!(src, dest, nodes = entry.node_count(), "copying subtree");
        self.insert(dest, entry)
    }

    fn exists(&self, key: &str) -> bool {
        self.lookup(key).is_ok()
    }

    fn node_kind(&self, key: &str) -> Result<NodeKind> {
        Ok(match self.lookup(key)? {
            Entry::Group(_) => NodeKind::Group,
            Entry::Dataset(_) => NodeKind::Dataset,
        })
    }

    fn get_attr(&self, key: &str, name: &str) -> Result<Option<AttrValue>> {
        Ok(self.lookup(key)?.attrs().get(name).cloned())
    }

    fn set_attr(&mut self, key: &str, name: &str, value: AttrValue) -> Result<()> {
        self.ensure_writable(key)?;
        self.lookup_mut(key)?.attrs_mut().insert(name.to_owned(), value);
        self.dirty = true;
        Ok(())
    }

    fn children(&self, key: &str) -> Result<Vec<String>> {
        match self.lookup(key)? {
            Entry::Group(g) => Ok(g.children.keys().cloned().collect()),
            Entry::Dataset(_) => Err(NestcodeError::InvalidArgument(format!(
                "'{key}' is a dataset, not a group"
            ))),
        }
    }

    fn dataset(&self, key: &str) -> Result<LazyArray> {
        match self.lookup(key)? {
            Entry::Dataset(d) => Ok(LazyArray::new(key.to_owned(), d.dtype, d.shape.clone(), &d.blob)),
            Entry::Group(_) => Err(NestcodeError::InvalidArgument(format!(
                "'{key}' is a group, not a dataset"
            ))),
        }
    }
}

impl Drop for Container {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!(path = ?self.path, error = %e, "failed to flush container on drop");
        }
    }
}

fn split(key: &str) -> impl Iterator<Item = &str> {
    key.split('/').filter(|s| !s.is_empty())
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_owned()
    } else {
        format!("{prefix}/{name}")
    }
}

/// Writes `root` as a complete file image into `sink` and returns the sink.
pub(crate) fn serialize_tree<W: Write + Send>(root: &Entry, sink: W) -> Result<W> {
    let mut graph = TaskGraph::new();
    root.visit(&mut graph, None)?;

    let writer = SeqWriter::new(sink);
    let root_ref = execute_graph(&graph, &writer, CompressorRegistry::global())?;
    let header = GlobalHeader::new(root_ref.offset, root_ref.length);
    writer.write_all(&header.to_bytes())?;
    writer.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intermediate_groups_are_created() {
        let mut c = Container::in_memory();
        c.create_dataset("a/b/c", Payload::scalar(1i64), &StorageOptions::new())
            .unwrap();
        assert_eq!(c.node_kind("a").unwrap(), NodeKind::Group);
        assert_eq!(c.node_kind("a/b/c").unwrap(), NodeKind::Dataset);
        assert!(matches!(
            c.create_group("a/b"),
            Err(NestcodeError::PathCollision { .. })
        ));
    }

    #[test]
    fn delete_drops_the_subtree_and_closes_lazy_views() {
        let mut c = Container::in_memory();
        c.create_dataset("g/x", Payload::scalar(2.5f64), &StorageOptions::new())
            .unwrap();
        let lazy = c.dataset("g/x").unwrap();
        c.delete("g").unwrap();
        assert!(!c.exists("g/x"));
        assert!(!lazy.is_open());
        assert!(c.delete("").is_err());
    }

    #[test]
    fn copies_are_independent_of_their_source() {
        let mut c = Container::in_memory();
        c.create_dataset("src/x", Payload::scalar(7u16), &StorageOptions::new())
            .unwrap();
        c.set_attr("src", "note", "kept".into()).unwrap();

        c.copy("src", "dst/inner").unwrap();
        assert_eq!(c.get_attr("dst/inner", "note").unwrap(), Some(AttrValue::from("kept")));
        assert_eq!(c.node_kind("dst/inner/x").unwrap(), NodeKind::Dataset);

        let original = c.dataset("src/x").unwrap();
        let copied = c.dataset("dst/inner/x").unwrap();
        c.delete("dst").unwrap();
        assert!(original.is_open());
        assert!(!copied.is_open());

        assert!(matches!(c.copy("src", "src/x"), Err(NestcodeError::PathCollision { .. })));
        assert!(matches!(c.copy("missing", "y"), Err(NestcodeError::NotFound { .. })));
    }

    #[test]
    fn image_round_trip_keeps_order_and_attributes() {
        let mut c = Container::in_memory();
        for name in ["z", "a", "m"] {
            c.create_group(name).unwrap();
        }
        c.set_attr("a", "original_type", "dict".into()).unwrap();
        let back = Container::from_bytes(c.to_bytes().unwrap()).unwrap();
        assert_eq!(back.children("").unwrap(), vec!["z", "a", "m"]);
        assert_eq!(
            back.get_attr("a", "original_type").unwrap(),
            Some(AttrValue::Str("dict".into()))
        );
    }
}
