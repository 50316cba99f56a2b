//! The codec façade over a backend.

use std::path::Path;

use crate::api::FileOptions;
use crate::decoder;
use crate::encoder;
use crate::error::Result;
use crate::path::NodePath;
use crate::store::{AttrValue, Backend, Container, Mode, NodeKind, StorageOptions};
use crate::value::Value;

/// A container that reads and writes nested [`Value`]s.
///
/// `write`/`read` encode and decode whole structures; everything else is handed to
/// the backend unchanged. Paths accept anything convertible to [`NodePath`]: a bare
/// name, a tuple of segments, or an explicit path.
///
/// ```
/// use nestcode::{File, Value};
///
/// let mut file = File::in_memory();
/// file.set(("runs", 3i64), Value::list([Value::Float(0.5), Value::Str("ok".into())]))?;
/// let run = file.get(("runs", 3i64))?;
/// assert_eq!(run.at(1), Some(&Value::Str("ok".into())));
/// # Ok::<(), nestcode::NestcodeError>(())
/// ```
#[derive(Debug)]
pub struct File<B: Backend = Container> {
    backend: B,
    options: FileOptions,
}

impl File<Container> {
    /// Opens a container file with default options. `mode` is a [`Mode`] or one of
    /// `"r"`, `"r+"`, `"w"`, `"w-"`, `"x"`, `"a"`.
    pub fn open<P, M>(path: P, mode: M) -> Result<Self>
    where
        P: AsRef<Path>,
        M: TryInto<Mode>,
        crate::NestcodeError: From<M::Error>,
    {
        Self::open_with(path, mode.try_into()?, FileOptions::default())
    }

    pub(crate) fn open_with<P: AsRef<Path>>(path: P, mode: Mode, options: FileOptions) -> Result<Self> {
        Ok(Self::with_options(Container::open(path, mode)?, options))
    }

    /// A container that lives only in memory.
    pub fn in_memory() -> Self {
        Self::with_backend(Container::in_memory())
    }

    /// An in-memory container loaded from a file image.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Ok(Self::with_backend(Container::from_bytes(bytes)?))
    }

    /// The complete file image of the container.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.backend.to_bytes()
    }

    /// Writes pending changes to disk.
    pub fn flush(&mut self) -> Result<()> {
        self.backend.flush()
    }

    /// Flushes and closes the container. Lazy references read from it stop
    /// working.
    pub fn close(self) -> Result<()> {
        self.backend.close()
    }

    /// File path, if file-backed.
    pub fn path(&self) -> Option<&Path> {
        self.backend.path()
    }

    /// Open mode.
    pub fn mode(&self) -> Mode {
        self.backend.mode()
    }

    /// Calls `f` for every stored node, parents first.
    pub fn visit(&self, mut f: impl FnMut(&str, NodeKind)) {
        self.backend.visit(&mut f);
    }
}

impl<B: Backend> File<B> {
    /// Wraps any backend with default options.
    pub fn with_backend(backend: B) -> Self {
        Self::with_options(backend, FileOptions::default())
    }

    /// Wraps any backend.
    pub fn with_options(backend: B, options: FileOptions) -> Self {
        Self { backend, options }
    }

    /// The options in effect.
    pub fn options(&self) -> &FileOptions {
        &self.options
    }

    /// Encodes `value` at `id` using the file's storage options.
    ///
    /// # Errors
    /// * `PathCollision` if `id` exists and `overwrite` is false.
    /// * `UnsupportedType`, `InvalidKey`, `DepthLimit` if some part of `value`
    ///   cannot be stored. Nothing is written in that case.
    pub fn write(&mut self, id: impl Into<NodePath>, value: &Value, overwrite: bool) -> Result<()> {
        let storage = self.options.storage();
        self.write_with(id, value, overwrite, &storage)
    }

    /// Encodes `value` at `id` with explicit storage options.
    pub fn write_with(
        &mut self,
        id: impl Into<NodePath>,
        value: &Value,
        overwrite: bool,
        storage: &StorageOptions,
    ) -> Result<()> {
        encoder::write(
            &mut self.backend,
            &id.into(),
            value,
            overwrite,
            storage,
            self.options.max_depth,
        )
    }

    /// Decodes the value at `id` and the `key_origin` tag it was written with.
    ///
    /// With `lazy`, arrays come back as [`Value::Lazy`] references.
    pub fn read(&self, id: impl Into<NodePath>, lazy: bool) -> Result<(Value, Option<String>)> {
        decoder::read(&self.backend, &id.into(), lazy, self.options.max_depth)
    }

    /// Lazy read of the value at `id`.
    pub fn get(&self, id: impl Into<NodePath>) -> Result<Value> {
        Ok(self.read(id, true)?.0)
    }

    /// Writes `value` at `id`; fails if the path is taken.
    pub fn set(&mut self, id: impl Into<NodePath>, value: impl Into<Value>) -> Result<()> {
        self.write(id, &value.into(), false)
    }

    /// Returns true if a node exists at `id`.
    pub fn contains(&self, id: impl Into<NodePath>) -> bool {
        self.backend.exists(&id.into().resolve())
    }

    /// Names of the top-level nodes, in stored order.
    pub fn keys(&self) -> Result<Vec<String>> {
        self.backend.children("")
    }

    /// Names of the top-level nodes with their kind, in stored order.
    pub fn items(&self) -> Result<impl Iterator<Item = (String, NodeKind)>> {
        let items = self
            .backend
            .children("")?
            .into_iter()
            .map(|name| {
                let kind = self.backend.node_kind(&name)?;
                Ok((name, kind))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(items.into_iter())
    }

    /// Lazily decodes the top-level values, in stored order.
    pub fn values(&self) -> Result<impl Iterator<Item = Result<Value>> + '_> {
        let names = self.backend.children("")?;
        Ok(names.into_iter().map(move |name| self.get(name)))
    }

    /// Deletes the node at `id` and its subtree.
    pub fn delete(&mut self, id: impl Into<NodePath>) -> Result<()> {
        self.backend.delete(&id.into().resolve())
    }

    /// Copies the node at `src` and its subtree to `dest`. Tags are copied with
    /// the nodes, so the copy decodes to the same value.
    pub fn copy(&mut self, src: impl Into<NodePath>, dest: impl Into<NodePath>) -> Result<()> {
        self.backend.copy(&src.into().resolve(), &dest.into().resolve())
    }

    /// Reads one attribute of the node at `id`.
    pub fn attr(&self, id: impl Into<NodePath>, name: &str) -> Result<Option<AttrValue>> {
        self.backend.get_attr(&id.into().resolve(), name)
    }

    /// Sets one attribute of the node at `id`.
    pub fn set_attr(
        &mut self,
        id: impl Into<NodePath>,
        name: &str,
        value: impl Into<AttrValue>,
    ) -> Result<()> {
        self.backend.set_attr(&id.into().resolve(), name, value.into())
    }

    /// The backend, for its native API.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable access to the backend.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Unwraps the backend.
    pub fn into_backend(self) -> B {
        self.backend
    }
}
