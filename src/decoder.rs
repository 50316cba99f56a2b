//! The recursive read side.
//!
//! Tags written by the encoder drive reconstruction: atomic nodes become scalars,
//! strings or arrays (lazily referenced when asked to), composite nodes are rebuilt
//! from their children. Nodes without tags are passed through as raw backend
//! handles.

use crate::array::{DType, Element};
use crate::constants::{KEY_ORIGIN_ATTR, ORIGINAL_TYPE_ATTR};
use crate::error::{NestcodeError, Result};
use crate::kind::{AtomicKind, CompositeKind, TypeTag};
use crate::path::{NodePath, STR_ORIGIN};
use crate::store::{AttrValue, Backend, LazyArray, NodeKind};
use crate::value::{Dict, GroupRef, Value};

/// Reads the value stored at `path` together with its `key_origin` tag.
///
/// The origin is `None` for untagged nodes.
pub(crate) fn read<B: Backend + ?Sized>(
    backend: &B,
    path: &NodePath,
    lazy: bool,
    max_depth: usize,
) -> Result<(Value, Option<String>)> {
    let decoder = Decoder {
        backend,
        lazy,
        max_depth,
    };
    decoder.read_node(&path.resolve(), 0)
}

struct Decoder<'b, B: Backend + ?Sized> {
    backend: &'b B,
    lazy: bool,
    max_depth: usize,
}

impl<B: Backend + ?Sized> Decoder<'_, B> {
    fn read_node(&self, key: &str, depth: usize) -> Result<(Value, Option<String>)> {
        if !self.backend.exists(key) {
            return Err(NestcodeError::NotFound { path: key.into() });
        }
        let Some(tag) = self.backend.get_attr(key, ORIGINAL_TYPE_ATTR)? else {
            return Ok((self.passthrough(key)?, None));
        };
        let key_origin = self
            .backend
            .get_attr(key, KEY_ORIGIN_ATTR)?
            .map(|origin| origin.to_string());

        let tag = match &tag {
            AttrValue::Str(name) => TypeTag::from_name(name),
            _ => None,
        }
        .ok_or_else(|| NestcodeError::UnknownTypeTag {
            path: key.into(),
            tag: tag.to_string(),
        })?;

        let value = match tag {
            TypeTag::Atomic(kind) => self.read_atomic(key, kind)?,
            TypeTag::Composite(kind) => self.read_composite(key, kind, depth)?,
        };
        Ok((value, key_origin))
    }

    /// Untagged nodes: datasets as lazy references, groups as opaque handles.
    fn passthrough(&self, key: &str) -> Result<Value> {
        Ok(match self.backend.node_kind(key)? {
            NodeKind::Dataset => Value::Lazy(self.backend.dataset(key)?),
            NodeKind::Group => Value::Group(GroupRef::new(key.into(), self.backend.children(key)?)),
        })
    }

    fn read_atomic(&self, key: &str, kind: AtomicKind) -> Result<Value> {
        if self.backend.node_kind(key)? != NodeKind::Dataset {
            return Err(NestcodeError::Format(format!(
                "'{key}' is tagged {} but is a group",
                kind.name()
            )));
        }
        let dataset = self.backend.dataset(key)?;
        check_layout(key, kind, &dataset)?;

        match kind {
            AtomicKind::NdArray if self.lazy => Ok(Value::Lazy(dataset)),
            AtomicKind::NdArray => Ok(Value::Array(dataset.load()?)),
            AtomicKind::Str => Ok(Value::Str(dataset.load_payload()?.to_text()?)),
            _ => scalar_value(kind, &dataset.load_payload()?.bytes),
        }
    }

    fn read_composite(&self, key: &str, kind: CompositeKind, depth: usize) -> Result<Value> {
        if self.backend.node_kind(key)? != NodeKind::Group {
            return Err(NestcodeError::Format(format!(
                "'{key}' is tagged {} but is a dataset",
                kind.name()
            )));
        }
        if depth >= self.max_depth {
            return Err(NestcodeError::DepthLimit {
                path: key.into(),
                limit: self.max_depth,
            });
        }
        let names = self.backend.children(key)?;

        if kind == CompositeKind::Dict {
            let mut dict = Dict::new();
            for name in names {
                let child_key = child_key(key, &name);
                let (value, origin) = self.read_node(&child_key, depth + 1)?;
                dict.insert(rebuild_key(&child_key, &name, origin.as_deref())?, value);
            }
            return Ok(Value::Dict(dict));
        }

        let mut indexed = names
            .into_iter()
            .map(|name| match name.parse::<usize>() {
                Ok(i) => Ok((i, name)),
                Err(_) => Err(NestcodeError::Format(format!(
                    "'{key}' holds non-index child '{name}'"
                ))),
            })
            .collect::<Result<Vec<_>>>()?;
        // Backend order may be lexicographic ("10" before "2").
        indexed.sort_by_key(|(i, _)| *i);

        let mut items = Vec::with_capacity(indexed.len());
        for (_, name) in indexed {
            items.push(self.read_node(&child_key(key, &name), depth + 1)?.0);
        }
        Ok(match kind {
            CompositeKind::Tuple => Value::Tuple(items.into_boxed_slice()),
            _ => Value::List(items),
        })
    }
}

fn child_key(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_owned()
    } else {
        format!("{parent}/{name}")
    }
}

/// Recovers a mapping key from its stored text and the child's `key_origin`.
fn rebuild_key(child_key: &str, text: &str, origin: Option<&str>) -> Result<Value> {
    match origin {
        None | Some(STR_ORIGIN) => Ok(Value::Str(text.to_owned())),
        Some(origin) => AtomicKind::from_name(origin)
            .ok_or_else(|| NestcodeError::UnknownTypeTag {
                path: child_key.into(),
                tag: origin.into(),
            })?
            .parse_key(text),
    }
}

/// Checks that a dataset's dtype and shape agree with its tag.
fn check_layout(key: &str, kind: AtomicKind, dataset: &LazyArray) -> Result<()> {
    let ok = match kind.scalar_dtype() {
        Some(dtype) => dataset.dtype() == dtype && dataset.shape().is_empty(),
        None => dataset.dtype() != DType::Str,
    };
    if ok {
        Ok(())
    } else {
        Err(NestcodeError::Format(format!(
            "'{key}' is tagged {} but stores {} of shape {:?}",
            kind.name(),
            dataset.dtype(),
            dataset.shape()
        )))
    }
}

fn scalar_value(kind: AtomicKind, bytes: &[u8]) -> Result<Value> {
    fn one<T: Element>(bytes: &[u8]) -> Result<T> {
        if bytes.len() != T::DTYPE.size() {
            return Err(NestcodeError::Format(format!(
                "{} scalar needs {} bytes, found {}",
                T::DTYPE,
                T::DTYPE.size(),
                bytes.len()
            )));
        }
        Ok(T::read_le(bytes))
    }

    Ok(match kind {
        AtomicKind::Int => Value::Int(one(bytes)?),
        AtomicKind::Float => Value::Float(one(bytes)?),
        AtomicKind::Bool => Value::Bool(one(bytes)?),
        AtomicKind::Int8 => Value::Int8(one(bytes)?),
        AtomicKind::Int16 => Value::Int16(one(bytes)?),
        AtomicKind::Int32 => Value::Int32(one(bytes)?),
        AtomicKind::Int64 => Value::Int64(one(bytes)?),
        AtomicKind::UInt8 => Value::UInt8(one(bytes)?),
        AtomicKind::UInt16 => Value::UInt16(one(bytes)?),
        AtomicKind::UInt32 => Value::UInt32(one(bytes)?),
        AtomicKind::UInt64 => Value::UInt64(one(bytes)?),
        AtomicKind::Float32 => Value::Float32(one(bytes)?),
        AtomicKind::Float64 => Value::Float64(one(bytes)?),
        AtomicKind::NpBool => Value::NpBool(one(bytes)?),
        AtomicKind::Complex64 => Value::Complex64(one(bytes)?),
        AtomicKind::Complex128 => Value::Complex128(one(bytes)?),
        AtomicKind::Str | AtomicKind::NdArray => {
            return Err(NestcodeError::Internal(format!(
                "{} is not a scalar kind",
                kind.name()
            )));
        }
    })
}
