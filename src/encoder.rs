//! The recursive write side.
//!
//! A write runs in two passes. The first walks the whole value without touching
//! the backend and rejects anything that could not be written completely
//! (unsupported kinds, unusable mapping keys, excessive nesting). Only then is the
//! target path checked for collisions and the tree written depth-first, one node
//! per atomic value or composite.

use std::collections::HashSet;
use tracing::trace;

use crate::constants::{KEY_ORIGIN_ATTR, ORIGINAL_TYPE_ATTR};
use crate::error::{NestcodeError, Result};
use crate::kind::{AtomicKind, CompositeKind, Kind, classify};
use crate::path::{NodePath, Segment};
use crate::store::{AttrValue, Backend, Payload, StorageOptions};
use crate::value::Value;

/// Writes `value` at `path`.
///
/// With `overwrite`, an existing node at `path` (and its whole subtree) is deleted
/// first; without it an existing node is a `PathCollision`. Validation happens
/// before either, so a rejected value leaves the container untouched.
pub(crate) fn write<B: Backend + ?Sized>(
    backend: &mut B,
    path: &NodePath,
    value: &Value,
    overwrite: bool,
    options: &StorageOptions,
    max_depth: usize,
) -> Result<()> {
    let key = path.resolve();
    if key.split('/').all(str::is_empty) {
        return Err(NestcodeError::InvalidArgument(
            "cannot write to the root group".into(),
        ));
    }
    validate(path, value, 0, max_depth)?;

    if backend.exists(&key) {
        if !overwrite {
            return Err(NestcodeError::PathCollision { path: key });
        }
        trace!(path = %key, "deleting existing subtree");
        backend.delete(&key)?;
    }

    let mut encoder = Encoder { backend, options };
    encoder.write_node(path, value)
}

/// Checks that every node of `value` can be written.
fn validate(path: &NodePath, value: &Value, depth: usize, max_depth: usize) -> Result<()> {
    let kind = match classify(value) {
        Kind::Unsupported => {
            return Err(NestcodeError::UnsupportedType {
                path: path.resolve(),
                type_name: value.type_name().to_owned(),
            });
        }
        Kind::Atomic(_) => return Ok(()),
        Kind::Composite(kind) => kind,
    };
    if depth >= max_depth {
        return Err(NestcodeError::DepthLimit {
            path: path.resolve(),
            limit: max_depth,
        });
    }

    match (kind, value) {
        (CompositeKind::Dict, Value::Dict(dict)) => {
            let mut seen = HashSet::with_capacity(dict.len());
            for (k, v) in dict.iter() {
                let segment = key_segment(path, k)?;
                if !seen.insert(segment.text().to_owned()) {
                    return Err(NestcodeError::InvalidKey {
                        path: path.resolve(),
                        key: format!("{} (duplicate key text)", segment.text()),
                    });
                }
                validate(&path.child(segment), v, depth + 1, max_depth)?;
            }
        }
        (_, other) => {
            for (i, item) in other.as_slice().unwrap_or_default().iter().enumerate() {
                validate(&path.child(Segment::index(i)), item, depth + 1, max_depth)?;
            }
        }
    }
    Ok(())
}

/// The path segment a mapping key is stored under.
fn key_segment(parent: &NodePath, key: &Value) -> Result<Segment> {
    let invalid = |reason: &str| NestcodeError::InvalidKey {
        path: parent.resolve(),
        key: format!("{key} ({reason})"),
    };
    let segment = Segment::from_key(key).ok_or_else(|| invalid(key.type_name()))?;
    if segment.text().is_empty() {
        return Err(invalid("empty"));
    }
    if segment.text().contains('/') {
        return Err(invalid("contains '/'"));
    }
    Ok(segment)
}

struct Encoder<'b, B: Backend + ?Sized> {
    backend: &'b mut B,
    options: &'b StorageOptions,
}

impl<B: Backend + ?Sized> Encoder<'_, B> {
    fn write_node(&mut self, path: &NodePath, value: &Value) -> Result<()> {
        let key = path.resolve();
        match classify(value) {
            Kind::Atomic(kind) => {
                let payload = leaf_payload(value, kind, &key)?;
                self.backend.create_dataset(&key, payload, self.options)?;
                self.tag(&key, value, path)?;
                trace!(path = %key, original_type = value.type_name(), "wrote dataset");
            }
            Kind::Composite(_) => {
                self.backend.create_group(&key)?;
                self.tag(&key, value, path)?;
                trace!(path = %key, original_type = value.type_name(), "wrote group");
                self.write_children(path, value)?;
            }
            Kind::Unsupported => {
                return Err(NestcodeError::UnsupportedType {
                    path: key,
                    type_name: value.type_name().to_owned(),
                });
            }
        }
        Ok(())
    }

    fn write_children(&mut self, path: &NodePath, value: &Value) -> Result<()> {
        match value {
            Value::Dict(dict) => {
                for (k, v) in dict.iter() {
                    let child = path.child(key_segment(path, k)?);
                    self.write_node(&child, v)?;
                }
            }
            Value::List(items) => self.write_sequence(path, items)?,
            Value::Tuple(items) => self.write_sequence(path, items)?,
            _ => {}
        }
        Ok(())
    }

    fn write_sequence(&mut self, path: &NodePath, items: &[Value]) -> Result<()> {
        for (i, item) in items.iter().enumerate() {
            self.write_node(&path.child(Segment::index(i)), item)?;
        }
        Ok(())
    }

    fn tag(&mut self, key: &str, value: &Value, path: &NodePath) -> Result<()> {
        self.backend
            .set_attr(key, ORIGINAL_TYPE_ATTR, AttrValue::from(value.type_name()))?;
        self.backend
            .set_attr(key, KEY_ORIGIN_ATTR, AttrValue::from(path.key_origin()))
    }
}

/// The dataset payload of an atomic value.
fn leaf_payload(value: &Value, kind: AtomicKind, key: &str) -> Result<Payload> {
    Ok(match value {
        Value::Bool(v) | Value::NpBool(v) => Payload::scalar(*v),
        Value::Int(v) | Value::Int64(v) => Payload::scalar(*v),
        Value::Float(v) | Value::Float64(v) => Payload::scalar(*v),
        Value::Str(s) => Payload::text(s),
        Value::Int8(v) => Payload::scalar(*v),
        Value::Int16(v) => Payload::scalar(*v),
        Value::Int32(v) => Payload::scalar(*v),
        Value::UInt8(v) => Payload::scalar(*v),
        Value::UInt16(v) => Payload::scalar(*v),
        Value::UInt32(v) => Payload::scalar(*v),
        Value::UInt64(v) => Payload::scalar(*v),
        Value::Float32(v) => Payload::scalar(*v),
        Value::Complex64(v) => Payload::scalar(*v),
        Value::Complex128(v) => Payload::scalar(*v),
        Value::Array(a) => Payload::array(a),
        _ => {
            return Err(NestcodeError::Internal(format!(
                "'{key}' classified as {} but is a {}",
                kind.name(),
                value.type_name()
            )));
        }
    })
}
