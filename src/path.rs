//! Hierarchical identifiers.
//!
//! A [`NodePath`] is always a non-empty, ordered list of [`Segment`]s. Top-level
//! calls usually pass a bare name; the encoder and decoder derive child paths with
//! [`NodePath::child`]. Each segment remembers which kind of key produced it, so the
//! node it addresses can record a `key_origin` tag.

use std::fmt;

use crate::error::{NestcodeError, Result};
use crate::kind::{AtomicKind, classify, Kind};
use crate::value::Value;

/// Origin recorded for segments built from text.
pub const STR_ORIGIN: &str = "str";

/// One step of a path: its text plus the kind of key it was built from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Segment {
    text: String,
    origin: &'static str,
}

impl Segment {
    /// Segment from text; origin `str`.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            origin: STR_ORIGIN,
        }
    }

    /// Segment for a sequence position; origin `int`.
    pub fn index(index: usize) -> Self {
        Self {
            text: index.to_string(),
            origin: AtomicKind::Int.name(),
        }
    }

    /// Segment from a scalar mapping key. `None` for non-scalar values.
    pub fn from_key(key: &Value) -> Option<Self> {
        match classify(key) {
            Kind::Atomic(AtomicKind::Str) => Some(Self::new(key.to_string())),
            Kind::Atomic(kind) if key.is_scalar() => Some(Self {
                text: key.to_string(),
                origin: kind.name(),
            }),
            _ => None,
        }
    }

    /// Stored text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Key origin tag text.
    pub fn origin(&self) -> &'static str {
        self.origin
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<&str> for Segment {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Segment {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl From<&String> for Segment {
    fn from(text: &String) -> Self {
        Self::new(text.as_str())
    }
}

macro_rules! impl_segment_from_scalar {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<$t> for Segment {
                fn from(v: $t) -> Self {
                    let key = Value::from(v);
                    Self {
                        text: key.to_string(),
                        origin: key.type_name(),
                    }
                }
            }
        )*
    }
}

impl_segment_from_scalar!(bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

/// Canonical address of a node: one or more segments joined by `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodePath {
    segments: Vec<Segment>,
}

impl NodePath {
    /// Path of a single segment.
    pub fn new(segment: impl Into<Segment>) -> Self {
        Self {
            segments: vec![segment.into()],
        }
    }

    /// Path from a segment list. Fails on an empty list.
    pub fn from_segments<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<Segment>,
    {
        let segments: Vec<Segment> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(NestcodeError::InvalidArgument(
                "a path needs at least one segment".into(),
            ));
        }
        Ok(Self { segments })
    }

    /// The canonical key: segment texts joined by `/`.
    pub fn resolve(&self) -> String {
        let mut key = String::new();
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                key.push('/');
            }
            key.push_str(&seg.text);
        }
        key
    }

    /// This path extended by one segment.
    pub fn child(&self, segment: impl Into<Segment>) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend_from_slice(&self.segments);
        segments.push(segment.into());
        Self { segments }
    }

    /// Origin of the last segment; recorded as the node's `key_origin` tag.
    pub fn key_origin(&self) -> &'static str {
        self.last().origin
    }

    /// The last segment.
    pub fn last(&self) -> &Segment {
        // Non-empty by construction.
        &self.segments[self.segments.len() - 1]
    }

    /// All segments in order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.resolve())
    }
}

macro_rules! impl_path_from_segment {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<$t> for NodePath {
                fn from(segment: $t) -> Self {
                    Self::new(segment)
                }
            }
        )*
    }
}

impl_path_from_segment!(
    Segment, &str, String, &String, bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64,
);

impl From<&NodePath> for NodePath {
    fn from(path: &NodePath) -> Self {
        path.clone()
    }
}

impl<A: Into<Segment>, B: Into<Segment>> From<(A, B)> for NodePath {
    fn from((a, b): (A, B)) -> Self {
        Self::new(a).child(b)
    }
}

impl<A: Into<Segment>, B: Into<Segment>, C: Into<Segment>> From<(A, B, C)> for NodePath {
    fn from((a, b, c): (A, B, C)) -> Self {
        Self::new(a).child(b).child(c)
    }
}

impl TryFrom<Vec<Segment>> for NodePath {
    type Error = NestcodeError;

    fn try_from(segments: Vec<Segment>) -> Result<Self> {
        Self::from_segments(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_joins_segments_with_slashes() {
        let p = NodePath::from(("first", 10i64, "b"));
        assert_eq!(p.resolve(), "first/10/b");
        assert_eq!(NodePath::from("first/b").resolve(), "first/b");
    }

    #[test]
    fn child_appends_and_tracks_origin() {
        let root = NodePath::from("first");
        assert_eq!(root.key_origin(), "str");
        let item = root.child(Segment::index(3));
        assert_eq!(item.resolve(), "first/3");
        assert_eq!(item.key_origin(), "int");
        let nested = item.child(7u8);
        assert_eq!(nested.segments().len(), 3);
        assert_eq!(nested.key_origin(), "uint8");
    }

    #[test]
    fn bare_scalar_identifier_records_its_type() {
        assert_eq!(NodePath::from(29i32).key_origin(), "int32");
        assert_eq!(NodePath::from(2.5f64).resolve(), "2.5");
    }

    #[test]
    fn keys_become_segments() {
        let s = Segment::from_key(&Value::Bool(true)).unwrap();
        assert_eq!((s.text(), s.origin()), ("True", "bool"));
        assert_eq!(Segment::from_key(&Value::from("k")).unwrap().origin(), "str");
        assert!(Segment::from_key(&Value::list([])).is_none());
        assert!(Segment::from_key(&Value::None).is_none());
    }

    #[test]
    fn empty_segment_list_is_rejected() {
        assert!(NodePath::try_from(Vec::new()).is_err());
    }
}
