use std::borrow::Cow;

use crate::error::Result;
use crate::format::ChildRef;

/// Execution configuration for a specific node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JobConfig {
    /// Compression algorithm ID for the chunk body.
    /// 0 = No Compression (Default)
    /// 1 = Lz4 (if feature enabled)
    pub compression_id: u8,
}

/// A unit of work: one tree node that knows how to turn itself into a chunk.
///
/// # Lifetimes
/// * `'a`: The lifetime of the tree being written. Jobs borrow node data instead
///   of copying it.
pub trait SerializationJob<'a>: Send + Sync {
    /// Encodes the chunk header. `children` are the already written child chunks,
    /// in the order the node registered them.
    fn header(&self, children: &[ChildRef]) -> Result<Vec<u8>>;

    /// The uncompressed chunk body.
    fn body(&self) -> Result<Cow<'a, [u8]>>;

    /// Whether the chunk is a group (carries a children table).
    fn is_group(&self) -> bool;

    /// Returns the specific configuration for this job.
    fn config(&self) -> JobConfig {
        JobConfig::default()
    }
}

impl<'a> std::fmt::Debug for Box<dyn SerializationJob<'a> + 'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SerializationJob(group={}, algo={})",
            self.is_group(),
            self.config().compression_id
        )
    }
}
