//! Dependency graph for the bottom-up container writer.
//!
//! Every group and dataset of a container becomes one [`Task`]; a group can only
//! be written once all of its children have been written and their locations are
//! known.

/// Defines [`TaskGraph`] and [`Task`].
pub mod core;
/// Defines the `ChunkId` type.
pub mod id;
/// Defines the `SerializationJob` trait and `JobConfig`.
pub mod job;

pub use core::{ParentSlot, Task, TaskGraph};
pub use id::ChunkId;
pub use job::{JobConfig, SerializationJob};
