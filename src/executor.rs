//! The parallel bottom-up writer.
//!
//! Ready tasks (datasets and empty groups) start first; a group is scheduled by
//! whichever of its children is written last, so there is no central polling loop.
//! Chunk encoding and compression run on Rayon workers. Only the final append to
//! the sink is serialized.

use std::io::Write;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::trace;

use crate::compression::CompressorRegistry;
use crate::error::{NestcodeError, Result};
use crate::format::{ChildRef, MetaByte};
use crate::graph::{Task, TaskGraph};
use crate::io::SeqWriter;

/// State shared by the workers of one flush.
struct Run<'g, 'a, W: Write + Send> {
    graph: &'g TaskGraph<'a>,
    writer: &'g SeqWriter<W>,
    registry: &'g CompressorRegistry,
    failed: AtomicBool,
    first_error: Mutex<Option<NestcodeError>>,
    root: Mutex<Option<ChildRef>>,
}

impl<'g, 'a, W: Write + Send> Run<'g, 'a, W> {
    /// Keeps the first error and stops new work from starting.
    fn fail(&self, err: NestcodeError) {
        let mut slot = self.first_error.lock().unwrap_or_else(|p| p.into_inner());
        if slot.is_none() {
            *slot = Some(err);
        }
        self.failed.store(true, Ordering::SeqCst);
    }

    /// Writes `task` and hands its location to the parent. Returns the parent
    /// task when this write completed it.
    fn write_task(&self, task: &Task<'a>) -> Result<Option<&'g Task<'a>>> {
        let chunk = build_chunk(task, self.registry)?;
        let offset = self.writer.write_all(&chunk)?;
        let written = ChildRef {
            offset,
            length: chunk.len() as u64,
        };
        trace!(task = %task.id, offset, length = written.length, "chunk written");

        match task.parent {
            Some(link) => {
                let parent = self.graph.task(link.parent)?;
                Ok(parent.child_written(link.slot, written)?.then_some(parent))
            }
            None => {
                *self.root.lock().unwrap_or_else(|p| p.into_inner()) = Some(written);
                Ok(None)
            }
        }
    }

    fn finish(self) -> Result<ChildRef> {
        if let Some(err) = self.first_error.into_inner().unwrap_or_else(|p| p.into_inner()) {
            return Err(err);
        }
        self.root
            .into_inner()
            .unwrap_or_else(|p| p.into_inner())
            .ok_or_else(|| NestcodeError::Internal("Root chunk was never written".into()))
    }
}

/// Writes every task of `graph` to `writer`, children before parents.
///
/// Returns the location of the root chunk, which the caller records in the Global
/// Header.
pub fn execute_graph<W: Write + Send>(
    graph: &TaskGraph<'_>,
    writer: &SeqWriter<W>,
    registry: &CompressorRegistry,
) -> Result<ChildRef> {
    let run = Run {
        graph,
        writer,
        registry,
        failed: AtomicBool::new(false),
        first_error: Mutex::new(None),
        root: Mutex::new(None),
    };

    let ready: Vec<&Task<'_>> = graph.ready().collect();
    if ready.is_empty() {
        return Err(NestcodeError::Internal("Write graph has no ready tasks".into()));
    }

    rayon::scope(|s| {
        let run = &run;
        for task in ready {
            s.spawn(move |s| process(s, run, task));
        }
    });

    run.finish()
}

fn process<'s, 'a, W: Write + Send>(
    scope: &rayon::Scope<'s>,
    run: &'s Run<'s, 'a, W>,
    task: &'s Task<'a>,
) {
    if run.failed.load(Ordering::Relaxed) {
        return;
    }
    match run.write_task(task) {
        Ok(Some(parent)) => scope.spawn(move |s| process(s, run, parent)),
        Ok(None) => {}
        Err(e) => run.fail(e),
    }
}

/// Encodes one task into its final chunk bytes.
fn build_chunk(task: &Task<'_>, registry: &CompressorRegistry) -> Result<Vec<u8>> {
    let children = task.children_table()?;
    let header = task.job.header(&children)?;
    let body = task.job.body()?;

    // Group bodies are empty; only dataset payloads are compressed.
    let is_group = task.job.is_group();
    let compressor = registry.get(if is_group { 0 } else { task.job.config().compression_id })?;
    let compressed = compressor.compress(&body)?;

    let table_len = if is_group {
        children.len() * ChildRef::SIZE + 4
    } else {
        0
    };
    let mut chunk = Vec::with_capacity(header.len() + compressed.len() + table_len + 5);
    chunk.extend_from_slice(&header);
    chunk.extend_from_slice(&compressed);

    if is_group {
        for child in &children {
            chunk.extend_from_slice(&child.to_bytes());
        }
        let count = u32::try_from(children.len())
            .map_err(|_| NestcodeError::Format("Too many children in one group".into()))?;
        chunk.extend_from_slice(&count.to_le_bytes());
    }

    let header_len = u32::try_from(header.len())
        .map_err(|_| NestcodeError::Format("Chunk header too large".into()))?;
    chunk.extend_from_slice(&header_len.to_le_bytes());
    chunk.push(MetaByte::new(is_group, compressor.id()).as_u8());
    Ok(chunk)
}
