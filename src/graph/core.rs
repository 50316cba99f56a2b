use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::id::ChunkId;
use super::job::SerializationJob;
use crate::error::{NestcodeError, Result};
use crate::format::ChildRef;

/// Where a task's chunk goes in its parent's children table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentSlot {
    /// The parent group's task.
    pub parent: ChunkId,
    /// Index in the parent's children table.
    pub slot: usize,
}

/// One pending chunk write.
#[derive(Debug)]
pub struct Task<'a> {
    /// Identifier, equal to the task's index in the graph.
    pub id: ChunkId,
    /// `None` only for the root group.
    pub parent: Option<ParentSlot>,
    /// The job producing the chunk.
    pub job: Box<dyn SerializationJob<'a> + 'a>,
    /// Children that have not been written yet.
    outstanding: AtomicUsize,
    /// Children table, filled in as children land on disk.
    written: Mutex<Vec<Option<ChildRef>>>,
}

impl<'a> Task<'a> {
    /// True when no child is outstanding, i.e. the task can run right away.
    pub fn is_ready(&self) -> bool {
        self.outstanding.load(Ordering::SeqCst) == 0
    }

    /// Records that the child in `slot` was written at `child_ref`.
    ///
    /// Returns `true` for the call that completes the table; exactly one caller sees
    /// it and is responsible for scheduling this task.
    pub fn child_written(&self, slot: usize, child_ref: ChildRef) -> Result<bool> {
        {
            let mut table = self.written.lock().map_err(|_| self.poisoned())?;
            let entry = table.get_mut(slot).ok_or_else(|| {
                NestcodeError::Internal(format!("Slot {slot} out of bounds for task {}", self.id))
            })?;
            *entry = Some(child_ref);
        }
        Ok(self.outstanding.fetch_sub(1, Ordering::SeqCst) == 1)
    }

    /// Takes the completed children table.
    pub fn children_table(&self) -> Result<Vec<ChildRef>> {
        let mut table = self.written.lock().map_err(|_| self.poisoned())?;
        std::mem::take(&mut *table)
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| {
                NestcodeError::Internal(format!("Task {} ran with unwritten children", self.id))
            })
    }

    fn poisoned(&self) -> NestcodeError {
        NestcodeError::Internal(format!("Children table of task {} poisoned", self.id))
    }
}

/// All tasks of one flush, in the order the tree was visited. The lifetime `'a`
/// is the borrow of the tree being written.
#[derive(Debug, Default)]
pub struct TaskGraph<'a> {
    tasks: Vec<Task<'a>>,
}

impl<'a> TaskGraph<'a> {
    /// An empty graph.
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    /// Adds a task and, if `parent` is given, appends it to the parent's children
    /// table. Children therefore keep the order in which they were added.
    pub fn add(
        &mut self,
        job: Box<dyn SerializationJob<'a> + 'a>,
        parent: Option<ChunkId>,
    ) -> Result<ChunkId> {
        let id = u32::try_from(self.tasks.len())
            .map(ChunkId::new)
            .map_err(|_| NestcodeError::Internal("Too many nodes in one container".into()))?;

        let parent = match parent {
            Some(parent_id) => {
                let parent = self.tasks.get_mut(parent_id.index()).ok_or_else(|| {
                    NestcodeError::Internal(format!("Parent task {parent_id} not found"))
                })?;
                let table = parent
                    .written
                    .get_mut()
                    .map_err(|_| NestcodeError::Internal("Children table poisoned".into()))?;
                table.push(None);
                *parent.outstanding.get_mut() += 1;
                Some(ParentSlot {
                    parent: parent_id,
                    slot: table.len() - 1,
                })
            }
            None => None,
        };

        self.tasks.push(Task {
            id,
            parent,
            job,
            outstanding: AtomicUsize::new(0),
            written: Mutex::new(Vec::new()),
        });
        Ok(id)
    }

    /// Looks up a task.
    pub fn task(&self, id: ChunkId) -> Result<&Task<'a>> {
        self.tasks
            .get(id.index())
            .ok_or_else(|| NestcodeError::Internal(format!("Task {id} out of bounds")))
    }

    /// Tasks that have no children to wait for.
    pub fn ready(&self) -> impl Iterator<Item = &Task<'a>> {
        self.tasks.iter().filter(|t| t.is_ready())
    }

    /// Number of tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// True if nothing was added.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::JobConfig;
    use std::borrow::Cow;

    struct Dummy(bool);

    impl<'a> SerializationJob<'a> for Dummy {
        fn header(&self, _children: &[ChildRef]) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }
        fn body(&self) -> Result<Cow<'a, [u8]>> {
            Ok(Cow::Borrowed(&[]))
        }
        fn is_group(&self) -> bool {
            self.0
        }
        fn config(&self) -> JobConfig {
            JobConfig::default()
        }
    }

    #[test]
    fn last_child_completes_the_parent() {
        let mut graph = TaskGraph::new();
        let root = graph.add(Box::new(Dummy(true)), None).unwrap();
        let a = graph.add(Box::new(Dummy(false)), Some(root)).unwrap();
        let b = graph.add(Box::new(Dummy(false)), Some(root)).unwrap();

        let ready: Vec<ChunkId> = graph.ready().map(|t| t.id).collect();
        assert_eq!(ready, vec![a, b]);
        assert_eq!(graph.task(b).unwrap().parent.unwrap().slot, 1);

        let parent = graph.task(root).unwrap();
        let second = ChildRef { offset: 10, length: 5 };
        let first = ChildRef { offset: 0, length: 10 };
        assert!(!parent.child_written(1, second).unwrap());
        assert!(parent.child_written(0, first).unwrap());
        assert_eq!(parent.children_table().unwrap(), vec![first, second]);
    }
}
