//! Task representation, metadata and task observers.

use std::fmt;
use std::panic::Location;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// A unit of deferred work.
pub type Closure = Box<dyn FnOnce() + Send + 'static>;

/// Metadata describing a posted task.
///
/// Observers and time domains only ever see the metadata; the closure itself
/// is consumed when the task runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskMetadata {
    /// Source location the task was posted from.
    pub posted_from: &'static Location<'static>,
    /// Monotonically increasing post order. Used for ordering checks and
    /// diagnostics, never as a priority.
    pub sequence_number: u64,
    /// Whether the task may run inside a nested run loop.
    pub nestable: bool,
    /// Time at which a delayed task becomes ready, if it was delayed.
    pub delayed_run_time: Option<Instant>,
}

/// A schedulable task with metadata and closure.
pub struct Task {
    /// Metadata driving scheduling decisions.
    pub meta: TaskMetadata,
    closure: Closure,
}

impl Task {
    pub(crate) fn new(meta: TaskMetadata, closure: Closure) -> Self {
        Self { meta, closure }
    }

    /// Run the task, consuming it.
    pub fn run(self) {
        (self.closure)();
    }

    /// Split the task into its metadata and closure.
    pub fn into_parts(self) -> (TaskMetadata, Closure) {
        (self.meta, self.closure)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").field("meta", &self.meta).finish_non_exhaustive()
    }
}

/// Observer notified around every executed task on queues that opted in.
pub trait TaskObserver: Send + Sync {
    /// Called right before the task runs.
    fn will_process_task(&self, task: &TaskMetadata);
    /// Called after the task returned, unless the task destroyed the manager.
    fn did_process_task(&self, task: &TaskMetadata);
}

/// Source of task sequence numbers, shared by every queue of a manager.
#[derive(Debug, Default)]
pub(crate) struct SequenceNumberGenerator {
    next: AtomicU64,
}

impl SequenceNumberGenerator {
    pub(crate) fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}
