//! Single-threaded, nestable run loop that can drive a manager.
//!
//! The loop is driven explicitly by its owner: nothing runs until one of the
//! `run_*` methods is called on the owning thread. This makes it suitable
//! both for embedding in a hand-written event loop and for deterministic
//! tests.
//!
//! While a nested loop is active, non-nestable tasks stay queued (in order)
//! until control is back at the outermost level.

use std::cmp::Ordering as CmpOrdering;
use std::collections::{BinaryHeap, VecDeque};
use std::fmt;
use std::panic::Location;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::core::{Closure, TaskQueueManagerDelegate};
use crate::util::clock::{DefaultTickClock, TickClock};

struct PostedTask {
    posted_from: &'static Location<'static>,
    nestable: bool,
    closure: Closure,
}

struct DelayedPost {
    run_time: Instant,
    sequence: u64,
    task: PostedTask,
}

impl PartialEq for DelayedPost {
    fn eq(&self, other: &Self) -> bool {
        self.run_time == other.run_time && self.sequence == other.sequence
    }
}

impl Eq for DelayedPost {}

impl PartialOrd for DelayedPost {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for DelayedPost {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // Earliest first in a max-heap.
        other
            .run_time
            .cmp(&self.run_time)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

#[derive(Default)]
struct LoopState {
    immediate: VecDeque<PostedTask>,
    delayed: BinaryHeap<DelayedPost>,
    next_sequence: u64,
}

/// Decrements the nesting depth when a nested loop unwinds.
struct NestingGuard<'a> {
    depth: &'a AtomicUsize,
}

impl<'a> NestingGuard<'a> {
    fn enter(depth: &'a AtomicUsize) -> Self {
        depth.fetch_add(1, Ordering::AcqRel);
        Self { depth }
    }
}

impl Drop for NestingGuard<'_> {
    fn drop(&mut self) {
        self.depth.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Explicitly driven run loop implementing [`TaskQueueManagerDelegate`].
///
/// ```rust,ignore
/// let run_loop = RunLoop::new();
/// let manager = TaskQueueManager::new(run_loop.clone());
/// let queue = manager.new_task_queue(TaskQueueSpec::new("default"))?;
/// queue.post_task(|| println!("hello"))?;
/// run_loop.run_until_idle();
/// ```
pub struct RunLoop {
    owner: ThreadId,
    clock: Arc<dyn TickClock>,
    state: Mutex<LoopState>,
    nesting_depth: AtomicUsize,
    idle_notifications: AtomicUsize,
}

impl RunLoop {
    /// Loop owned by the calling thread, on the system clock.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Self::with_clock(Arc::new(DefaultTickClock))
    }

    /// Loop owned by the calling thread, reading time from `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn TickClock>) -> Arc<Self> {
        Arc::new(Self {
            owner: thread::current().id(),
            clock,
            state: Mutex::new(LoopState::default()),
            nesting_depth: AtomicUsize::new(0),
            idle_notifications: AtomicUsize::new(0),
        })
    }

    /// Clock the loop reads.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn TickClock> {
        &self.clock
    }

    /// Current nesting depth; zero at the outermost level.
    #[must_use]
    pub fn nesting_depth(&self) -> usize {
        self.nesting_depth.load(Ordering::Acquire)
    }

    /// Run the tasks runnable right now, but no more than were runnable when
    /// called. Tasks posted while running wait for the next call.
    pub fn run_pending_tasks(&self) -> usize {
        let budget = {
            let mut state = self.state.lock();
            self.promote_due_delayed(&mut state);
            let nested = self.nesting_depth() > 0;
            state
                .immediate
                .iter()
                .filter(|task| task.nestable || !nested)
                .count()
        };
        let mut ran = 0;
        while ran < budget && self.run_one() {
            ran += 1;
        }
        ran
    }

    /// Run tasks until none is runnable. Delayed tasks run once the clock
    /// reaches their run time.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.run_one() {
            ran += 1;
        }
        ran
    }

    /// Run `f` as if inside a nested run loop.
    pub fn run_nested<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = NestingGuard::enter(&self.nesting_depth);
        f()
    }

    /// Enter a nested loop and run until idle. Non-nestable tasks stay
    /// queued.
    pub fn run_nested_until_idle(&self) -> usize {
        self.run_nested(|| self.run_until_idle())
    }

    /// Immediate tasks waiting to run, including non-nestable ones held back
    /// by nesting.
    #[must_use]
    pub fn pending_task_count(&self) -> usize {
        self.state.lock().immediate.len()
    }

    /// Tasks waiting for their delay.
    #[must_use]
    pub fn delayed_task_count(&self) -> usize {
        self.state.lock().delayed.len()
    }

    /// Run time of the earliest delayed task.
    #[must_use]
    pub fn next_delayed_run_time(&self) -> Option<Instant> {
        self.state.lock().delayed.peek().map(|post| post.run_time)
    }

    /// How many times a manager reported it ran out of immediate work.
    #[must_use]
    pub fn idle_notification_count(&self) -> usize {
        self.idle_notifications.load(Ordering::Acquire)
    }

    fn push(&self, posted_from: &'static Location<'static>, closure: Closure, nestable: bool) {
        self.state.lock().immediate.push_back(PostedTask {
            posted_from,
            nestable,
            closure,
        });
    }

    fn promote_due_delayed(&self, state: &mut LoopState) {
        let now = self.clock.now_ticks();
        while state.delayed.peek().is_some_and(|post| post.run_time <= now) {
            if let Some(post) = state.delayed.pop() {
                state.immediate.push_back(post.task);
            }
        }
    }

    fn run_one(&self) -> bool {
        let task = {
            let mut state = self.state.lock();
            self.promote_due_delayed(&mut state);
            let nested = self.nesting_depth() > 0;
            let Some(index) = state.immediate.iter().position(|task| task.nestable || !nested) else {
                return false;
            };
            state.immediate.remove(index)
        };
        match task {
            Some(task) => {
                tracing::trace!(posted_from = %task.posted_from, "run loop task");
                (task.closure)();
                true
            }
            None => false,
        }
    }
}

impl TaskQueueManagerDelegate for RunLoop {
    fn post_task(&self, from: &'static Location<'static>, task: Closure) {
        self.push(from, task, true);
    }

    fn post_delayed_task(&self, from: &'static Location<'static>, task: Closure, delay: Duration) {
        if delay.is_zero() {
            self.push(from, task, true);
            return;
        }
        let run_time = self.clock.now_ticks() + delay;
        let mut state = self.state.lock();
        let sequence = state.next_sequence;
        state.next_sequence += 1;
        state.delayed.push(DelayedPost {
            run_time,
            sequence,
            task: PostedTask {
                posted_from: from,
                nestable: true,
                closure: task,
            },
        });
    }

    fn post_non_nestable_task(&self, from: &'static Location<'static>, task: Closure) {
        self.push(from, task, false);
    }

    fn belongs_to_current_thread(&self) -> bool {
        thread::current().id() == self.owner
    }

    fn runs_tasks_on_current_thread(&self) -> bool {
        self.belongs_to_current_thread()
    }

    fn is_nested(&self) -> bool {
        self.nesting_depth() > 0
    }

    fn on_no_more_immediate_work(&self) {
        self.idle_notifications.fetch_add(1, Ordering::AcqRel);
    }

    fn now_ticks(&self) -> Instant {
        self.clock.now_ticks()
    }
}

impl fmt::Debug for RunLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunLoop")
            .field("owner", &self.owner)
            .field("nesting_depth", &self.nesting_depth())
            .field("pending", &self.pending_task_count())
            .field("delayed", &self.delayed_task_count())
            .finish_non_exhaustive()
    }
}
