//! Time domains map task delays onto "ready" transitions.
//!
//! Each queue is bound to exactly one domain. The domain tracks the queues it
//! governs and when each of them next has a delayed task coming due, and
//! promotes due work when the manager asks it to.

use std::collections::BTreeMap;
use std::panic::Location;
use std::time::Instant;

use parking_lot::Mutex;

use super::manager::SchedulerHooks;
use super::task::TaskMetadata;
use super::task_queue::{QueueId, TaskQueue};
use crate::util::clock::{DefaultTickClock, TickClock};

/// Strategy object for delay semantics (wall clock, virtual, manual).
///
/// Implementations own a [`TimeDomainCore`] for the bookkeeping shared by all
/// domains and decide how time is read and how wake-ups are arranged.
pub trait TimeDomain: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Shared bookkeeping.
    fn core(&self) -> &TimeDomainCore;

    /// Current time in this domain.
    fn now(&self) -> Instant;

    /// Arrange for a scheduling pass no later than `run_time`.
    fn request_wakeup(&self, run_time: Instant);

    /// Called at the end of every pass. Returns true if advancing this domain
    /// would make more tasks ready right away, so that another pass should be
    /// scheduled immediately.
    fn maybe_advance_time(&self) -> bool;
}

struct CoreState {
    hooks: Option<SchedulerHooks>,
    queues: Vec<TaskQueue>,
    /// Pending wake-ups keyed by `(run_time, queue)`.
    delayed_wakeups: BTreeMap<(Instant, QueueId), TaskQueue>,
}

/// Bookkeeping every [`TimeDomain`] carries: the governed queues, their
/// pending wake-ups and the link to the manager once registered.
pub struct TimeDomainCore {
    state: Mutex<CoreState>,
}

impl TimeDomainCore {
    /// Empty core, not yet registered with a manager.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CoreState {
                hooks: None,
                queues: Vec::new(),
                delayed_wakeups: BTreeMap::new(),
            }),
        }
    }

    /// Manager hooks, present while the domain is registered.
    #[must_use]
    pub fn hooks(&self) -> Option<SchedulerHooks> {
        self.state.lock().hooks.clone()
    }

    /// Earliest pending wake-up.
    #[must_use]
    pub fn next_scheduled_run_time(&self) -> Option<Instant> {
        self.state.lock().delayed_wakeups.keys().next().map(|(run_time, _)| *run_time)
    }

    /// Number of queues bound to this domain.
    #[must_use]
    pub fn registered_queue_count(&self) -> usize {
        self.state.lock().queues.len()
    }

    pub(crate) fn attach(&self, hooks: SchedulerHooks) {
        self.state.lock().hooks = Some(hooks);
    }

    pub(crate) fn detach(&self) {
        let mut state = self.state.lock();
        state.hooks = None;
        state.queues.clear();
        state.delayed_wakeups.clear();
    }

    pub(crate) fn register_queue(&self, queue: &TaskQueue) {
        self.state.lock().queues.push(queue.clone());
    }

    pub(crate) fn unregister_queue(&self, queue: &TaskQueue) {
        let mut state = self.state.lock();
        state.queues.retain(|q| q != queue);
        let id = queue.id();
        state.delayed_wakeups.retain(|(_, queue_id), _| *queue_id != id);
    }

    /// Record a wake-up. Returns true if it became the earliest one.
    fn insert_wakeup(&self, queue: &TaskQueue, run_time: Instant) -> bool {
        let mut state = self.state.lock();
        let key = (run_time, queue.id());
        if state.delayed_wakeups.insert(key, queue.clone()).is_some() {
            return false;
        }
        state.delayed_wakeups.keys().next() == Some(&key)
    }

    /// Remove wake-ups due at `now`, returning each affected queue once.
    fn take_due_wakeups(&self, now: Instant) -> Vec<TaskQueue> {
        let mut state = self.state.lock();
        let mut due: Vec<TaskQueue> = Vec::new();
        while let Some(entry) = state.delayed_wakeups.first_entry() {
            if entry.key().0 > now {
                break;
            }
            let queue = entry.remove();
            if !due.contains(&queue) {
                due.push(queue);
            }
        }
        due
    }

    fn queues(&self) -> Vec<TaskQueue> {
        self.state.lock().queues.clone()
    }
}

impl Default for TimeDomainCore {
    fn default() -> Self {
        Self::new()
    }
}

/// Register a delayed wake-up for `queue`, asking the domain for a pass if it
/// is the earliest one.
pub(crate) fn schedule_delayed_work(domain: &dyn TimeDomain, queue: &TaskQueue, run_time: Instant) {
    if domain.core().insert_wakeup(queue, run_time) {
        domain.request_wakeup(run_time);
    }
}

/// Promote ready tasks on every queue governed by `domain`.
///
/// Due delayed tasks move to incoming first; queues are then pumped according
/// to their policy. `should_trigger_wakeup` and `previous_task` describe the
/// task that just completed, if any.
pub(crate) fn update_work_queues(domain: &dyn TimeDomain, should_trigger_wakeup: bool, previous_task: Option<&TaskMetadata>) {
    let now = domain.now();
    for queue in domain.core().take_due_wakeups(now) {
        if let Some(next) = queue.move_ready_delayed_tasks(now) {
            schedule_delayed_work(domain, &queue, next);
        }
    }
    for queue in domain.core().queues() {
        queue.update_work_queue(should_trigger_wakeup, previous_task);
    }
}

/// Wall-clock time domain, registered with every manager and used by queues
/// that do not name another domain.
///
/// Time is read from the manager's delegate once registered. Wake-ups are
/// delayed passes posted through the delegate.
pub struct RealTimeDomain {
    core: TimeDomainCore,
}

impl RealTimeDomain {
    /// New, unregistered real-time domain.
    #[must_use]
    pub fn new() -> Self {
        Self {
            core: TimeDomainCore::new(),
        }
    }
}

impl Default for RealTimeDomain {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeDomain for RealTimeDomain {
    fn name(&self) -> &'static str {
        "RealTimeDomain"
    }

    fn core(&self) -> &TimeDomainCore {
        &self.core
    }

    fn now(&self) -> Instant {
        self.core
            .hooks()
            .map_or_else(|| DefaultTickClock.now_ticks(), |hooks| hooks.now())
    }

    fn request_wakeup(&self, run_time: Instant) {
        if let Some(hooks) = self.core.hooks() {
            let now = hooks.now();
            hooks.schedule_delayed_work(Location::caller(), now, run_time.saturating_duration_since(now));
        }
    }

    fn maybe_advance_time(&self) -> bool {
        let Some(next_run_time) = self.core.next_scheduled_run_time() else {
            return false;
        };
        let now = self.now();
        if now >= next_run_time {
            // Already due: the caller posts an immediate continuation.
            return true;
        }
        self.request_wakeup(next_run_time);
        false
    }
}
