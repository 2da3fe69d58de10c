//! Task queues: ordered channels of deferred work plus the metadata that
//! controls how they take part in scheduling.
//!
//! A queue keeps three buffers:
//!
//! - **incoming**: producer-facing, appended to from any thread;
//! - **delayed**: tasks waiting for their run time, ordered by
//!   `(run_time, sequence_number)`;
//! - **work**: promoted, ready-to-run tasks, only touched on the owning thread.
//!
//! A task sits in exactly one of these buffers (or is executing). Tasks move
//! from delayed to incoming when their time domain says they are due, and
//! from incoming to work according to the queue's [`PumpPolicy`].

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::fmt;
use std::panic::Location;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::manager::SchedulerHooks;
use super::task::{Closure, Task, TaskMetadata, TaskObserver};
use super::time_domain::{self, TimeDomain};
use super::SchedulerError;

/// Scheduling priority of a queue. Higher priorities always win.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueuePriority {
    /// Runs only when nothing else is ready.
    BestEffort,
    /// Default priority.
    #[default]
    Normal,
    /// Latency-sensitive work.
    High,
    /// Scheduler control work; always first.
    Control,
}

impl QueuePriority {
    /// Number of priority classes.
    pub const COUNT: usize = 4;

    /// All priorities, highest first.
    pub const ALL: [Self; Self::COUNT] = [Self::Control, Self::High, Self::Normal, Self::BestEffort];

    /// Position in [`Self::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Control => 0,
            Self::High => 1,
            Self::Normal => 2,
            Self::BestEffort => 3,
        }
    }
}

/// Whether a completed task from this queue may pump queues that wait for
/// a wake-up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WakeupPolicy {
    /// Completed tasks may wake [`PumpPolicy::AfterWakeup`] queues.
    #[default]
    CanWakeOtherQueues,
    /// Completed tasks never wake other queues.
    Quiet,
}

/// When incoming tasks are promoted into the work buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PumpPolicy {
    /// Promote on every promotion pass.
    #[default]
    Auto,
    /// Promote only after a task from a waking queue completed.
    AfterWakeup,
    /// Promote only on an explicit [`TaskQueue::pump_queue`].
    Manual,
}

/// Stable identifier of a queue within its manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueueId(pub(crate) u64);

impl QueueId {
    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for QueueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

/// Creation parameters for [`TaskQueueManager::new_task_queue`].
///
/// [`TaskQueueManager::new_task_queue`]: crate::core::TaskQueueManager::new_task_queue
#[derive(Clone)]
pub struct TaskQueueSpec {
    /// Queue name, used in logs and errors.
    pub name: String,
    /// Initial priority.
    pub priority: QueuePriority,
    /// Initial enabled state.
    pub enabled: bool,
    /// Promotion policy.
    pub pump_policy: PumpPolicy,
    /// Wake-up policy for completed tasks.
    pub wakeup_policy: WakeupPolicy,
    /// Record runs of this queue for quiescence checks.
    pub should_monitor_quiescence: bool,
    /// Notify task observers around tasks from this queue.
    pub should_notify_observers: bool,
    /// Time domain governing delays. `None` selects the real-time domain.
    pub time_domain: Option<Arc<dyn TimeDomain>>,
}

impl TaskQueueSpec {
    /// Queue description with default policies.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            priority: QueuePriority::Normal,
            enabled: true,
            pump_policy: PumpPolicy::Auto,
            wakeup_policy: WakeupPolicy::CanWakeOtherQueues,
            should_monitor_quiescence: false,
            should_notify_observers: true,
            time_domain: None,
        }
    }

    /// Set the initial priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: QueuePriority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the initial enabled state.
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the pump policy.
    #[must_use]
    pub const fn with_pump_policy(mut self, policy: PumpPolicy) -> Self {
        self.pump_policy = policy;
        self
    }

    /// Set the wake-up policy.
    #[must_use]
    pub const fn with_wakeup_policy(mut self, policy: WakeupPolicy) -> Self {
        self.wakeup_policy = policy;
        self
    }

    /// Monitor this queue for quiescence.
    #[must_use]
    pub const fn with_should_monitor_quiescence(mut self, monitor: bool) -> Self {
        self.should_monitor_quiescence = monitor;
        self
    }

    /// Notify task observers for tasks from this queue.
    #[must_use]
    pub const fn with_should_notify_observers(mut self, notify: bool) -> Self {
        self.should_notify_observers = notify;
        self
    }

    /// Bind the queue to a specific time domain.
    #[must_use]
    pub fn with_time_domain(mut self, domain: Arc<dyn TimeDomain>) -> Self {
        self.time_domain = Some(domain);
        self
    }
}

impl fmt::Debug for TaskQueueSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueueSpec")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("enabled", &self.enabled)
            .field("pump_policy", &self.pump_policy)
            .field("wakeup_policy", &self.wakeup_policy)
            .field("should_monitor_quiescence", &self.should_monitor_quiescence)
            .field("should_notify_observers", &self.should_notify_observers)
            .field("time_domain", &self.time_domain.as_ref().map(|d| d.name()))
            .finish()
    }
}

/// Delayed task ordered by run time, then post order (earliest first in a
/// max-heap).
struct DelayedTask {
    run_time: Instant,
    task: Task,
}

impl PartialEq for DelayedTask {
    fn eq(&self, other: &Self) -> bool {
        self.run_time == other.run_time && self.task.meta.sequence_number == other.task.meta.sequence_number
    }
}

impl Eq for DelayedTask {}

impl PartialOrd for DelayedTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DelayedTask {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap.
        other
            .run_time
            .cmp(&self.run_time)
            .then_with(|| other.task.meta.sequence_number.cmp(&self.task.meta.sequence_number))
    }
}

/// State reachable from any thread.
struct AnyThread {
    /// Link back to the manager; `None` once unregistered.
    hooks: Option<SchedulerHooks>,
    time_domain: Option<Arc<dyn TimeDomain>>,
    pump_policy: PumpPolicy,
    incoming: VecDeque<Task>,
    delayed: BinaryHeap<DelayedTask>,
}

/// State only touched on the owning thread.
struct MainThread {
    work: VecDeque<Task>,
    task_observers: Vec<Arc<dyn TaskObserver>>,
}

struct QueueInner {
    id: QueueId,
    name: String,
    wakeup_policy: WakeupPolicy,
    should_monitor_quiescence: bool,
    should_notify_observers: bool,
    any_thread: Mutex<AnyThread>,
    main_thread: Mutex<MainThread>,
}

/// Shared handle to a task queue.
///
/// Handles stay valid after the queue is unregistered; every operation on a
/// stale handle is a no-op.
#[derive(Clone)]
pub struct TaskQueue {
    inner: Arc<QueueInner>,
}

impl TaskQueue {
    pub(crate) fn new(id: QueueId, spec: &TaskQueueSpec, hooks: SchedulerHooks, domain: Arc<dyn TimeDomain>) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                id,
                name: spec.name.clone(),
                wakeup_policy: spec.wakeup_policy,
                should_monitor_quiescence: spec.should_monitor_quiescence,
                should_notify_observers: spec.should_notify_observers,
                any_thread: Mutex::new(AnyThread {
                    hooks: Some(hooks),
                    time_domain: Some(domain),
                    pump_policy: spec.pump_policy,
                    incoming: VecDeque::new(),
                    delayed: BinaryHeap::new(),
                }),
                main_thread: Mutex::new(MainThread {
                    work: VecDeque::new(),
                    task_observers: Vec::new(),
                }),
            }),
        }
    }

    /// Queue identifier.
    #[must_use]
    pub fn id(&self) -> QueueId {
        self.inner.id
    }

    /// Queue name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Wake-up policy fixed at creation.
    #[must_use]
    pub fn wakeup_policy(&self) -> WakeupPolicy {
        self.inner.wakeup_policy
    }

    /// Whether runs from this queue count against quiescence.
    #[must_use]
    pub fn should_monitor_quiescence(&self) -> bool {
        self.inner.should_monitor_quiescence
    }

    /// Whether task observers hear about tasks from this queue.
    #[must_use]
    pub fn should_notify_observers(&self) -> bool {
        self.inner.should_notify_observers
    }

    /// Post a task. Callable from any thread.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::QueueUnregistered`] if the queue was
    /// unregistered; the task is dropped.
    #[track_caller]
    pub fn post_task<F>(&self, task: F) -> Result<(), SchedulerError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.post_task_impl(Location::caller(), Box::new(task), Duration::ZERO, true)
    }

    /// Post a task that must not run inside a nested run loop.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::QueueUnregistered`] if the queue was
    /// unregistered.
    #[track_caller]
    pub fn post_non_nestable_task<F>(&self, task: F) -> Result<(), SchedulerError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.post_task_impl(Location::caller(), Box::new(task), Duration::ZERO, false)
    }

    /// Post a task that becomes ready after `delay`, measured by the queue's
    /// time domain. A zero delay is an immediate post.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::QueueUnregistered`] if the queue was
    /// unregistered.
    #[track_caller]
    pub fn post_delayed_task<F>(&self, task: F, delay: Duration) -> Result<(), SchedulerError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.post_task_impl(Location::caller(), Box::new(task), delay, true)
    }

    fn post_task_impl(
        &self,
        from: &'static Location<'static>,
        closure: Closure,
        delay: Duration,
        nestable: bool,
    ) -> Result<(), SchedulerError> {
        let (hooks, domain) = self.registration().ok_or_else(|| self.unregistered_error())?;
        let sequence_number = hooks.next_sequence_number();

        if delay.is_zero() {
            let meta = TaskMetadata {
                posted_from: from,
                sequence_number,
                nestable,
                delayed_run_time: None,
            };
            let mut any = self.inner.any_thread.lock();
            if any.hooks.is_none() {
                return Err(self.unregistered_error());
            }
            let was_empty = any.incoming.is_empty();
            any.incoming.push_back(Task::new(meta, closure));
            let auto_pump = any.pump_policy == PumpPolicy::Auto;
            drop(any);
            // An empty incoming buffer means no pass is pending on our behalf.
            if was_empty && auto_pump {
                hooks.schedule_immediate_work(from);
            }
            return Ok(());
        }

        let run_time = domain.now() + delay;
        let meta = TaskMetadata {
            posted_from: from,
            sequence_number,
            nestable,
            delayed_run_time: Some(run_time),
        };
        {
            let mut any = self.inner.any_thread.lock();
            if any.hooks.is_none() {
                return Err(self.unregistered_error());
            }
            any.delayed.push(DelayedTask {
                run_time,
                task: Task::new(meta, closure),
            });
        }
        time_domain::schedule_delayed_work(domain.as_ref(), self, run_time);
        Ok(())
    }

    /// Enable or disable the queue. Re-enabling a queue that has work
    /// schedules a pass.
    pub fn set_queue_enabled(&self, enabled: bool) {
        if let Some(hooks) = self.hooks() {
            hooks.set_queue_enabled(self, enabled);
        }
    }

    /// Whether the selector may service this queue. Always false once
    /// unregistered.
    #[must_use]
    pub fn is_queue_enabled(&self) -> bool {
        self.hooks().is_some_and(|hooks| hooks.is_queue_enabled(self))
    }

    /// Change the queue's priority.
    pub fn set_queue_priority(&self, priority: QueuePriority) {
        if let Some(hooks) = self.hooks() {
            hooks.set_queue_priority(self, priority);
        }
    }

    /// Current priority, or `None` once unregistered.
    #[must_use]
    pub fn queue_priority(&self) -> Option<QueuePriority> {
        self.hooks().and_then(|hooks| hooks.queue_priority(self))
    }

    /// Current pump policy.
    #[must_use]
    pub fn pump_policy(&self) -> PumpPolicy {
        self.inner.any_thread.lock().pump_policy
    }

    /// Change the pump policy. Switching to [`PumpPolicy::Auto`] pumps any
    /// waiting incoming tasks right away.
    #[track_caller]
    pub fn set_pump_policy(&self, policy: PumpPolicy) {
        let pump_now = {
            let mut any = self.inner.any_thread.lock();
            let previous = std::mem::replace(&mut any.pump_policy, policy);
            previous != PumpPolicy::Auto && policy == PumpPolicy::Auto && !any.incoming.is_empty()
        };
        if !pump_now {
            return;
        }
        let Some((hooks, domain)) = self.registration() else {
            return;
        };
        self.pump_registered(&hooks, domain.as_ref(), Location::caller());
    }

    /// Promote every incoming task, and every due delayed task, into the work
    /// buffer, scheduling a pass if work is ready.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::QueueUnregistered`] if the queue was
    /// unregistered.
    #[track_caller]
    pub fn pump_queue(&self) -> Result<(), SchedulerError> {
        let (hooks, domain) = self.registration().ok_or_else(|| self.unregistered_error())?;
        self.pump_registered(&hooks, domain.as_ref(), Location::caller());
        Ok(())
    }

    fn pump_registered(&self, hooks: &SchedulerHooks, domain: &dyn TimeDomain, from: &'static Location<'static>) {
        if let Some(next) = self.move_ready_delayed_tasks(domain.now()) {
            time_domain::schedule_delayed_work(domain, self, next);
        }
        let moved = std::mem::take(&mut self.inner.any_thread.lock().incoming);
        let has_work = {
            let mut main = self.inner.main_thread.lock();
            main.work.extend(moved);
            !main.work.is_empty()
        };
        if has_work {
            hooks.schedule_immediate_work(from);
        }
    }

    /// Unregister this queue from its manager. Undrained tasks never run.
    pub fn unregister_task_queue(&self) {
        if let Some(hooks) = self.hooks() {
            hooks.unregister_task_queue(self);
        }
    }

    /// True while the queue is registered with a live manager.
    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.inner.any_thread.lock().hooks.is_some()
    }

    /// True if the manager's delegate runs tasks on the calling thread.
    #[must_use]
    pub fn runs_tasks_on_current_thread(&self) -> bool {
        self.hooks().is_some_and(|hooks| hooks.runs_tasks_on_current_thread())
    }

    /// Time domain this queue is bound to, if still registered.
    #[must_use]
    pub fn time_domain(&self) -> Option<Arc<dyn TimeDomain>> {
        self.inner.any_thread.lock().time_domain.clone()
    }

    /// Add an observer notified around this queue's tasks.
    pub fn add_task_observer(&self, observer: Arc<dyn TaskObserver>) {
        self.inner.main_thread.lock().task_observers.push(observer);
    }

    /// Remove a previously added observer.
    pub fn remove_task_observer(&self, observer: &Arc<dyn TaskObserver>) {
        self.inner
            .main_thread
            .lock()
            .task_observers
            .retain(|o| !Arc::ptr_eq(o, observer));
    }

    /// True if the work buffer holds ready tasks.
    #[must_use]
    pub fn has_work(&self) -> bool {
        !self.inner.main_thread.lock().work.is_empty()
    }

    /// True if there are ready or incoming tasks.
    #[must_use]
    pub fn has_pending_immediate_work(&self) -> bool {
        if self.has_work() {
            return true;
        }
        !self.inner.any_thread.lock().incoming.is_empty()
    }

    /// True if all buffers are empty.
    #[must_use]
    pub fn is_queue_empty(&self) -> bool {
        if self.has_work() {
            return false;
        }
        let any = self.inner.any_thread.lock();
        any.incoming.is_empty() && any.delayed.is_empty()
    }

    /// Number of tasks waiting for their delay to expire.
    #[must_use]
    pub fn delayed_task_count(&self) -> usize {
        self.inner.any_thread.lock().delayed.len()
    }

    /// Run time of the earliest delayed task.
    #[must_use]
    pub fn next_delayed_run_time(&self) -> Option<Instant> {
        self.inner.any_thread.lock().delayed.peek().map(|d| d.run_time)
    }

    // ---------------------------------------------------------------------
    // Manager / time-domain side
    // ---------------------------------------------------------------------

    fn hooks(&self) -> Option<SchedulerHooks> {
        self.inner.any_thread.lock().hooks.clone()
    }

    fn registration(&self) -> Option<(SchedulerHooks, Arc<dyn TimeDomain>)> {
        let any = self.inner.any_thread.lock();
        match (&any.hooks, &any.time_domain) {
            (Some(hooks), Some(domain)) => Some((hooks.clone(), Arc::clone(domain))),
            _ => None,
        }
    }

    fn unregistered_error(&self) -> SchedulerError {
        trace!(queue = %self.inner.name, "operation on unregistered queue ignored");
        SchedulerError::QueueUnregistered(self.inner.name.clone())
    }

    /// Move delayed tasks due at `now` into incoming. Returns the run time of
    /// the next delayed task still waiting.
    pub(crate) fn move_ready_delayed_tasks(&self, now: Instant) -> Option<Instant> {
        let mut any = self.inner.any_thread.lock();
        while any.delayed.peek().is_some_and(|d| d.run_time <= now) {
            if let Some(ready) = any.delayed.pop() {
                any.incoming.push_back(ready.task);
            }
        }
        any.delayed.peek().map(|d| d.run_time)
    }

    /// Promote incoming tasks into the work buffer if the pump policy allows.
    ///
    /// `should_trigger_wakeup` is true only when called after a completed task
    /// from a queue allowed to wake others; `previous_task` is that task.
    pub(crate) fn update_work_queue(&self, should_trigger_wakeup: bool, previous_task: Option<&TaskMetadata>) {
        let moved = {
            let mut any = self.inner.any_thread.lock();
            if !Self::should_auto_pump(&any, should_trigger_wakeup, previous_task) {
                return;
            }
            std::mem::take(&mut any.incoming)
        };
        self.inner.main_thread.lock().work.extend(moved);
    }

    fn should_auto_pump(any: &AnyThread, should_trigger_wakeup: bool, previous_task: Option<&TaskMetadata>) -> bool {
        if any.incoming.is_empty() {
            return false;
        }
        match any.pump_policy {
            PumpPolicy::Auto => true,
            PumpPolicy::Manual => false,
            PumpPolicy::AfterWakeup => {
                should_trigger_wakeup && !Self::task_is_older_than_queued_tasks(any, previous_task)
            }
        }
    }

    /// A wake-up only pumps tasks that were queued before the waking task
    /// ran; with no waking task there is nothing to pump.
    fn task_is_older_than_queued_tasks(any: &AnyThread, task: Option<&TaskMetadata>) -> bool {
        let Some(task) = task else {
            return true;
        };
        any.incoming
            .front()
            .is_some_and(|oldest| task.sequence_number < oldest.meta.sequence_number)
    }

    /// Remove and return the head of the work buffer.
    ///
    /// # Panics
    ///
    /// Panics if the work buffer is empty; callers select only queues with
    /// work.
    pub(crate) fn take_front(&self) -> Task {
        let task = self.inner.main_thread.lock().work.pop_front();
        task.unwrap_or_else(|| panic!("take_front on empty work queue `{}`", self.inner.name))
    }

    pub(crate) fn notify_will_process_task(&self, task: &TaskMetadata) {
        let observers = self.inner.main_thread.lock().task_observers.clone();
        for observer in &observers {
            observer.will_process_task(task);
        }
    }

    pub(crate) fn notify_did_process_task(&self, task: &TaskMetadata) {
        let observers = self.inner.main_thread.lock().task_observers.clone();
        for observer in &observers {
            observer.did_process_task(task);
        }
    }

    /// Cut the link to the manager. Returns the time domain the queue was
    /// bound to so the caller can drop its registration.
    pub(crate) fn detach(&self) -> Option<Arc<dyn TimeDomain>> {
        let mut any = self.inner.any_thread.lock();
        any.hooks = None;
        any.time_domain.take()
    }

    /// Drop every buffered task. Closures are dropped outside the locks.
    pub(crate) fn release_tasks(&self) {
        let (incoming, delayed) = {
            let mut any = self.inner.any_thread.lock();
            (std::mem::take(&mut any.incoming), std::mem::take(&mut any.delayed))
        };
        let work = std::mem::take(&mut self.inner.main_thread.lock().work);
        drop(incoming);
        drop(delayed);
        drop(work);
    }
}

impl PartialEq for TaskQueue {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for TaskQueue {}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TaskQueueManager;
    use crate::runtime::RunLoop;

    #[test]
    fn test_take_front_returns_oldest_work() {
        let manager = TaskQueueManager::new(RunLoop::new());
        let queue = manager.new_task_queue(TaskQueueSpec::new("front")).unwrap();
        queue.post_task(|| {}).unwrap();
        queue.post_task(|| {}).unwrap();
        queue.pump_queue().unwrap();

        let first = queue.take_front();
        let second = queue.take_front();
        assert!(first.meta.sequence_number < second.meta.sequence_number);
        assert!(!queue.has_work());
    }

    #[test]
    #[should_panic(expected = "take_front on empty work queue `empty`")]
    fn test_take_front_on_empty_work_panics() {
        let manager = TaskQueueManager::new(RunLoop::new());
        let queue = manager.new_task_queue(TaskQueueSpec::new("empty")).unwrap();
        let _ = queue.take_front();
    }
}
