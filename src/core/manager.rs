//! The task queue manager.
//!
//! Multiplexes many [`TaskQueue`]s onto the single thread owned by a
//! [`TaskQueueManagerDelegate`]. The manager never runs work on its own: it
//! posts scheduling passes through the delegate and, in each pass, drains a
//! bounded batch of tasks picked one at a time by the [`Selector`].
//!
//! # Passes
//!
//! At most one self-posted pass is outstanding per manager when scheduling
//! from the owning thread; posts from other threads are never coalesced.
//! A pass:
//!
//! 1. frees queues unregistered since the last outermost pass (never inside a
//!    nested run loop, where a caller further up the stack may still be
//!    iterating them);
//! 2. promotes ready tasks on every time domain without waking
//!    [`PumpPolicy::AfterWakeup`] queues;
//! 3. runs up to `work_batch_size` tasks, promoting again after each one and
//!    stopping after a single task when nested;
//! 4. posts a continuation if work remains, or tells the delegate it is idle.
//!
//! # Self-destruction
//!
//! A task may drop the [`TaskQueueManager`]. Each executing task frame holds a
//! [`Weak`] to the manager's liveness token; once it no longer upgrades the
//! pass returns without touching manager state again.
//!
//! [`PumpPolicy::AfterWakeup`]: super::task_queue::PumpPolicy::AfterWakeup

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::panic::Location;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, trace, trace_span};

use super::delegate::TaskQueueManagerDelegate;
use super::selector::{PrioritySelector, Selector, SelectorObserver};
use super::task::{Closure, SequenceNumberGenerator, TaskMetadata, TaskObserver};
use super::task_queue::{QueueId, QueuePriority, TaskQueue, TaskQueueSpec, WakeupPolicy};
use super::time_domain::{self, RealTimeDomain, TimeDomain};
use super::SchedulerError;
use crate::config::ManagerConfig;

/// Origin label for passes the manager posts to continue its own work.
const CONTINUATION_FROM: &Location<'static> = Location::caller();

/// Origin label for passes posted when a disabled queue is enabled again.
const QUEUE_ENABLED_FROM: &Location<'static> = Location::caller();

/// Optional observer of queue lifecycle events.
pub trait TaskQueueManagerObserver: Send + Sync {
    /// Called before `queue` is unregistered.
    fn on_unregister_task_queue(&self, queue: &TaskQueue);
}

/// Outcome of servicing one task from a work queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProcessTaskResult {
    /// Non-nestable task handed back to the delegate while nested.
    Deferred,
    /// Task ran and the manager is still alive.
    Executed,
    /// Task ran and dropped the manager.
    TaskQueueManagerDeleted,
}

/// Non-owning link from queues and time domains back to their manager.
///
/// Every operation is a no-op once the manager is gone.
#[derive(Clone)]
pub struct SchedulerHooks {
    delegate: Arc<dyn TaskQueueManagerDelegate>,
    manager: Weak<ManagerInner>,
    sequence_numbers: Arc<SequenceNumberGenerator>,
}

impl SchedulerHooks {
    /// The manager's delegate.
    #[must_use]
    pub fn delegate(&self) -> &Arc<dyn TaskQueueManagerDelegate> {
        &self.delegate
    }

    /// Current tick time of the delegate.
    #[must_use]
    pub fn now(&self) -> Instant {
        self.delegate.now_ticks()
    }

    /// Ask the manager for a pass as soon as possible.
    pub fn schedule_immediate_work(&self, from: &'static Location<'static>) {
        if let Some(manager) = self.manager.upgrade() {
            manager.maybe_schedule_immediate_work(from);
        }
    }

    /// Ask the manager for a pass after `delay`, measured from `now`.
    pub fn schedule_delayed_work(&self, from: &'static Location<'static>, now: Instant, delay: Duration) {
        if let Some(manager) = self.manager.upgrade() {
            manager.maybe_schedule_delayed_work(from, now, delay);
        }
    }

    pub(crate) fn next_sequence_number(&self) -> u64 {
        self.sequence_numbers.next()
    }

    pub(crate) fn runs_tasks_on_current_thread(&self) -> bool {
        self.delegate.runs_tasks_on_current_thread()
    }

    pub(crate) fn set_queue_enabled(&self, queue: &TaskQueue, enabled: bool) {
        if let Some(manager) = self.manager.upgrade() {
            manager.selector.lock().set_queue_enabled(queue, enabled);
        }
    }

    pub(crate) fn is_queue_enabled(&self, queue: &TaskQueue) -> bool {
        self.manager
            .upgrade()
            .is_some_and(|manager| manager.selector.lock().is_queue_enabled(queue))
    }

    pub(crate) fn set_queue_priority(&self, queue: &TaskQueue, priority: QueuePriority) {
        if let Some(manager) = self.manager.upgrade() {
            manager.selector.lock().set_queue_priority(queue, priority);
        }
    }

    pub(crate) fn queue_priority(&self, queue: &TaskQueue) -> Option<QueuePriority> {
        self.manager
            .upgrade()
            .and_then(|manager| manager.selector.lock().queue_priority(queue))
    }

    pub(crate) fn unregister_task_queue(&self, queue: &TaskQueue) {
        if let Some(manager) = self.manager.upgrade() {
            manager.unregister_task_queue(queue);
        }
    }
}

impl fmt::Debug for SchedulerHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerHooks")
            .field("manager_alive", &(self.manager.strong_count() > 0))
            .finish_non_exhaustive()
    }
}

/// Re-arms scheduling when the selector reports a disabled queue came back.
struct QueueEnabledListener {
    manager: Weak<ManagerInner>,
}

impl SelectorObserver for QueueEnabledListener {
    fn on_task_queue_enabled(&self, queue: &TaskQueue) {
        let Some(manager) = self.manager.upgrade() else {
            return;
        };
        if queue.has_pending_immediate_work() {
            manager.maybe_schedule_immediate_work(QUEUE_ENABLED_FROM);
        }
    }
}

/// State only touched from the owning thread.
struct MainThreadState {
    queues: BTreeMap<QueueId, TaskQueue>,
    /// Unregistered queues kept alive until the next outermost pass.
    queues_to_delete: Vec<TaskQueue>,
    time_domains: Vec<Arc<dyn TimeDomain>>,
    work_batch_size: usize,
    observer: Option<Arc<dyn TaskQueueManagerObserver>>,
    task_observers: Vec<Arc<dyn TaskObserver>>,
}

struct ManagerInner {
    delegate: Arc<dyn TaskQueueManagerDelegate>,
    config: ManagerConfig,
    self_weak: Weak<ManagerInner>,
    selector: Mutex<Box<dyn Selector>>,
    state: Mutex<MainThreadState>,
    real_time_domain: Arc<RealTimeDomain>,
    sequence_numbers: Arc<SequenceNumberGenerator>,
    next_queue_id: AtomicU64,
    /// Outstanding owning-thread self-posts; only ever 0 or 1.
    pending_post_count: AtomicUsize,
    /// Run times of outstanding delayed passes.
    pending_delayed_wakeups: Mutex<BTreeSet<Instant>>,
    task_was_run_on_quiescence_monitored_queue: AtomicBool,
    /// Liveness token. Only the manager holds a strong reference; task frames
    /// hold weak ones. `None` once shut down.
    deletion_sentinel: Mutex<Option<Arc<()>>>,
}

fn same_domain(a: &Arc<dyn TimeDomain>, b: &Arc<dyn TimeDomain>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

impl ManagerInner {
    fn hooks(&self) -> SchedulerHooks {
        SchedulerHooks {
            delegate: Arc::clone(&self.delegate),
            manager: self.self_weak.clone(),
            sequence_numbers: Arc::clone(&self.sequence_numbers),
        }
    }

    fn liveness(&self) -> Option<Weak<()>> {
        self.deletion_sentinel.lock().as_ref().map(Arc::downgrade)
    }

    fn is_shut_down(&self) -> bool {
        self.deletion_sentinel.lock().is_none()
    }

    fn debug_assert_owning_thread(&self) {
        debug_assert!(
            self.delegate.belongs_to_current_thread(),
            "task queue manager used off its owning thread"
        );
    }

    fn new_task_queue(&self, spec: &TaskQueueSpec) -> Result<TaskQueue, SchedulerError> {
        self.debug_assert_owning_thread();
        if self.is_shut_down() {
            return Err(SchedulerError::ManagerShutDown);
        }
        let domain = spec
            .time_domain
            .clone()
            .unwrap_or_else(|| Arc::clone(&self.real_time_domain) as Arc<dyn TimeDomain>);
        let id = QueueId(self.next_queue_id.fetch_add(1, Ordering::Relaxed));

        let queue = {
            let mut state = self.state.lock();
            if !state.time_domains.iter().any(|d| same_domain(d, &domain)) {
                return Err(SchedulerError::TimeDomainNotRegistered(domain.name().to_string()));
            }
            let queue = TaskQueue::new(id, spec, self.hooks(), Arc::clone(&domain));
            state.queues.insert(id, queue.clone());
            queue
        };
        domain.core().register_queue(&queue);
        {
            let mut selector = self.selector.lock();
            selector.add_queue(&queue);
            selector.set_queue_priority(&queue, spec.priority);
            if !spec.enabled {
                selector.set_queue_enabled(&queue, false);
            }
        }
        debug!(queue = %spec.name, id = %id, time_domain = domain.name(), "task queue created");
        Ok(queue)
    }

    fn register_time_domain(&self, domain: Arc<dyn TimeDomain>) {
        {
            let mut state = self.state.lock();
            if state.time_domains.iter().any(|d| same_domain(d, &domain)) {
                return;
            }
            state.time_domains.push(Arc::clone(&domain));
        }
        domain.core().attach(self.hooks());
        debug!(time_domain = domain.name(), "time domain registered");
    }

    fn unregister_time_domain(&self, domain: &Arc<dyn TimeDomain>) {
        let removed = {
            let mut state = self.state.lock();
            let before = state.time_domains.len();
            state.time_domains.retain(|d| !same_domain(d, domain));
            state.time_domains.len() != before
        };
        if removed {
            debug_assert_eq!(
                domain.core().registered_queue_count(),
                0,
                "time domain unregistered while queues still use it"
            );
            domain.core().detach();
            debug!(time_domain = domain.name(), "time domain unregistered");
        }
    }

    fn unregister_task_queue(&self, queue: &TaskQueue) {
        self.debug_assert_owning_thread();
        let observer = {
            let state = self.state.lock();
            if !state.queues.get(&queue.id()).is_some_and(|q| q == queue) {
                return;
            }
            state.observer.clone()
        };
        if let Some(observer) = observer {
            observer.on_unregister_task_queue(queue);
        }
        if let Some(domain) = queue.detach() {
            domain.core().unregister_queue(queue);
        }
        self.selector.lock().remove_queue(queue);
        let mut state = self.state.lock();
        if let Some(removed) = state.queues.remove(&queue.id()) {
            state.queues_to_delete.push(removed);
        }
        debug!(queue = queue.name(), id = %queue.id(), "task queue unregistered");
    }

    fn delete_queues_pending_deletion(&self) {
        let graveyard = std::mem::take(&mut self.state.lock().queues_to_delete);
        if graveyard.is_empty() {
            return;
        }
        trace!(
            category = %self.config.disabled_by_default_tracing_category,
            count = graveyard.len(),
            "freeing unregistered queues"
        );
        for queue in &graveyard {
            queue.release_tasks();
        }
    }

    fn time_domains(&self) -> Vec<Arc<dyn TimeDomain>> {
        self.state.lock().time_domains.clone()
    }

    fn update_work_queues(&self, should_trigger_wakeup: bool, previous_task: Option<&TaskMetadata>) {
        for domain in self.time_domains() {
            time_domain::update_work_queues(domain.as_ref(), should_trigger_wakeup, previous_task);
        }
    }

    fn try_advance_time_domains(&self) -> bool {
        let mut can_advance = false;
        for domain in self.time_domains() {
            can_advance |= domain.maybe_advance_time();
        }
        can_advance
    }

    fn do_work_closure(&self, decrement_pending_post_count: bool) -> Closure {
        let manager = self.self_weak.clone();
        Box::new(move || {
            if let Some(manager) = manager.upgrade() {
                manager.do_work(decrement_pending_post_count);
            }
        })
    }

    fn maybe_schedule_immediate_work(&self, from: &'static Location<'static>) {
        if self.is_shut_down() {
            return;
        }
        if self.delegate.belongs_to_current_thread() {
            if self
                .pending_post_count
                .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                trace!(
                    category = %self.config.disabled_by_default_verbose_tracing_category,
                    %from,
                    "pass already pending"
                );
                return;
            }
            self.delegate.post_task(from, self.do_work_closure(true));
        } else {
            self.delegate.post_task(from, self.do_work_closure(false));
        }
    }

    fn maybe_schedule_delayed_work(&self, from: &'static Location<'static>, now: Instant, delay: Duration) {
        if self.is_shut_down() {
            return;
        }
        let run_time = now + delay;
        if !self.pending_delayed_wakeups.lock().insert(run_time) {
            return;
        }
        trace!(
            category = %self.config.disabled_by_default_tracing_category,
            %from,
            delay_ms = delay.as_millis(),
            "delayed pass posted"
        );
        let manager = self.self_weak.clone();
        self.delegate.post_delayed_task(
            from,
            Box::new(move || {
                if let Some(manager) = manager.upgrade() {
                    manager.pending_delayed_wakeups.lock().remove(&run_time);
                    manager.do_work(false);
                }
            }),
            delay,
        );
    }

    /// One scheduling pass. `decrement_pending_post_count` is true when this
    /// pass consumes the owning thread's coalesced self-post.
    fn do_work(&self, decrement_pending_post_count: bool) {
        if decrement_pending_post_count {
            let consumed = self
                .pending_post_count
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| count.checked_sub(1));
            debug_assert!(consumed.is_ok(), "pending post count underflow");
        }
        self.debug_assert_owning_thread();

        let Some(alive) = self.liveness() else {
            return;
        };
        let nested = self.delegate.is_nested();
        let _span = trace_span!("do_work", category = %self.config.tracing_category, nested).entered();

        if !nested {
            self.delete_queues_pending_deletion();
        }
        self.update_work_queues(false, None);

        let work_batch_size = self.state.lock().work_batch_size;
        let mut previous_task: Option<TaskMetadata> = None;
        for _ in 0..work_batch_size {
            let Some(queue) = self.selector.lock().select_queue_to_service() else {
                break;
            };
            match self.process_task_from_work_queue(&queue, &alive, &mut previous_task) {
                ProcessTaskResult::Deferred => continue,
                ProcessTaskResult::TaskQueueManagerDeleted => return,
                ProcessTaskResult::Executed => {}
            }
            let should_trigger_wakeup = queue.wakeup_policy() == WakeupPolicy::CanWakeOtherQueues;
            self.update_work_queues(should_trigger_wakeup, previous_task.as_ref());

            // Keep an outer loop's exit condition responsive.
            if self.delegate.is_nested() {
                break;
            }
        }

        let has_enabled_work = self.selector.lock().has_enabled_work();
        if has_enabled_work || self.try_advance_time_domains() {
            self.maybe_schedule_immediate_work(CONTINUATION_FROM);
        } else {
            self.delegate.on_no_more_immediate_work();
        }
    }

    fn process_task_from_work_queue(
        &self,
        queue: &TaskQueue,
        alive: &Weak<()>,
        previous_task: &mut Option<TaskMetadata>,
    ) -> ProcessTaskResult {
        let task = queue.take_front();
        if queue.should_monitor_quiescence() {
            self.task_was_run_on_quiescence_monitored_queue
                .store(true, Ordering::Relaxed);
        }

        if !task.meta.nestable && self.delegate.is_nested() {
            trace!(
                category = %self.config.disabled_by_default_tracing_category,
                queue = queue.name(),
                sequence_number = task.meta.sequence_number,
                "deferring non-nestable task"
            );
            let (meta, closure) = task.into_parts();
            self.delegate.post_non_nestable_task(meta.posted_from, closure);
            return ProcessTaskResult::Deferred;
        }

        let notify = queue.should_notify_observers();
        let meta = task.meta.clone();
        if notify {
            let observers = self.state.lock().task_observers.clone();
            for observer in &observers {
                observer.will_process_task(&meta);
            }
            queue.notify_will_process_task(&meta);
        }

        trace!(
            category = %self.config.disabled_by_default_verbose_tracing_category,
            queue = queue.name(),
            sequence_number = meta.sequence_number,
            posted_from = %meta.posted_from,
            "running task"
        );
        task.run();

        if alive.strong_count() == 0 {
            return ProcessTaskResult::TaskQueueManagerDeleted;
        }

        if notify {
            let observers = self.state.lock().task_observers.clone();
            for observer in &observers {
                observer.did_process_task(&meta);
            }
            queue.notify_did_process_task(&meta);
        }
        *previous_task = Some(meta);
        ProcessTaskResult::Executed
    }

    fn shutdown(&self) {
        let Some(sentinel) = self.deletion_sentinel.lock().take() else {
            return;
        };
        drop(sentinel);
        debug!(category = %self.config.tracing_category, "task queue manager shutting down");

        self.selector.lock().set_observer(None);
        let (queues, graveyard, domains) = {
            let mut state = self.state.lock();
            state.observer = None;
            state.task_observers.clear();
            (
                std::mem::take(&mut state.queues),
                std::mem::take(&mut state.queues_to_delete),
                std::mem::take(&mut state.time_domains),
            )
        };
        for queue in queues.values() {
            if let Some(domain) = queue.detach() {
                domain.core().unregister_queue(queue);
            }
            self.selector.lock().remove_queue(queue);
        }
        for domain in &domains {
            domain.core().detach();
        }
        self.pending_delayed_wakeups.lock().clear();
        for queue in queues.values().chain(graveyard.iter()) {
            queue.release_tasks();
        }
    }
}

/// Owner handle of the scheduling engine.
///
/// Dropping the handle tears the engine down: every remaining queue is
/// force-unregistered, its undrained tasks are discarded, and any pass still
/// on the stack returns as soon as its current task does.
pub struct TaskQueueManager {
    inner: Arc<ManagerInner>,
}

impl TaskQueueManager {
    /// Manager with the default configuration and [`PrioritySelector`].
    #[must_use]
    pub fn new(delegate: Arc<dyn TaskQueueManagerDelegate>) -> Self {
        Self::build(delegate, ManagerConfig::default(), Box::new(PrioritySelector::new()))
    }

    /// Manager with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConfig`] if the configuration does
    /// not validate.
    pub fn with_config(
        delegate: Arc<dyn TaskQueueManagerDelegate>,
        config: ManagerConfig,
    ) -> Result<Self, SchedulerError> {
        Self::with_selector(delegate, config, Box::new(PrioritySelector::new()))
    }

    /// Manager with an explicit configuration and selection policy.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConfig`] if the configuration does
    /// not validate.
    pub fn with_selector(
        delegate: Arc<dyn TaskQueueManagerDelegate>,
        config: ManagerConfig,
        selector: Box<dyn Selector>,
    ) -> Result<Self, SchedulerError> {
        config.validate().map_err(SchedulerError::InvalidConfig)?;
        Ok(Self::build(delegate, config, selector))
    }

    fn build(
        delegate: Arc<dyn TaskQueueManagerDelegate>,
        config: ManagerConfig,
        selector: Box<dyn Selector>,
    ) -> Self {
        let work_batch_size = config.work_batch_size.max(1);
        let inner = Arc::new_cyclic(|self_weak| ManagerInner {
            delegate,
            config,
            self_weak: self_weak.clone(),
            selector: Mutex::new(selector),
            state: Mutex::new(MainThreadState {
                queues: BTreeMap::new(),
                queues_to_delete: Vec::new(),
                time_domains: Vec::new(),
                work_batch_size,
                observer: None,
                task_observers: Vec::new(),
            }),
            real_time_domain: Arc::new(RealTimeDomain::new()),
            sequence_numbers: Arc::new(SequenceNumberGenerator::default()),
            next_queue_id: AtomicU64::new(0),
            pending_post_count: AtomicUsize::new(0),
            pending_delayed_wakeups: Mutex::new(BTreeSet::new()),
            task_was_run_on_quiescence_monitored_queue: AtomicBool::new(false),
            deletion_sentinel: Mutex::new(Some(Arc::new(()))),
        });
        inner
            .selector
            .lock()
            .set_observer(Some(Arc::new(QueueEnabledListener {
                manager: Arc::downgrade(&inner),
            })));
        inner.register_time_domain(Arc::clone(&inner.real_time_domain) as Arc<dyn TimeDomain>);
        debug!(
            category = %inner.config.tracing_category,
            work_batch_size,
            "task queue manager created"
        );
        Self { inner }
    }

    /// Create and register a queue.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::TimeDomainNotRegistered`] if the spec names
    /// a time domain this manager does not know.
    pub fn new_task_queue(&self, spec: TaskQueueSpec) -> Result<TaskQueue, SchedulerError> {
        self.inner.new_task_queue(&spec)
    }

    /// Unregister a queue. Its undrained tasks never run; the queue itself is
    /// kept until the next outermost pass.
    pub fn unregister_task_queue(&self, queue: &TaskQueue) {
        self.inner.unregister_task_queue(queue);
    }

    /// Register a time domain and wire it to the delegate.
    pub fn register_time_domain(&self, domain: Arc<dyn TimeDomain>) {
        self.inner.register_time_domain(domain);
    }

    /// Unregister a time domain. No queue may still be bound to it.
    pub fn unregister_time_domain(&self, domain: &Arc<dyn TimeDomain>) {
        self.inner.unregister_time_domain(domain);
    }

    /// The default wall-clock domain.
    #[must_use]
    pub fn real_time_domain(&self) -> Arc<RealTimeDomain> {
        Arc::clone(&self.inner.real_time_domain)
    }

    /// Set how many tasks a non-nested pass may run.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidWorkBatchSize`] for zero.
    pub fn set_work_batch_size(&self, work_batch_size: usize) -> Result<(), SchedulerError> {
        self.inner.debug_assert_owning_thread();
        if work_batch_size == 0 {
            return Err(SchedulerError::InvalidWorkBatchSize(work_batch_size));
        }
        self.inner.state.lock().work_batch_size = work_batch_size;
        Ok(())
    }

    /// Current work batch size.
    #[must_use]
    pub fn work_batch_size(&self) -> usize {
        self.inner.state.lock().work_batch_size
    }

    /// Add an observer notified around tasks on queues that opted in.
    pub fn add_task_observer(&self, observer: Arc<dyn TaskObserver>) {
        self.inner.debug_assert_owning_thread();
        self.inner.state.lock().task_observers.push(observer);
    }

    /// Remove a task observer.
    pub fn remove_task_observer(&self, observer: &Arc<dyn TaskObserver>) {
        self.inner.debug_assert_owning_thread();
        self.inner
            .state
            .lock()
            .task_observers
            .retain(|o| !Arc::ptr_eq(o, observer));
    }

    /// Install or clear the lifecycle observer.
    pub fn set_observer(&self, observer: Option<Arc<dyn TaskQueueManagerObserver>>) {
        self.inner.debug_assert_owning_thread();
        self.inner.state.lock().observer = observer;
    }

    /// Returns true if no task from a quiescence-monitored queue ran since
    /// the previous call, and resets the record.
    pub fn get_and_clear_system_is_quiescent_bit(&self) -> bool {
        !self
            .inner
            .task_was_run_on_quiescence_monitored_queue
            .swap(false, Ordering::Relaxed)
    }

    /// The delegate passes are posted to.
    #[must_use]
    pub fn delegate(&self) -> &Arc<dyn TaskQueueManagerDelegate> {
        &self.inner.delegate
    }

    /// Configuration the manager was built with.
    #[must_use]
    pub fn config(&self) -> &ManagerConfig {
        &self.inner.config
    }

    /// Number of registered queues.
    #[must_use]
    pub fn live_queue_count(&self) -> usize {
        self.inner.state.lock().queues.len()
    }

    /// Number of unregistered queues waiting to be freed.
    #[must_use]
    pub fn pending_deletion_count(&self) -> usize {
        self.inner.state.lock().queues_to_delete.len()
    }

    /// Number of outstanding owning-thread self-posts (0 or 1).
    #[must_use]
    pub fn pending_post_count(&self) -> usize {
        self.inner.pending_post_count.load(Ordering::Acquire)
    }
}

impl Drop for TaskQueueManager {
    fn drop(&mut self) {
        self.inner.shutdown();
    }
}

impl fmt::Debug for TaskQueueManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueueManager")
            .field("config", &self.inner.config)
            .field("live_queues", &self.live_queue_count())
            .field("pending_deletion", &self.pending_deletion_count())
            .finish_non_exhaustive()
    }
}
