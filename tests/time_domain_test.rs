//! Integration tests for delayed tasks and time domains.
//!
//! These tests validate:
//! - Delayed tasks on the real-time domain follow the delegate's clock
//! - Due delayed tasks run in run-time order, ties in post order
//! - Custom time domains can be registered and drive their own queues
//! - Queues cannot be bound to an unregistered domain

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use taskq_scheduler::core::{
    PumpPolicy, SchedulerError, TaskQueueManager, TaskQueueSpec, TimeDomain, TimeDomainCore,
};
use taskq_scheduler::runtime::RunLoop;
use taskq_scheduler::util::{TestTickClock, TickClock};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

type Log = Arc<Mutex<Vec<&'static str>>>;

fn setup() -> (Arc<TestTickClock>, Arc<RunLoop>, TaskQueueManager) {
    let clock = Arc::new(TestTickClock::new());
    let run_loop = RunLoop::with_clock(clock.clone());
    let manager = TaskQueueManager::new(run_loop.clone());
    (clock, run_loop, manager)
}

fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn record(log: &Log, entry: &'static str) -> impl FnOnce() + Send + 'static {
    let log = Arc::clone(log);
    move || log.lock().push(entry)
}

/// Time domain whose clock only moves when the test says so. Wake-up
/// requests are recorded rather than scheduled.
struct ManualTimeDomain {
    core: TimeDomainCore,
    now: Mutex<Instant>,
    requested: Mutex<Vec<Instant>>,
}

impl ManualTimeDomain {
    fn new() -> Self {
        Self {
            core: TimeDomainCore::new(),
            now: Mutex::new(Instant::now()),
            requested: Mutex::new(Vec::new()),
        }
    }

    fn advance(&self, delta: Duration) {
        *self.now.lock() += delta;
    }
}

impl TimeDomain for ManualTimeDomain {
    fn name(&self) -> &'static str {
        "ManualTimeDomain"
    }

    fn core(&self) -> &TimeDomainCore {
        &self.core
    }

    fn now(&self) -> Instant {
        *self.now.lock()
    }

    fn request_wakeup(&self, run_time: Instant) {
        self.requested.lock().push(run_time);
    }

    fn maybe_advance_time(&self) -> bool {
        false
    }
}

// ============================================================================
// REAL-TIME DOMAIN
// ============================================================================

#[test]
fn test_delayed_task_waits_for_clock() {
    let (clock, run_loop, manager) = setup();
    let q = manager.new_task_queue(TaskQueueSpec::new("timers")).unwrap();
    let log = new_log();

    q.post_delayed_task(record(&log, "delayed"), Duration::from_millis(100))
        .unwrap();
    assert_eq!(q.delayed_task_count(), 1);
    assert_eq!(
        q.next_delayed_run_time(),
        Some(clock.now_ticks() + Duration::from_millis(100))
    );
    assert_eq!(run_loop.delayed_task_count(), 1);

    run_loop.run_until_idle();
    assert!(log.lock().is_empty());

    clock.advance(Duration::from_millis(99));
    run_loop.run_until_idle();
    assert!(log.lock().is_empty());

    clock.advance(Duration::from_millis(1));
    run_loop.run_until_idle();
    assert_eq!(*log.lock(), vec!["delayed"]);
    assert_eq!(q.delayed_task_count(), 0);
    assert!(q.is_queue_empty());
}

#[test]
fn test_due_delayed_tasks_run_by_run_time_then_post_order() {
    let (clock, run_loop, manager) = setup();
    let q = manager.new_task_queue(TaskQueueSpec::new("timers")).unwrap();
    let log = new_log();

    q.post_delayed_task(record(&log, "30ms"), Duration::from_millis(30))
        .unwrap();
    q.post_delayed_task(record(&log, "10ms-first"), Duration::from_millis(10))
        .unwrap();
    q.post_delayed_task(record(&log, "10ms-second"), Duration::from_millis(10))
        .unwrap();

    clock.advance(Duration::from_millis(30));
    run_loop.run_until_idle();

    assert_eq!(*log.lock(), vec!["10ms-first", "10ms-second", "30ms"]);
}

#[test]
fn test_one_delayed_pass_per_run_time() {
    let (_clock, run_loop, manager) = setup();
    let a = manager.new_task_queue(TaskQueueSpec::new("a")).unwrap();
    let b = manager.new_task_queue(TaskQueueSpec::new("b")).unwrap();

    a.post_delayed_task(|| {}, Duration::from_millis(20)).unwrap();
    b.post_delayed_task(|| {}, Duration::from_millis(20)).unwrap();

    assert_eq!(run_loop.delayed_task_count(), 1);
}

#[test]
fn test_zero_delay_is_immediate() {
    let (_clock, run_loop, manager) = setup();
    let q = manager.new_task_queue(TaskQueueSpec::new("now")).unwrap();
    let log = new_log();

    q.post_delayed_task(record(&log, "now"), Duration::ZERO).unwrap();
    assert_eq!(q.delayed_task_count(), 0);
    run_loop.run_until_idle();

    assert_eq!(*log.lock(), vec!["now"]);
}

#[test]
fn test_immediate_work_not_blocked_by_pending_delay() {
    let (clock, run_loop, manager) = setup();
    let q = manager.new_task_queue(TaskQueueSpec::new("mixed")).unwrap();
    let log = new_log();

    q.post_delayed_task(record(&log, "later"), Duration::from_secs(1))
        .unwrap();
    q.post_task(record(&log, "now")).unwrap();
    run_loop.run_until_idle();
    assert_eq!(*log.lock(), vec!["now"]);

    clock.advance(Duration::from_secs(1));
    run_loop.run_until_idle();
    assert_eq!(*log.lock(), vec!["now", "later"]);
}

#[test]
fn test_pump_moves_due_delayed_tasks_on_manual_queue() {
    let (clock, run_loop, manager) = setup();
    let q = manager
        .new_task_queue(TaskQueueSpec::new("manual").with_pump_policy(PumpPolicy::Manual))
        .unwrap();
    let log = new_log();

    q.post_delayed_task(record(&log, "delayed"), Duration::from_millis(5))
        .unwrap();
    clock.advance(Duration::from_millis(5));
    run_loop.run_until_idle();
    assert!(log.lock().is_empty());
    assert!(q.has_pending_immediate_work());

    q.pump_queue().unwrap();
    run_loop.run_until_idle();
    assert_eq!(*log.lock(), vec!["delayed"]);
}

// ============================================================================
// CUSTOM DOMAINS
// ============================================================================

#[test]
fn test_custom_domain_drives_its_queues() {
    let (_clock, run_loop, manager) = setup();
    let domain = Arc::new(ManualTimeDomain::new());
    manager.register_time_domain(domain.clone());
    let virtual_q = manager
        .new_task_queue(TaskQueueSpec::new("virtual").with_time_domain(domain.clone()))
        .unwrap();
    let real_q = manager.new_task_queue(TaskQueueSpec::new("real")).unwrap();
    let log = new_log();

    let start = domain.now();
    virtual_q
        .post_delayed_task(record(&log, "virtual"), Duration::from_millis(50))
        .unwrap();
    assert_eq!(*domain.requested.lock(), vec![start + Duration::from_millis(50)]);
    assert_eq!(
        domain.core().next_scheduled_run_time(),
        Some(start + Duration::from_millis(50))
    );

    run_loop.run_until_idle();
    assert!(log.lock().is_empty());

    // Any pass promotes due work on every registered domain.
    domain.advance(Duration::from_millis(50));
    real_q.post_task(record(&log, "real")).unwrap();
    run_loop.run_until_idle();

    assert_eq!(log.lock().len(), 2);
    assert!(log.lock().contains(&"virtual"));
    assert!(virtual_q.is_queue_empty());
}

#[test]
fn test_queue_needs_registered_domain() {
    let (_clock, _run_loop, manager) = setup();
    let domain: Arc<dyn TimeDomain> = Arc::new(ManualTimeDomain::new());

    let err = manager
        .new_task_queue(TaskQueueSpec::new("orphan").with_time_domain(domain.clone()))
        .unwrap_err();
    assert_eq!(err, SchedulerError::TimeDomainNotRegistered("ManualTimeDomain".into()));

    manager.register_time_domain(domain.clone());
    let q = manager
        .new_task_queue(TaskQueueSpec::new("bound").with_time_domain(domain.clone()))
        .unwrap();
    assert_eq!(domain.core().registered_queue_count(), 1);

    q.unregister_task_queue();
    assert_eq!(domain.core().registered_queue_count(), 0);
    manager.unregister_time_domain(&domain);
    assert!(domain.core().hooks().is_none());

    assert!(manager
        .new_task_queue(TaskQueueSpec::new("again").with_time_domain(domain))
        .is_err());
}

#[test]
fn test_real_time_domain_is_registered_by_default() {
    let (_clock, _run_loop, manager) = setup();
    let q = manager.new_task_queue(TaskQueueSpec::new("default")).unwrap();

    let real = manager.real_time_domain();
    assert!(real.core().hooks().is_some());
    assert_eq!(real.core().registered_queue_count(), 1);
    assert_eq!(q.time_domain().map(|d| d.name()), Some("RealTimeDomain"));
}
