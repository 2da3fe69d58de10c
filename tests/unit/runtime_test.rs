//! Tests for run loop delegates

use std::panic::Location;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use taskq_scheduler::core::TaskQueueManagerDelegate;
use taskq_scheduler::runtime::RunLoop;
use taskq_scheduler::util::TestTickClock;

fn counting(counter: &Arc<AtomicUsize>) -> Box<dyn FnOnce() + Send> {
    let counter = Arc::clone(counter);
    Box::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    })
}

#[test]
fn test_run_loop_belongs_to_creating_thread() {
    let run_loop = RunLoop::new();
    assert!(run_loop.belongs_to_current_thread());
    assert!(run_loop.runs_tasks_on_current_thread());

    let remote = Arc::clone(&run_loop);
    let on_other_thread = std::thread::spawn(move || remote.belongs_to_current_thread())
        .join()
        .unwrap();
    assert!(!on_other_thread);
}

#[test]
fn test_run_loop_runs_posts_in_order() {
    let run_loop = RunLoop::new();
    let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
    for i in 0..3 {
        let order = Arc::clone(&order);
        run_loop.post_task(Location::caller(), Box::new(move || order.lock().push(i)));
    }
    assert_eq!(run_loop.pending_task_count(), 3);
    assert_eq!(run_loop.run_until_idle(), 3);
    assert_eq!(*order.lock(), vec![0, 1, 2]);
}

#[test]
fn test_run_loop_nested_state() {
    let run_loop = RunLoop::new();
    assert!(!run_loop.is_nested());
    let nested = run_loop.run_nested(|| run_loop.is_nested());
    assert!(nested);
    assert!(!run_loop.is_nested());
}

#[test]
fn test_run_loop_delayed_posts_follow_clock() {
    let clock = Arc::new(TestTickClock::new());
    let run_loop = RunLoop::with_clock(clock.clone());
    let counter = Arc::new(AtomicUsize::new(0));

    run_loop.post_delayed_task(Location::caller(), counting(&counter), Duration::from_millis(20));
    run_loop.post_delayed_task(Location::caller(), counting(&counter), Duration::from_millis(10));
    assert_eq!(
        run_loop.next_delayed_run_time(),
        Some(run_loop.now_ticks() + Duration::from_millis(10))
    );

    clock.advance(Duration::from_millis(10));
    assert_eq!(run_loop.run_until_idle(), 1);
    clock.advance(Duration::from_millis(10));
    assert_eq!(run_loop.run_until_idle(), 1);
    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert_eq!(run_loop.delayed_task_count(), 0);
}

#[test]
fn test_run_loop_counts_idle_notifications() {
    let run_loop = RunLoop::new();
    run_loop.on_no_more_immediate_work();
    run_loop.on_no_more_immediate_work();
    assert_eq!(run_loop.idle_notification_count(), 2);
}

#[cfg(feature = "tokio-runtime")]
#[tokio::test]
async fn test_tokio_delegate_is_never_nested() {
    let delegate = taskq_scheduler::runtime::TokioDelegate::current().unwrap();
    assert!(!delegate.is_nested());
    assert!(delegate.belongs_to_current_thread());

    let counter = Arc::new(AtomicUsize::new(0));
    delegate.post_task(Location::caller(), counting(&counter));
    while counter.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}
