//! Tests for utility functions

use std::time::Duration;

use taskq_scheduler::util::{init_test_tracing, DefaultTickClock, TestTickClock, TickClock, DEFAULT_FILTER};

#[test]
fn test_test_clock_advances_only_on_request() {
    let clock = TestTickClock::default();
    let start = clock.now_ticks();
    clock.advance(Duration::from_secs(2));
    assert_eq!(clock.now_ticks() - start, Duration::from_secs(2));
}

#[test]
fn test_default_clock_moves_forward() {
    let clock = DefaultTickClock;
    let first = clock.now_ticks();
    assert!(clock.now_ticks() >= first);
}

#[test]
fn test_tracing_init_is_idempotent() {
    init_test_tracing();
    init_test_tracing();
    tracing::info!("tracing initialised twice");
}

#[test]
fn test_default_filter_targets_crate() {
    assert!(DEFAULT_FILTER.starts_with("taskq_scheduler"));
}
