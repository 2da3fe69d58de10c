//! Tests for builder modules

use taskq_scheduler::builders::{build_manager, build_manager_from_json};
use taskq_scheduler::config::{ManagerConfig, QueueConfig, SchedulerConfig};
use taskq_scheduler::core::{PumpPolicy, QueuePriority, SchedulerError};
use taskq_scheduler::runtime::RunLoop;

#[test]
fn test_build_manager_creates_named_queues() {
    let mut input = QueueConfig::new("input");
    input.priority = QueuePriority::High;
    let mut lazy = QueueConfig::new("lazy");
    lazy.pump_policy = PumpPolicy::Manual;
    let cfg = SchedulerConfig {
        manager: ManagerConfig::new().with_work_batch_size(3),
        queues: vec![input, lazy],
    };

    let built = build_manager(&cfg, RunLoop::new()).unwrap();
    assert_eq!(built.manager.work_batch_size(), 3);
    assert_eq!(built.manager.live_queue_count(), 2);
    assert_eq!(built.queue("input").unwrap().queue_priority(), Some(QueuePriority::High));
    assert_eq!(built.queue("lazy").unwrap().pump_policy(), PumpPolicy::Manual);
    assert!(built.queue("missing").is_none());
}

#[test]
fn test_build_manager_rejects_invalid_config() {
    let cfg = SchedulerConfig {
        manager: ManagerConfig::default(),
        queues: vec![QueueConfig::new("dup"), QueueConfig::new("dup")],
    };
    let err = build_manager(&cfg, RunLoop::new()).unwrap_err();
    assert!(matches!(err, SchedulerError::InvalidConfig(_)));
}

#[test]
fn test_built_queues_run_tasks() {
    let run_loop = RunLoop::new();
    let cfg = SchedulerConfig {
        manager: ManagerConfig::default(),
        queues: vec![QueueConfig::new("default")],
    };
    let built = build_manager(&cfg, run_loop.clone()).unwrap();
    let ran = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));

    let flag = ran.clone();
    built
        .queue("default")
        .unwrap()
        .post_task(move || flag.store(true, std::sync::atomic::Ordering::SeqCst))
        .unwrap();
    run_loop.run_until_idle();

    assert!(ran.load(std::sync::atomic::Ordering::SeqCst));
}

#[test]
fn test_build_manager_from_json() {
    let json = r#"{ "queues": [ { "name": "input", "priority": "control" } ] }"#;
    let built = build_manager_from_json(json, RunLoop::new()).unwrap();
    assert_eq!(
        built.queue("input").unwrap().queue_priority(),
        Some(QueuePriority::Control)
    );
}

#[test]
fn test_build_manager_from_json_reports_context() {
    let err = build_manager_from_json("{", RunLoop::new()).unwrap_err();
    assert_eq!(err.to_string(), "loading scheduler configuration");
    assert!(format!("{err:#}").contains("parse error"));
}
