//! Tests for configuration validation

use taskq_scheduler::config::{ManagerConfig, QueueConfig, SchedulerConfig};
use taskq_scheduler::core::{PumpPolicy, QueuePriority, WakeupPolicy};

#[test]
fn test_manager_config_defaults() {
    let cfg = ManagerConfig::new();
    assert_eq!(cfg.work_batch_size, 1);
    assert_eq!(cfg.tracing_category, "task_queue_manager");
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_manager_config_invalid_batch_size() {
    let cfg = ManagerConfig::new().with_work_batch_size(0);
    assert!(cfg.validate().is_err());
}

#[test]
fn test_manager_config_builder() {
    let cfg = ManagerConfig::new()
        .with_work_batch_size(8)
        .with_tracing_category("renderer");
    assert_eq!(cfg.work_batch_size, 8);
    assert_eq!(cfg.tracing_category, "renderer");
}

#[test]
fn test_queue_config_defaults() {
    let cfg = QueueConfig::new("default");
    assert_eq!(cfg.priority, QueuePriority::Normal);
    assert_eq!(cfg.pump_policy, PumpPolicy::Auto);
    assert_eq!(cfg.wakeup_policy, WakeupPolicy::CanWakeOtherQueues);
    assert!(cfg.should_notify_observers);
    assert!(!cfg.should_monitor_quiescence);
    assert!(cfg.enabled);
}

#[test]
fn test_queue_config_empty_name_invalid() {
    assert!(QueueConfig::new("  ").validate().is_err());
}

#[test]
fn test_scheduler_config_duplicate_queue_names() {
    let cfg = SchedulerConfig {
        manager: ManagerConfig::default(),
        queues: vec![QueueConfig::new("a"), QueueConfig::new("a")],
    };
    let err = cfg.validate().unwrap_err();
    assert!(err.contains("duplicate queue name"));
}

#[test]
fn test_scheduler_config_from_json() {
    let json = r#"{
        "manager": { "work_batch_size": 4 },
        "queues": [
            { "name": "input", "priority": "high" },
            { "name": "idle", "priority": "best_effort", "pump_policy": "after_wakeup",
              "wakeup_policy": "quiet", "enabled": false },
            { "name": "timers", "should_monitor_quiescence": true }
        ]
    }"#;

    let cfg = SchedulerConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.manager.work_batch_size, 4);
    assert_eq!(cfg.queues.len(), 3);
    assert_eq!(cfg.queues[0].priority, QueuePriority::High);
    assert_eq!(cfg.queues[1].pump_policy, PumpPolicy::AfterWakeup);
    assert_eq!(cfg.queues[1].wakeup_policy, WakeupPolicy::Quiet);
    assert!(!cfg.queues[1].enabled);
    assert!(cfg.queues[2].should_monitor_quiescence);
    assert!(cfg.queues[2].should_notify_observers);
}

#[test]
fn test_scheduler_config_from_json_rejects_invalid() {
    assert!(SchedulerConfig::from_json_str("not json").is_err());
    assert!(SchedulerConfig::from_json_str(r#"{ "manager": { "work_batch_size": 0 } }"#).is_err());
}

#[test]
fn test_scheduler_config_roundtrips_through_serde() {
    let cfg = SchedulerConfig {
        manager: ManagerConfig::new().with_work_batch_size(2),
        queues: vec![QueueConfig::new("a")],
    };
    let json = serde_json::to_string(&cfg).unwrap();
    assert_eq!(SchedulerConfig::from_json_str(&json).unwrap(), cfg);
}
