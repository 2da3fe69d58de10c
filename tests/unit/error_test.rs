//! Tests for error types

use taskq_scheduler::core::{AppResult, SchedulerError};

#[test]
fn test_queue_unregistered_error() {
    let err = SchedulerError::QueueUnregistered("input".to_string());
    assert_eq!(format!("{}", err), "queue unregistered: input");
}

#[test]
fn test_time_domain_not_registered_error() {
    let err = SchedulerError::TimeDomainNotRegistered("VirtualTimeDomain".to_string());
    assert_eq!(format!("{}", err), "time domain not registered: VirtualTimeDomain");
}

#[test]
fn test_invalid_work_batch_size_error() {
    let err = SchedulerError::InvalidWorkBatchSize(0);
    assert_eq!(format!("{}", err), "invalid work batch size: 0");
}

#[test]
fn test_invalid_config_error() {
    let err = SchedulerError::InvalidConfig("duplicate queue name `a`".to_string());
    assert_eq!(format!("{}", err), "invalid configuration: duplicate queue name `a`");
}

#[test]
fn test_manager_shut_down_error() {
    assert_eq!(
        format!("{}", SchedulerError::ManagerShutDown),
        "task queue manager shut down"
    );
}

#[test]
fn test_errors_convert_into_app_result() {
    fn fails() -> AppResult<()> {
        Err(SchedulerError::InvalidWorkBatchSize(0))?;
        Ok(())
    }

    let err = fails().unwrap_err();
    assert_eq!(
        err.downcast_ref::<SchedulerError>(),
        Some(&SchedulerError::InvalidWorkBatchSize(0))
    );
}
