//! Error types for scheduler operations.

use thiserror::Error;

/// Errors produced by scheduler components.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// The queue was unregistered; the operation was ignored.
    #[error("queue unregistered: {0}")]
    QueueUnregistered(String),
    /// The queue's time domain is not registered with the manager.
    #[error("time domain not registered: {0}")]
    TimeDomainNotRegistered(String),
    /// Work batch size must be at least one.
    #[error("invalid work batch size: {0}")]
    InvalidWorkBatchSize(usize),
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The manager is tearing down and accepts no more configuration.
    #[error("task queue manager shut down")]
    ManagerShutDown,
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
