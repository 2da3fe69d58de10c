//! Core scheduling abstractions: queues, selection, time domains and the
//! manager that drives them.

pub mod delegate;
pub mod error;
pub mod manager;
pub mod selector;
pub mod task;
pub mod task_queue;
pub mod time_domain;

pub use delegate::TaskQueueManagerDelegate;
pub use error::{AppResult, SchedulerError};
pub use manager::{SchedulerHooks, TaskQueueManager, TaskQueueManagerObserver};
pub use selector::{PrioritySelector, Selector, SelectorObserver};
pub use task::{Closure, Task, TaskMetadata, TaskObserver};
pub use task_queue::{PumpPolicy, QueueId, QueuePriority, TaskQueue, TaskQueueSpec, WakeupPolicy};
pub use time_domain::{RealTimeDomain, TimeDomain, TimeDomainCore};
