//! Configuration models for the manager and its queues.

pub mod scheduler;

pub use scheduler::{ManagerConfig, QueueConfig, SchedulerConfig};
