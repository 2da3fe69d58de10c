//! Builders to construct a manager and its queues from configuration.

pub mod manager_builder;

pub use manager_builder::{build_manager, build_manager_from_json, BuiltScheduler};
