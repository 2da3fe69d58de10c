//! Manager and queue configuration structures.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::core::{PumpPolicy, QueuePriority, TaskQueueSpec, WakeupPolicy};

const fn default_work_batch_size() -> usize {
    1
}

const fn default_true() -> bool {
    true
}

/// Manager configuration.
///
/// The tracing categories are free-form labels attached to the manager's
/// spans and events; they have no effect on scheduling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Maximum tasks run by one non-nested pass.
    #[serde(default = "default_work_batch_size")]
    pub work_batch_size: usize,
    /// Primary tracing category.
    #[serde(default)]
    pub tracing_category: String,
    /// Category for detailed tracing that is off by default.
    #[serde(default)]
    pub disabled_by_default_tracing_category: String,
    /// Category for verbose tracing that is off by default.
    #[serde(default)]
    pub disabled_by_default_verbose_tracing_category: String,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            work_batch_size: default_work_batch_size(),
            tracing_category: "task_queue_manager".into(),
            disabled_by_default_tracing_category: "task_queue_manager.debug".into(),
            disabled_by_default_verbose_tracing_category: "task_queue_manager.verbose".into(),
        }
    }
}

impl ManagerConfig {
    /// Default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the work batch size.
    #[must_use]
    pub const fn with_work_batch_size(mut self, work_batch_size: usize) -> Self {
        self.work_batch_size = work_batch_size;
        self
    }

    /// Set the primary tracing category.
    #[must_use]
    pub fn with_tracing_category(mut self, category: impl Into<String>) -> Self {
        self.tracing_category = category.into();
        self
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if self.work_batch_size == 0 {
            return Err("work_batch_size must be greater than 0".into());
        }
        Ok(())
    }
}

/// Serializable description of a queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Queue name; unique within a scheduler configuration.
    pub name: String,
    /// Initial priority.
    #[serde(default)]
    pub priority: QueuePriority,
    /// Promotion policy.
    #[serde(default)]
    pub pump_policy: PumpPolicy,
    /// Wake-up policy.
    #[serde(default)]
    pub wakeup_policy: WakeupPolicy,
    /// Record runs for quiescence checks.
    #[serde(default)]
    pub should_monitor_quiescence: bool,
    /// Notify task observers.
    #[serde(default = "default_true")]
    pub should_notify_observers: bool,
    /// Initial enabled state.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl QueueConfig {
    /// Queue description with default policies.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            priority: QueuePriority::Normal,
            pump_policy: PumpPolicy::Auto,
            wakeup_policy: WakeupPolicy::CanWakeOtherQueues,
            should_monitor_quiescence: false,
            should_notify_observers: true,
            enabled: true,
        }
    }

    /// Validate queue values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("queue name must not be empty".into());
        }
        Ok(())
    }
}

impl From<&QueueConfig> for TaskQueueSpec {
    fn from(cfg: &QueueConfig) -> Self {
        Self::new(cfg.name.clone())
            .with_priority(cfg.priority)
            .with_pump_policy(cfg.pump_policy)
            .with_wakeup_policy(cfg.wakeup_policy)
            .with_should_monitor_quiescence(cfg.should_monitor_quiescence)
            .with_should_notify_observers(cfg.should_notify_observers)
            .with_enabled(cfg.enabled)
    }
}

/// Root scheduler configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Manager settings.
    #[serde(default)]
    pub manager: ManagerConfig,
    /// Queues to create, in creation order.
    #[serde(default)]
    pub queues: Vec<QueueConfig>,
}

impl SchedulerConfig {
    /// Validate the manager section and every queue; queue names must be
    /// unique.
    ///
    /// # Errors
    ///
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        self.manager
            .validate()
            .map_err(|e| format!("manager invalid: {e}"))?;
        let mut seen = HashSet::new();
        for queue in &self.queues {
            queue
                .validate()
                .map_err(|e| format!("queue `{}` invalid: {e}", queue.name))?;
            if !seen.insert(queue.name.as_str()) {
                return Err(format!("duplicate queue name `{}`", queue.name));
            }
        }
        Ok(())
    }

    /// Parse scheduler configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a description of the parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_config_into_spec() {
        let mut cfg = QueueConfig::new("input");
        cfg.priority = QueuePriority::High;
        cfg.pump_policy = PumpPolicy::Manual;
        cfg.enabled = false;
        let spec = TaskQueueSpec::from(&cfg);
        assert_eq!(spec.name, "input");
        assert_eq!(spec.priority, QueuePriority::High);
        assert_eq!(spec.pump_policy, PumpPolicy::Manual);
        assert!(!spec.enabled);
        assert!(spec.time_domain.is_none());
    }

    #[test]
    fn test_default_manager_config_is_valid() {
        assert!(ManagerConfig::default().validate().is_ok());
        assert_eq!(ManagerConfig::default().work_batch_size, 1);
    }
}
