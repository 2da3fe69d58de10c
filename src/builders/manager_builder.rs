//! Build a manager plus its named queues from configuration.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;

use crate::config::SchedulerConfig;
use crate::core::{AppResult, SchedulerError, TaskQueue, TaskQueueManager, TaskQueueManagerDelegate, TaskQueueSpec};

/// A manager together with the queues named in its configuration.
#[derive(Debug)]
pub struct BuiltScheduler {
    /// Queues keyed by configured name.
    pub queues: HashMap<String, TaskQueue>,
    /// The manager owning the queues. Declared last so queue handles are
    /// released before the manager tears down.
    pub manager: TaskQueueManager,
}

impl BuiltScheduler {
    /// Look up a queue by name.
    #[must_use]
    pub fn queue(&self, name: &str) -> Option<&TaskQueue> {
        self.queues.get(name)
    }
}

/// Build a manager and create every configured queue on the real-time
/// domain, in configuration order.
///
/// # Errors
///
/// Returns [`SchedulerError::InvalidConfig`] if the configuration does not
/// validate, or the error of the first queue that could not be created.
pub fn build_manager(
    cfg: &SchedulerConfig,
    delegate: Arc<dyn TaskQueueManagerDelegate>,
) -> Result<BuiltScheduler, SchedulerError> {
    cfg.validate().map_err(SchedulerError::InvalidConfig)?;

    let manager = TaskQueueManager::with_config(delegate, cfg.manager.clone())?;
    let mut queues = HashMap::with_capacity(cfg.queues.len());
    for queue_cfg in &cfg.queues {
        let queue = manager.new_task_queue(TaskQueueSpec::from(queue_cfg))?;
        queues.insert(queue_cfg.name.clone(), queue);
    }
    tracing::info!(queues = queues.len(), "scheduler built from configuration");
    Ok(BuiltScheduler { queues, manager })
}

/// Parse a JSON configuration and build from it.
///
/// # Errors
///
/// Fails if the JSON does not parse or validate, or if building fails.
pub fn build_manager_from_json(
    input: &str,
    delegate: Arc<dyn TaskQueueManagerDelegate>,
) -> AppResult<BuiltScheduler> {
    let cfg = SchedulerConfig::from_json_str(input)
        .map_err(anyhow::Error::msg)
        .context("loading scheduler configuration")?;
    build_manager(&cfg, delegate).context("building task queue manager")
}
