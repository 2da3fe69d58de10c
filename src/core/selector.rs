//! Queue selection policy.
//!
//! The manager asks the selector for one queue per task it runs, so priority
//! is honoured at task granularity even inside a single batch.

use std::collections::VecDeque;
use std::sync::Arc;

use super::task_queue::{QueuePriority, TaskQueue};

/// Listener fired when a disabled queue becomes enabled.
pub trait SelectorObserver: Send + Sync {
    /// `queue` went from disabled to enabled. It may or may not have work.
    fn on_task_queue_enabled(&self, queue: &TaskQueue);
}

/// Chooses which queue to service next.
///
/// The selector is authoritative for queue priority and enabled state.
/// Implementations must only return enabled queues whose work buffer is
/// non-empty, and must fire the observer on every disabled-to-enabled edge.
/// The observer is invoked while the manager holds the selector, so it must
/// not call back into the selector.
pub trait Selector: Send {
    /// Start tracking a queue (enabled, [`QueuePriority::Normal`]).
    fn add_queue(&mut self, queue: &TaskQueue);

    /// Stop tracking a queue.
    fn remove_queue(&mut self, queue: &TaskQueue);

    /// Change a tracked queue's priority.
    fn set_queue_priority(&mut self, queue: &TaskQueue, priority: QueuePriority);

    /// Priority of a tracked queue.
    fn queue_priority(&self, queue: &TaskQueue) -> Option<QueuePriority>;

    /// Enable or disable a tracked queue.
    fn set_queue_enabled(&mut self, queue: &TaskQueue, enabled: bool);

    /// Whether a tracked queue is enabled. Untracked queues are not.
    fn is_queue_enabled(&self, queue: &TaskQueue) -> bool;

    /// Pick the next queue to run a task from, or `None` if no enabled queue
    /// has ready work.
    fn select_queue_to_service(&mut self) -> Option<TaskQueue>;

    /// True if any enabled queue has ready work.
    fn has_enabled_work(&self) -> bool;

    /// Install or clear the enabled-edge listener.
    fn set_observer(&mut self, observer: Option<Arc<dyn SelectorObserver>>);
}

struct Slot {
    queue: TaskQueue,
    enabled: bool,
}

impl Slot {
    fn is_eligible(&self) -> bool {
        self.enabled && self.queue.has_work()
    }
}

/// Strict-priority selector with round-robin rotation inside each priority.
///
/// A higher priority class with ready work always wins. Within a class, the
/// serviced queue moves to the back of the rotation so that every queue in
/// the class gets a turn.
pub struct PrioritySelector {
    buckets: [VecDeque<Slot>; QueuePriority::COUNT],
    observer: Option<Arc<dyn SelectorObserver>>,
}

impl PrioritySelector {
    /// Empty selector.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buckets: std::array::from_fn(|_| VecDeque::new()),
            observer: None,
        }
    }

    /// Number of tracked queues.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.iter().map(VecDeque::len).sum()
    }

    /// True if no queue is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(VecDeque::is_empty)
    }

    fn locate(&self, queue: &TaskQueue) -> Option<(usize, usize)> {
        self.buckets.iter().enumerate().find_map(|(bucket, slots)| {
            slots
                .iter()
                .position(|slot| slot.queue == *queue)
                .map(|index| (bucket, index))
        })
    }

    fn slot(&self, queue: &TaskQueue) -> Option<&Slot> {
        self.locate(queue).map(|(bucket, index)| &self.buckets[bucket][index])
    }
}

impl Default for PrioritySelector {
    fn default() -> Self {
        Self::new()
    }
}

impl Selector for PrioritySelector {
    fn add_queue(&mut self, queue: &TaskQueue) {
        if self.locate(queue).is_some() {
            return;
        }
        self.buckets[QueuePriority::Normal.index()].push_back(Slot {
            queue: queue.clone(),
            enabled: true,
        });
    }

    fn remove_queue(&mut self, queue: &TaskQueue) {
        if let Some((bucket, index)) = self.locate(queue) {
            self.buckets[bucket].remove(index);
        }
    }

    fn set_queue_priority(&mut self, queue: &TaskQueue, priority: QueuePriority) {
        let Some((bucket, index)) = self.locate(queue) else {
            return;
        };
        if bucket == priority.index() {
            return;
        }
        if let Some(slot) = self.buckets[bucket].remove(index) {
            self.buckets[priority.index()].push_back(slot);
        }
    }

    fn queue_priority(&self, queue: &TaskQueue) -> Option<QueuePriority> {
        self.locate(queue).map(|(bucket, _)| QueuePriority::ALL[bucket])
    }

    fn set_queue_enabled(&mut self, queue: &TaskQueue, enabled: bool) {
        let Some((bucket, index)) = self.locate(queue) else {
            return;
        };
        let slot = &mut self.buckets[bucket][index];
        let was_enabled = std::mem::replace(&mut slot.enabled, enabled);
        if !was_enabled && enabled {
            if let Some(observer) = &self.observer {
                observer.on_task_queue_enabled(queue);
            }
        }
    }

    fn is_queue_enabled(&self, queue: &TaskQueue) -> bool {
        self.slot(queue).is_some_and(|slot| slot.enabled)
    }

    fn select_queue_to_service(&mut self) -> Option<TaskQueue> {
        for slots in &mut self.buckets {
            if let Some(index) = slots.iter().position(Slot::is_eligible) {
                let slot = slots.remove(index)?;
                let queue = slot.queue.clone();
                slots.push_back(slot);
                return Some(queue);
            }
        }
        None
    }

    fn has_enabled_work(&self) -> bool {
        self.buckets.iter().flatten().any(Slot::is_eligible)
    }

    fn set_observer(&mut self, observer: Option<Arc<dyn SelectorObserver>>) {
        self.observer = observer;
    }
}
