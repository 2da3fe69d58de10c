//! The run-loop integration the manager schedules through.

use std::panic::Location;
use std::time::{Duration, Instant};

use super::task::Closure;

/// Abstraction over the event loop that owns a [`TaskQueueManager`].
///
/// The manager never runs work on its own: every scheduling pass is posted
/// through the delegate, which decides when and where it runs. All passes
/// must run on the delegate's owning thread.
///
/// [`TaskQueueManager`]: crate::core::TaskQueueManager
pub trait TaskQueueManagerDelegate: Send + Sync {
    /// Post a closure to run on the owning thread.
    fn post_task(&self, from: &'static Location<'static>, task: Closure);

    /// Post a closure to run on the owning thread after `delay`.
    fn post_delayed_task(&self, from: &'static Location<'static>, task: Closure, delay: Duration);

    /// Post a closure that must not run inside a nested run loop. It runs
    /// once the loop is back at the outermost level.
    fn post_non_nestable_task(&self, from: &'static Location<'static>, task: Closure);

    /// True if the caller is on the thread the manager belongs to.
    fn belongs_to_current_thread(&self) -> bool;

    /// True if posted tasks run on the calling thread.
    fn runs_tasks_on_current_thread(&self) -> bool;

    /// True while a nested run loop is active on the owning thread.
    fn is_nested(&self) -> bool;

    /// Called at the end of a pass that left no immediate work behind.
    fn on_no_more_immediate_work(&self);

    /// Current tick time as seen by this loop.
    fn now_ticks(&self) -> Instant;
}
