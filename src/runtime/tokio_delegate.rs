//! Tokio runtime delegate.

use std::fmt;
use std::panic::Location;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::Notify;

use crate::core::{Closure, SchedulerError, TaskQueueManagerDelegate};

/// Delegate that posts passes onto a current-thread tokio runtime.
///
/// Every pass is spawned on the runtime, so it runs on the thread driving
/// that runtime. Multi-threaded runtimes are rejected because they could run
/// a pass on any worker. The runtime never nests, so non-nestable tasks are
/// plain spawns.
pub struct TokioDelegate {
    handle: Handle,
    owner: ThreadId,
    idle: Notify,
    idle_notifications: AtomicUsize,
}

impl TokioDelegate {
    /// Delegate for `handle`, owned by the calling thread.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConfig`] if `handle` does not belong
    /// to a current-thread runtime.
    pub fn new(handle: Handle) -> Result<Arc<Self>, SchedulerError> {
        if handle.runtime_flavor() != RuntimeFlavor::CurrentThread {
            return Err(SchedulerError::InvalidConfig(
                "tokio delegate requires a current-thread runtime".into(),
            ));
        }
        Ok(Arc::new(Self {
            handle,
            owner: thread::current().id(),
            idle: Notify::new(),
            idle_notifications: AtomicUsize::new(0),
        }))
    }

    /// Delegate for the runtime the caller is running in.
    ///
    /// # Errors
    ///
    /// Same as [`Self::new`].
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn current() -> Result<Arc<Self>, SchedulerError> {
        Self::new(Handle::current())
    }

    /// Resolves the next time a manager reports it has no immediate work.
    pub async fn wait_idle(&self) {
        self.idle.notified().await;
    }

    /// How many times a manager reported it ran out of immediate work.
    #[must_use]
    pub fn idle_notification_count(&self) -> usize {
        self.idle_notifications.load(Ordering::Acquire)
    }
}

impl TaskQueueManagerDelegate for TokioDelegate {
    fn post_task(&self, _from: &'static Location<'static>, task: Closure) {
        self.handle.spawn(async move { task() });
    }

    fn post_delayed_task(&self, _from: &'static Location<'static>, task: Closure, delay: Duration) {
        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
    }

    fn post_non_nestable_task(&self, from: &'static Location<'static>, task: Closure) {
        self.post_task(from, task);
    }

    fn belongs_to_current_thread(&self) -> bool {
        thread::current().id() == self.owner
    }

    fn runs_tasks_on_current_thread(&self) -> bool {
        self.belongs_to_current_thread()
    }

    fn is_nested(&self) -> bool {
        false
    }

    fn on_no_more_immediate_work(&self) {
        self.idle_notifications.fetch_add(1, Ordering::AcqRel);
        self.idle.notify_one();
    }

    fn now_ticks(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}

impl fmt::Debug for TokioDelegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioDelegate")
            .field("owner", &self.owner)
            .field("idle_notifications", &self.idle_notification_count())
            .finish_non_exhaustive()
    }
}
