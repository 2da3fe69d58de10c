//! # TaskQ Scheduler
//!
//! A cooperative, multi-queue task scheduling engine for single-threaded
//! event loops.
//!
//! Many producers post closures onto named [`TaskQueue`]s, from any thread.
//! A [`TaskQueueManager`] multiplexes those queues onto the one thread that
//! owns it, running a bounded batch of tasks per scheduling pass and picking
//! every task through a pluggable [`Selector`].
//!
//! ## Core Problem Solved
//!
//! An event loop that serves input, rendering, timers and background work
//! needs more than a single FIFO:
//!
//! - **Priorities**: latency-sensitive queues must overtake bulk work
//! - **Deferral**: some queues should only run when poked (manually or after
//!   another task woke them)
//! - **Virtual time**: delayed work may follow the wall clock or a clock the
//!   embedder controls
//! - **Re-entrancy**: tasks may spin nested loops or even tear the scheduler
//!   down mid-pass
//!
//! ## Key Features
//!
//! - **Per-queue FIFO**: tasks from one queue run in post order
//! - **Pump policies**: [`PumpPolicy::Auto`], [`PumpPolicy::AfterWakeup`],
//!   [`PumpPolicy::Manual`]
//! - **Time domains**: [`RealTimeDomain`] by default, custom [`TimeDomain`]s
//!   for virtual time
//! - **Coalesced passes**: at most one self-posted pass per manager
//! - **Delegates**: a nestable [`RunLoop`] and, with the `tokio-runtime`
//!   feature, a tokio adapter
//!
//! ```rust,ignore
//! use taskq_scheduler::core::{QueuePriority, TaskQueueManager, TaskQueueSpec};
//! use taskq_scheduler::runtime::RunLoop;
//!
//! let run_loop = RunLoop::new();
//! let manager = TaskQueueManager::new(run_loop.clone());
//! let input = manager.new_task_queue(
//!     TaskQueueSpec::new("input").with_priority(QueuePriority::High),
//! )?;
//! input.post_task(|| println!("handled"))?;
//! run_loop.run_until_idle();
//! ```
//!
//! For complete examples, see:
//! - `tests/manager_test.rs` - Scheduling pass integration tests
//! - `tests/nested_loop_test.rs` - Nested loops and self-deletion
//!
//! [`TaskQueue`]: core::TaskQueue
//! [`TaskQueueManager`]: core::TaskQueueManager
//! [`Selector`]: core::Selector
//! [`PumpPolicy::Auto`]: core::PumpPolicy::Auto
//! [`PumpPolicy::AfterWakeup`]: core::PumpPolicy::AfterWakeup
//! [`PumpPolicy::Manual`]: core::PumpPolicy::Manual
//! [`RealTimeDomain`]: core::RealTimeDomain
//! [`TimeDomain`]: core::TimeDomain
//! [`RunLoop`]: runtime::RunLoop

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions: queues, selection, time domains, manager.
pub mod core;
/// Configuration models for the manager and its queues.
pub mod config;
/// Builders to construct a manager and its queues from configuration.
pub mod builders;
/// Delegates that drive a manager.
pub mod runtime;
/// Shared utilities.
pub mod util;
