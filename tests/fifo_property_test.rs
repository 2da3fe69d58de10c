//! Randomized ordering and delivery checks.
//!
//! Many queues with random priorities receive randomly interleaved posts,
//! some of them from inside running tasks, under a random batch size. Every
//! task must run exactly once, and tasks of one queue must run in post order.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use taskq_scheduler::config::ManagerConfig;
use taskq_scheduler::core::{QueuePriority, TaskQueue, TaskQueueManager, TaskQueueSpec};
use taskq_scheduler::runtime::RunLoop;

const QUEUES: usize = 5;
const POSTS: usize = 400;

/// `(queue index, per-queue post index)` in execution order.
type Trace = Arc<Mutex<Vec<(usize, usize)>>>;

struct Harness {
    queues: Vec<TaskQueue>,
    next_index: Arc<Mutex<Vec<usize>>>,
    trace: Trace,
}

impl Harness {
    fn post(&self, queue: usize, repost_to: Option<usize>) {
        let index = {
            let mut next = self.next_index.lock();
            let index = next[queue];
            next[queue] += 1;
            index
        };
        let trace = Arc::clone(&self.trace);
        let follow_up = repost_to.map(|target| {
            (
                self.queues[target].clone(),
                target,
                Arc::clone(&self.next_index),
                Arc::clone(&self.trace),
            )
        });
        self.queues[queue]
            .post_task(move || {
                trace.lock().push((queue, index));
                if let Some((target_queue, target, next_index, trace)) = follow_up {
                    let index = {
                        let mut next = next_index.lock();
                        let index = next[target];
                        next[target] += 1;
                        index
                    };
                    target_queue
                        .post_task(move || trace.lock().push((target, index)))
                        .unwrap();
                }
            })
            .unwrap();
    }
}

fn run_seed(seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let run_loop = RunLoop::new();
    let manager = TaskQueueManager::with_config(
        run_loop.clone(),
        ManagerConfig::default().with_work_batch_size(rng.random_range(1..=8)),
    )
    .unwrap();

    let queues = (0..QUEUES)
        .map(|i| {
            let priority = QueuePriority::ALL[rng.random_range(0..QueuePriority::COUNT)];
            manager
                .new_task_queue(TaskQueueSpec::new(format!("q{i}")).with_priority(priority))
                .unwrap()
        })
        .collect();
    let harness = Harness {
        queues,
        next_index: Arc::new(Mutex::new(vec![0; QUEUES])),
        trace: Arc::new(Mutex::new(Vec::new())),
    };

    for _ in 0..POSTS {
        let queue = rng.random_range(0..QUEUES);
        let repost_to = rng.random_bool(0.2).then(|| rng.random_range(0..QUEUES));
        harness.post(queue, repost_to);
        // Interleave partial draining with posting.
        if rng.random_bool(0.1) {
            run_loop.run_pending_tasks();
        }
    }
    run_loop.run_until_idle();

    let trace = harness.trace.lock();
    let posted: usize = harness.next_index.lock().iter().sum();
    assert_eq!(trace.len(), posted, "seed {seed}: every task runs exactly once");

    let mut last_seen: HashMap<usize, usize> = HashMap::new();
    for &(queue, index) in trace.iter() {
        if let Some(previous) = last_seen.insert(queue, index) {
            assert!(
                index > previous,
                "seed {seed}: queue {queue} ran {index} after {previous}"
            );
        }
    }
    for (queue, count) in harness.next_index.lock().iter().enumerate() {
        if *count > 0 {
            assert_eq!(last_seen.get(&queue), Some(&(count - 1)), "seed {seed}");
        }
    }
    assert!(harness.queues.iter().all(TaskQueue::is_queue_empty));
}

#[test]
fn test_fifo_and_delivery_hold_across_seeds() {
    for seed in 0..16 {
        run_seed(seed);
    }
}
