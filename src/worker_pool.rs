//! A fixed-size thread pool over a FIFO task queue.
//!
//! Workers pop under a mutex and park on a condition variable. Dropping
//! the pool sets a stop flag, wakes everyone and joins; queued tasks that
//! have not started are discarded, but a task that is already running
//! always runs to completion. There is no cancellation and no structured
//! waiting: a task must never block on another task in the same pool.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use tracing::debug;

type Task = Box<dyn FnOnce() + Send + 'static>;

struct PoolQueue {
    tasks: VecDeque<Task>,
    stopping: bool,
}

struct PoolShared {
    queue: Mutex<PoolQueue>,
    available: Condvar,
}

/// A fixed-size pool of worker threads.
pub struct WorkerPool {
    shared: Arc<PoolShared>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `thread_count` workers (at least one).
    #[must_use]
    pub fn new(thread_count: usize) -> Self {
        let shared = Arc::new(PoolShared {
            queue: Mutex::new(PoolQueue {
                tasks: VecDeque::new(),
                stopping: false,
            }),
            available: Condvar::new(),
        });
        let count = thread_count.max(1);
        debug!(threads = count, "worker pool started");
        let workers = (0..count)
            .map(|_| {
                let shared = Arc::clone(&shared);
                std::thread::spawn(move || worker_loop(&shared))
            })
            .collect();
        Self { shared, workers }
    }

    /// A pool sized to the machine's available parallelism.
    #[must_use]
    pub fn with_default_size() -> Self {
        let threads = std::thread::available_parallelism().map_or(1, std::num::NonZero::get);
        Self::new(threads)
    }

    /// Enqueue `task` for execution by the next free worker.
    pub fn post<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut queue = self.shared.queue.lock().expect("pool queue poisoned");
        if queue.stopping {
            return;
        }
        queue.tasks.push_back(Box::new(task));
        drop(queue);
        self.shared.available.notify_one();
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        {
            let mut queue = self.shared.queue.lock().expect("pool queue poisoned");
            queue.stopping = true;
        }
        self.shared.available.notify_all();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
        debug!("worker pool stopped");
    }
}

fn worker_loop(shared: &PoolShared) {
    loop {
        let task = {
            let mut queue = shared.queue.lock().expect("pool queue poisoned");
            loop {
                if let Some(task) = queue.tasks.pop_front() {
                    break task;
                }
                if queue.stopping {
                    return;
                }
                queue = shared
                    .available
                    .wait(queue)
                    .expect("pool queue poisoned");
            }
        };
        task();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;

    #[test]
    fn runs_every_posted_task() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let pool = WorkerPool::new(4);
            let (sender, receiver) = mpsc::channel();
            for _ in 0..64 {
                let counter = Arc::clone(&counter);
                let sender = sender.clone();
                pool.post(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    sender.send(()).expect("send");
                });
            }
            for _ in 0..64 {
                receiver
                    .recv_timeout(std::time::Duration::from_secs(10))
                    .expect("task completion");
            }
        }
        assert_eq!(counter.load(Ordering::SeqCst), 64);
    }

    #[test]
    fn drop_joins_in_flight_tasks() {
        let counter = Arc::new(AtomicUsize::new(0));
        let pool = WorkerPool::new(2);
        for _ in 0..8 {
            let counter = Arc::clone(&counter);
            pool.post(move || {
                std::thread::sleep(std::time::Duration::from_millis(1));
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        drop(pool);
        // Whatever had started must have finished; nothing runs after join.
        let after_drop = counter.load(Ordering::SeqCst);
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert_eq!(counter.load(Ordering::SeqCst), after_drop);
    }
}
