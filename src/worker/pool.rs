//! Fixed-size pools of download workers.
//!
//! The pool is the composition point the application uses to fan out one
//! task function across N workers and later join or individually stop them.
//! It holds no synchronization state of its own; coordination is entirely
//! per-worker.

use std::sync::Arc;

use tracing::debug;

use super::{ExitHook, Worker, WorkerContext, WorkerTask};

/// An ordered set of workers sharing one task function and exit callback.
#[derive(Debug)]
pub struct WorkerPool {
    workers: Vec<Worker>,
}

impl WorkerPool {
    /// Start `count` workers bound to the same task function.
    ///
    /// Workers get 1-based sequence numbers `1..=count` and names
    /// `download-thread-{id}`, all started before this returns. Their
    /// execution is concurrent with the caller and with each other, with no
    /// ordering guarantee across workers. A `count` of zero yields an empty
    /// pool with no workers started.
    pub fn start_pool<T, C>(count: usize, task: T, on_exit: C) -> WorkerPool
    where
        T: WorkerTask,
        C: Fn(&WorkerContext) + Send + Sync + 'static,
    {
        if count == 0 {
            return WorkerPool {
                workers: Vec::new(),
            };
        }

        let task: Arc<dyn WorkerTask> = Arc::new(task);
        let on_exit: ExitHook = Arc::new(on_exit);

        let mut workers = Vec::with_capacity(count);
        for id in 1..=count {
            workers.push(Worker::spawn(id, task.clone(), on_exit.clone()));
        }
        debug!(count, "worker pool started");

        WorkerPool { workers }
    }

    pub fn workers(&self) -> &[Worker] {
        &self.workers
    }

    pub fn get(&self, index: usize) -> Option<&Worker> {
        self.workers.get(index)
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Request a cooperative stop on every worker.
    pub fn stop_all(&self) {
        for worker in &self.workers {
            worker.stop();
        }
    }

    /// Wait for every worker to exit.
    pub async fn join_all(&self) {
        for worker in &self.workers {
            worker.join().await;
        }
    }
}
