//! Download worker lifecycle
//!
//! A [`Worker`] runs one user-supplied task function on its own tokio task
//! for its entire life. Cancellation comes in two tiers:
//!
//! - cooperative: [`Worker::stop`] sets a flag that the task observes at its
//!   next [`WorkerContext::check_exit`] poll (or by awaiting
//!   [`WorkerContext::stopped`]). A task blocked in a long operation that
//!   never polls will not react to `stop()`, if ever.
//! - forced: [`Worker::force_terminate`] injects an abort into the task's
//!   execution unit from outside. It lands at the next await point; see
//!   [`terminate`] for the staleness guarantees.
//!
//! Whatever way the task ends — normal return, an error it raised, a panic,
//! cooperative stop or forced termination — the exit callback fires exactly
//! once. Errors inside the task never propagate out of the worker; handling
//! and logging them is the task's own business.
//!
//! ```no_run
//! use std::time::Duration;
//! use fetchpool::worker::{TaskFn, WorkerContext, WorkerPool};
//!
//! # async fn demo() {
//! let pool = WorkerPool::start_pool(
//!     2,
//!     TaskFn(|worker: WorkerContext| async move {
//!         loop {
//!             worker.check_exit()?;
//!             // fetch the next chunk...
//!             tokio::time::sleep(Duration::from_millis(100)).await;
//!         }
//!     }),
//!     |worker: &WorkerContext| tracing::warn!(worker = worker.name(), "worker exited"),
//! );
//!
//! pool.stop_all();
//! pool.join_all().await;
//! # }
//! ```

pub mod pool;
pub mod terminate;

use std::future::Future;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::debug;

pub use pool::WorkerPool;
pub use terminate::TerminateError;

use terminate::TerminationSlot;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// How a task body ends early.
#[derive(Debug, Error)]
pub enum TaskError {
    /// A stop request was observed at a `check_exit` poll point.
    #[error("stop requested")]
    Stopped,

    /// Any other failure inside the task body. Swallowed at the worker
    /// boundary; the exit callback still fires.
    #[error("task failed: {0}")]
    Failed(#[source] AnyError),
}

impl TaskError {
    pub fn failed(err: impl Into<AnyError>) -> Self {
        TaskError::Failed(err.into())
    }
}

/// The long-lived function a worker executes.
///
/// Invoked exactly once per worker lifetime; the task owns its whole run
/// loop internally. Long-running bodies should call
/// [`WorkerContext::check_exit`] periodically to honor cooperative stop.
#[async_trait]
pub trait WorkerTask: Send + Sync + 'static {
    async fn run(&self, worker: WorkerContext) -> Result<(), TaskError>;
}

/// Adapts a closure returning a future into a [`WorkerTask`].
pub struct TaskFn<F>(pub F);

#[async_trait]
impl<F, Fut> WorkerTask for TaskFn<F>
where
    F: Fn(WorkerContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    async fn run(&self, worker: WorkerContext) -> Result<(), TaskError> {
        (self.0)(worker).await
    }
}

/// Callback invoked exactly once when a worker exits, with the worker's own
/// context as argument. May run concurrently for workers exiting at the same
/// time, so it must be internally synchronized if it mutates shared state.
pub type ExitHook = Arc<dyn Fn(&WorkerContext) + Send + Sync>;

#[derive(Debug)]
struct Shared {
    id: usize,
    name: String,
    stop: CancellationToken,
    slot: TerminationSlot,
}

/// Handle given to the task function and the exit callback.
#[derive(Debug, Clone)]
pub struct WorkerContext {
    shared: Arc<Shared>,
}

impl WorkerContext {
    /// 1-based sequence number, unique within a pool.
    pub fn id(&self) -> usize {
        self.shared.id
    }

    /// Derived display name, `download-thread-{id}`.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Cooperative cancellation point.
    ///
    /// Returns `Err(TaskError::Stopped)` once [`Worker::stop`] was called;
    /// propagating that error with `?` performs the same exit sequence as
    /// normal completion. This is the only poll point the task is
    /// contractually required to honor.
    pub fn check_exit(&self) -> Result<(), TaskError> {
        if self.shared.stop.is_cancelled() {
            Err(TaskError::Stopped)
        } else {
            Ok(())
        }
    }

    pub fn stop_requested(&self) -> bool {
        self.shared.stop.is_cancelled()
    }

    /// Resolves once a stop has been requested, for tasks that prefer
    /// `select!`-style cancellation over polling.
    pub fn stopped(&self) -> WaitForCancellationFuture<'_> {
        self.shared.stop.cancelled()
    }
}

/// One unit of concurrent execution wrapping a user task function.
#[derive(Debug)]
pub struct Worker {
    shared: Arc<Shared>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl Worker {
    /// Create and immediately start a worker. Must be called from within a
    /// tokio runtime; the spawned tasks do not block process shutdown.
    pub fn spawn(id: usize, task: Arc<dyn WorkerTask>, on_exit: ExitHook) -> Worker {
        let shared = Arc::new(Shared {
            id,
            name: format!("download-thread-{id}"),
            stop: CancellationToken::new(),
            slot: TerminationSlot::new(),
        });

        let ctx = WorkerContext {
            shared: shared.clone(),
        };
        let inner = tokio::spawn(async move { task.run(ctx).await });
        shared.slot.arm(inner.abort_handle());

        let sup_shared = shared.clone();
        let supervisor = tokio::spawn(async move {
            let outcome = match inner.await {
                Ok(Ok(())) => "completed",
                Ok(Err(TaskError::Stopped)) => "stopped",
                Ok(Err(TaskError::Failed(_))) => "failed",
                Err(err) if err.is_cancelled() => "terminated",
                Err(_) => "panicked",
            };
            sup_shared.slot.retire();
            debug!(worker = %sup_shared.name, outcome, "worker exited");

            let ctx = WorkerContext { shared: sup_shared };
            on_exit(&ctx);
        });

        Worker {
            shared,
            supervisor: Mutex::new(Some(supervisor)),
        }
    }

    pub fn id(&self) -> usize {
        self.shared.id
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Request a cooperative stop.
    ///
    /// Only takes effect the next time the task polls
    /// [`WorkerContext::check_exit`] (or awaits [`WorkerContext::stopped`]).
    /// A task blocked in a long-running, non-polling operation will not
    /// respond until it returns control and polls again, if ever.
    pub fn stop(&self) {
        self.shared.stop.cancel();
    }

    pub fn stop_requested(&self) -> bool {
        self.shared.stop.is_cancelled()
    }

    /// Inject a termination signal into the worker's execution unit.
    ///
    /// Best-effort: the abort lands at the task's next await point. Fails
    /// with [`TerminateError::TargetNotFound`] once the worker has exited
    /// and with [`TerminateError::AlreadyTerminated`] on a second injection.
    pub fn force_terminate(&self) -> Result<(), TerminateError> {
        self.shared.slot.inject(&self.shared.name)
    }

    /// Whether the worker has exited.
    pub fn is_finished(&self) -> bool {
        self.shared.slot.is_retired()
    }

    /// Wait for the worker to exit. The exit callback has completed by the
    /// time this returns. Subsequent calls return immediately.
    pub async fn join(&self) {
        let handle = match self.supervisor.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn noop_hook() -> ExitHook {
        Arc::new(|_worker: &WorkerContext| {})
    }

    #[tokio::test]
    async fn worker_derives_name_from_id() {
        let task: Arc<dyn WorkerTask> = Arc::new(TaskFn(|_w: WorkerContext| async { Ok(()) }));
        let worker = Worker::spawn(7, task, noop_hook());

        assert_eq!(worker.id(), 7);
        assert_eq!(worker.name(), "download-thread-7");
        worker.join().await;
    }

    #[tokio::test]
    async fn check_exit_reflects_stop_flag() {
        let polls = Arc::new(AtomicUsize::new(0));
        let seen = polls.clone();
        let task: Arc<dyn WorkerTask> = Arc::new(TaskFn(move |w: WorkerContext| {
            let seen = seen.clone();
            async move {
                w.check_exit()?;
                seen.fetch_add(1, Ordering::SeqCst);
                w.stopped().await;
                w.check_exit()?;
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }));
        let worker = Worker::spawn(1, task, noop_hook());

        // Let the task reach its first poll before requesting the stop.
        tokio::task::yield_now().await;
        worker.stop();
        worker.join().await;
        // First poll passes, the post-stop poll exits the task.
        assert_eq!(polls.load(Ordering::SeqCst), 1);
        assert!(worker.is_finished());
    }

    #[tokio::test]
    async fn join_is_idempotent() {
        let task: Arc<dyn WorkerTask> = Arc::new(TaskFn(|_w: WorkerContext| async { Ok(()) }));
        let worker = Worker::spawn(1, task, noop_hook());

        worker.join().await;
        worker.join().await;
        assert!(worker.is_finished());
    }
}
