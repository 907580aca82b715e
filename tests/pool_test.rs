//! Worker lifecycle integration tests: pool construction, cooperative stop,
//! forced termination and exit-callback accounting.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::time::sleep;

use fetchpool::worker::{TaskError, TaskFn, TerminateError, WorkerContext, WorkerPool};

/// Exit hook that counts its invocations.
fn counting_hook() -> (Arc<AtomicUsize>, impl Fn(&WorkerContext) + Send + Sync + 'static) {
    let count = Arc::new(AtomicUsize::new(0));
    let sink = count.clone();
    (count, move |_worker: &WorkerContext| {
        sink.fetch_add(1, Ordering::SeqCst);
    })
}

#[tokio::test]
async fn pool_assigns_unique_ids_and_names() {
    let (_, hook) = counting_hook();
    let pool = WorkerPool::start_pool(3, TaskFn(|_w: WorkerContext| async { Ok(()) }), hook);

    let ids: Vec<usize> = pool.workers().iter().map(|w| w.id()).collect();
    assert_eq!(ids, vec![1, 2, 3]);

    let names: Vec<&str> = pool.workers().iter().map(|w| w.name()).collect();
    assert_eq!(
        names,
        vec![
            "download-thread-1",
            "download-thread-2",
            "download-thread-3",
        ]
    );

    pool.join_all().await;
}

#[tokio::test]
async fn zero_count_yields_an_empty_pool() {
    let (exits, hook) = counting_hook();
    let pool = WorkerPool::start_pool(0, TaskFn(|_w: WorkerContext| async { Ok(()) }), hook);

    assert!(pool.is_empty());
    assert_eq!(pool.len(), 0);
    pool.join_all().await;
    assert_eq!(exits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn exit_callback_fires_once_on_normal_completion() {
    let (exits, hook) = counting_hook();
    let pool = WorkerPool::start_pool(1, TaskFn(|_w: WorkerContext| async { Ok(()) }), hook);

    pool.join_all().await;
    assert_eq!(exits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn exit_callback_fires_once_on_task_failure() {
    let (exits, hook) = counting_hook();
    let pool = WorkerPool::start_pool(
        1,
        TaskFn(|_w: WorkerContext| async { Err(TaskError::failed("disk full")) }),
        hook,
    );

    pool.join_all().await;
    assert_eq!(exits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn exit_callback_fires_once_on_task_panic() {
    let (exits, hook) = counting_hook();
    let pool = WorkerPool::start_pool(
        1,
        TaskFn(|_w: WorkerContext| async { panic!("task blew up") }),
        hook,
    );

    pool.join_all().await;
    assert_eq!(exits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn exit_callback_fires_once_on_cooperative_stop() {
    let (exits, hook) = counting_hook();
    let pool = WorkerPool::start_pool(
        1,
        TaskFn(|w: WorkerContext| async move {
            loop {
                w.check_exit()?;
                sleep(Duration::from_millis(5)).await;
            }
        }),
        hook,
    );

    sleep(Duration::from_millis(20)).await;
    pool.workers()[0].stop();
    pool.join_all().await;
    assert_eq!(exits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn exit_callback_fires_once_on_forced_termination() {
    let (exits, hook) = counting_hook();
    let pool = WorkerPool::start_pool(
        1,
        TaskFn(|_w: WorkerContext| async {
            std::future::pending::<()>().await;
            Ok(())
        }),
        hook,
    );

    sleep(Duration::from_millis(10)).await;
    pool.workers()[0].force_terminate().unwrap();
    pool.join_all().await;
    assert_eq!(exits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn stop_without_a_poll_never_exits() {
    let (exits, hook) = counting_hook();
    let pool = WorkerPool::start_pool(
        1,
        TaskFn(|_w: WorkerContext| async {
            // Never polls check_exit, so stop() alone must not end it.
            std::future::pending::<()>().await;
            Ok(())
        }),
        hook,
    );

    let worker = &pool.workers()[0];
    worker.stop();
    sleep(Duration::from_millis(50)).await;
    assert!(!worker.is_finished());
    assert_eq!(exits.load(Ordering::SeqCst), 0);

    worker.force_terminate().unwrap();
    pool.join_all().await;
    assert_eq!(exits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn force_terminate_after_exit_reports_target_not_found() {
    let (_, hook) = counting_hook();
    let pool = WorkerPool::start_pool(1, TaskFn(|_w: WorkerContext| async { Ok(()) }), hook);
    pool.join_all().await;

    let err = pool.workers()[0].force_terminate().unwrap_err();
    assert!(matches!(err, TerminateError::TargetNotFound { .. }));
}

#[tokio::test]
async fn double_force_terminate_fails_loudly() {
    let (_, hook) = counting_hook();
    let pool = WorkerPool::start_pool(
        1,
        TaskFn(|_w: WorkerContext| async {
            std::future::pending::<()>().await;
            Ok(())
        }),
        hook,
    );

    // Single-threaded test runtime: the worker cannot exit between the two
    // calls, so the second injection is deterministically rejected.
    let worker = &pool.workers()[0];
    worker.force_terminate().unwrap();
    let err = worker.force_terminate().unwrap_err();
    assert!(matches!(err, TerminateError::AlreadyTerminated { .. }));

    pool.join_all().await;
}

#[tokio::test]
async fn stopping_one_worker_leaves_the_others_running() {
    let (exits, hook) = counting_hook();
    let pool = WorkerPool::start_pool(
        2,
        TaskFn(|w: WorkerContext| async move {
            loop {
                w.check_exit()?;
                sleep(Duration::from_millis(5)).await;
            }
        }),
        hook,
    );

    pool.workers()[0].stop();
    pool.workers()[0].join().await;
    assert_eq!(exits.load(Ordering::SeqCst), 1);
    assert!(!pool.workers()[1].is_finished());
    assert!(!pool.workers()[1].stop_requested());

    pool.workers()[1].stop();
    pool.join_all().await;
    assert_eq!(exits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn select_style_tasks_observe_stop_promptly() {
    let (exits, hook) = counting_hook();
    let pool = WorkerPool::start_pool(
        1,
        TaskFn(|w: WorkerContext| async move {
            w.stopped().await;
            w.check_exit()
        }),
        hook,
    );

    pool.stop_all();
    pool.join_all().await;
    assert_eq!(exits.load(Ordering::SeqCst), 1);
}
