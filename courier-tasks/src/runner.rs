//! Task runner entry points
//!
//! Every entry point opens a fresh [`TaskScope`], forks its tasks into it and
//! joins them before returning, so no child outlives the call. Results are
//! always reported in submission order.
//!
//! | Entry point        | Failure policy                                      |
//! |--------------------|-----------------------------------------------------|
//! | [`run_single`]     | first failure surfaces                              |
//! | [`run_all_or_fail`]| first failure surfaces, siblings cancelled          |
//! | [`run_batch`]      | failures recorded as outcomes, optional threshold   |
//! | [`run_any_success`]| first success wins, error only if every task failed |

use crate::context::ScopeContext;
use crate::error::{panic_message, root_message, BatchError};
use crate::outcome::{BatchResult, Outcome};
use crate::options::ScopeOptions;
use crate::scope::{ChildError, Joined, TaskScope};
use crate::worker::{spawn_named_worker, WorkerHandle};
use courier_core::{BoxError, TaskError};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A boxed task, for mixing differently typed futures in one submission.
pub type BoxTask<T> = BoxFuture<'static, Result<T, BoxError>>;

/// Box `task` so it can sit in a `Vec` next to other tasks.
pub fn boxed<T, E, F>(task: F) -> BoxTask<T>
where
    F: Future<Output = Result<T, E>> + Send + 'static,
    E: Into<BoxError>,
{
    task.map(|result| result.map_err(Into::into)).boxed()
}

// ============================================================================
// SINGLE TASK
// ============================================================================

/// Run one task in its own scope and return its result.
pub async fn run_single<T, E, F>(task: F, options: &ScopeOptions) -> Result<T, TaskError>
where
    T: Send + 'static,
    E: Into<BoxError> + Send + 'static,
    F: Future<Output = Result<T, E>> + Send + 'static,
{
    let mut scope = TaskScope::open(options);
    scope.fork(task);

    match scope.join_next().await {
        Joined::Done(_, Ok(value)) => Ok(value),
        Joined::Done(index, Err(e)) => Err(e.into_task_error(index)),
        Joined::TimedOut => {
            scope.cancel().await;
            Err(scope.timed_out())
        }
        Joined::Exhausted => Err(scope.cancelled()),
    }
}

// ============================================================================
// ALL OR FAIL
// ============================================================================

/// Run every task concurrently; all must succeed.
///
/// Returns the values in submission order. The first failure cancels the
/// remaining tasks and is returned without any partial results. An empty
/// submission succeeds with an empty list.
pub async fn run_all_or_fail<T, E, F, I>(tasks: I, options: &ScopeOptions) -> Result<Vec<T>, TaskError>
where
    T: Send + 'static,
    E: Into<BoxError> + Send + 'static,
    F: Future<Output = Result<T, E>> + Send + 'static,
    I: IntoIterator<Item = F>,
{
    let tasks: Vec<F> = tasks.into_iter().collect();
    if tasks.is_empty() {
        return Ok(Vec::new());
    }

    let mut scope = TaskScope::open(options);
    for task in tasks {
        scope.fork(task);
    }

    let mut slots: Vec<Option<T>> = (0..scope.forked()).map(|_| None).collect();
    loop {
        match scope.join_next().await {
            Joined::Done(index, Ok(value)) => {
                if let Some(slot) = slots.get_mut(index) {
                    *slot = Some(value);
                }
            }
            Joined::Done(index, Err(e)) => {
                let error = e.into_task_error(index);
                tracing::debug!(scope = %scope.label(), index, error = %error, "Task failed, cancelling siblings");
                scope.cancel().await;
                return Err(error);
            }
            Joined::TimedOut => {
                scope.cancel().await;
                return Err(scope.timed_out());
            }
            Joined::Exhausted => break,
        }
    }

    slots
        .into_iter()
        .collect::<Option<Vec<T>>>()
        .ok_or_else(|| scope.cancelled())
}

// ============================================================================
// BATCH
// ============================================================================

/// How [`run_batch`] reacts to failures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchPolicy {
    /// Cancel the scope once this many tasks have failed. 0 never cancels.
    pub cancel_after_failures: usize,
    /// Return [`BatchError::Failed`] if any outcome failed.
    pub throw_on_failure: bool,
}

impl BatchPolicy {
    /// Wait for every task and always return the outcomes.
    pub fn wait_for_all() -> Self {
        Self::default()
    }

    pub fn cancel_after(failures: usize) -> Self {
        Self {
            cancel_after_failures: failures,
            throw_on_failure: false,
        }
    }

    pub fn throw_on_failure(mut self, throw: bool) -> Self {
        self.throw_on_failure = throw;
        self
    }

    fn should_cancel(&self, failures: usize) -> bool {
        self.cancel_after_failures > 0 && failures >= self.cancel_after_failures
    }
}

/// Run every task and record one [`Outcome`] per task.
///
/// Tasks still running when the failure threshold trips or the deadline
/// expires end up [`Unavailable`](crate::OutcomeState::Unavailable). A
/// failure is only returned as an error when `throw_on_failure` is set; an
/// expired deadline is always returned as [`BatchError::TimedOut`].
pub async fn run_batch<T, E, F, I>(
    tasks: I,
    options: &ScopeOptions,
    policy: BatchPolicy,
) -> Result<BatchResult<T>, BatchError<T>>
where
    T: Send + 'static,
    E: Into<BoxError> + Send + 'static,
    F: Future<Output = Result<T, E>> + Send + 'static,
    I: IntoIterator<Item = F>,
{
    let tasks: Vec<F> = tasks.into_iter().collect();
    if tasks.is_empty() {
        return Ok(BatchResult::empty());
    }

    let mut scope = TaskScope::open(options);
    for task in tasks {
        scope.fork(task);
    }

    let mut slots: Vec<Option<Outcome<T>>> = (0..scope.forked()).map(|_| None).collect();
    let mut failures = 0usize;
    let mut cancelled = false;
    let mut timed_out = false;

    loop {
        match scope.join_next().await {
            Joined::Done(index, result) => {
                let outcome = match result {
                    Ok(value) => Outcome::success(index, value),
                    Err(e) => {
                        failures += 1;
                        Outcome::failed(index, e.into_shared())
                    }
                };
                if let Some(slot) = slots.get_mut(index) {
                    *slot = Some(outcome);
                }
                if policy.should_cancel(failures) {
                    tracing::debug!(scope = %scope.label(), failures, "Failure threshold reached");
                    scope.cancel().await;
                    cancelled = true;
                    break;
                }
            }
            Joined::TimedOut => {
                scope.cancel().await;
                cancelled = true;
                timed_out = true;
                break;
            }
            Joined::Exhausted => break,
        }
    }

    let outcomes = slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| slot.unwrap_or_else(|| Outcome::unavailable(index)))
        .collect();
    let result = BatchResult {
        outcomes,
        cancelled,
        timed_out,
    };

    if policy.throw_on_failure && result.has_failures() {
        return Err(BatchError::Failed { result });
    }
    if timed_out {
        let timeout = scope.timeout();
        tracing::warn!(scope = %scope.label(), timeout = ?timeout, "Batch deadline expired");
        return Err(BatchError::TimedOut { result, timeout });
    }
    Ok(result)
}

// ============================================================================
// ANY SUCCESS
// ============================================================================

/// Return the value of the first task to succeed and cancel the rest.
///
/// Fails with [`TaskError::AllFailed`] only when every task failed. An empty
/// submission is rejected with [`TaskError::InvalidArgument`].
pub async fn run_any_success<T, E, F, I>(tasks: I, options: &ScopeOptions) -> Result<T, TaskError>
where
    T: Send + 'static,
    E: Into<BoxError> + Send + 'static,
    F: Future<Output = Result<T, E>> + Send + 'static,
    I: IntoIterator<Item = F>,
{
    let tasks: Vec<F> = tasks.into_iter().collect();
    if tasks.is_empty() {
        return Err(TaskError::InvalidArgument {
            reason: "tasks must not be empty".to_string(),
        });
    }

    let mut scope = TaskScope::open(options);
    for task in tasks {
        scope.fork(task);
    }

    let mut failed = 0usize;
    let mut first_failure: Option<ChildError> = None;
    loop {
        match scope.join_next().await {
            Joined::Done(index, Ok(value)) => {
                tracing::debug!(scope = %scope.label(), index, "First success, cancelling the rest");
                scope.cancel().await;
                return Ok(value);
            }
            Joined::Done(_, Err(e)) => {
                failed += 1;
                if first_failure.is_none() {
                    first_failure = Some(e);
                }
            }
            Joined::TimedOut => {
                scope.cancel().await;
                return Err(scope.timed_out());
            }
            Joined::Exhausted => break,
        }
    }

    match first_failure {
        Some(e) => {
            let source = e.into_shared();
            Err(TaskError::AllFailed {
                count: failed,
                message: root_message(&source),
                source,
            })
        }
        None => Err(scope.cancelled()),
    }
}

// ============================================================================
// FUTURE BRIDGE
// ============================================================================

/// Result of [`run_as_future`]; resolves to the task's value or error.
#[derive(Debug)]
pub struct TaskFuture<T> {
    worker: WorkerHandle<Result<T, TaskError>>,
}

impl<T> TaskFuture<T> {
    pub fn worker_name(&self) -> &str {
        self.worker.name()
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    pub fn abort(&self) {
        self.worker.abort();
    }
}

impl<T> Future for TaskFuture<T> {
    type Output = Result<T, TaskError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.get_mut().worker).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(e)) => Poll::Ready(Err(e)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Run `task` through [`run_single`] on a dedicated worker without waiting.
///
/// The worker is named after [`ScopeOptions::future_worker_prefix`]. The
/// task starts immediately, whether or not the returned future is polled.
pub fn run_as_future<T, E, F>(task: F, options: ScopeOptions) -> TaskFuture<T>
where
    T: Send + 'static,
    E: Into<BoxError> + Send + 'static,
    F: Future<Output = Result<T, E>> + Send + 'static,
{
    let prefix = options.future_worker_prefix().to_string();
    let worker = spawn_named_worker(&prefix, async move { run_single(task, &options).await });
    TaskFuture { worker }
}

// ============================================================================
// BLOCKING WORK
// ============================================================================

/// Run the synchronous closure `f` on tokio's blocking pool.
///
/// `f` sees the caller's scope bindings. A panic inside `f` is resumed in
/// the caller so the enclosing task reports it as a panic.
pub async fn blocking<T, E, F>(f: F) -> Result<T, BoxError>
where
    T: Send + 'static,
    E: Into<BoxError> + Send + 'static,
    F: FnOnce() -> Result<T, E> + Send + 'static,
{
    let context = ScopeContext::current();
    match tokio::task::spawn_blocking(move || context.sync_scope(f)).await {
        Ok(result) => result.map_err(Into::into),
        Err(e) => match e.try_into_panic() {
            Ok(payload) => {
                tracing::warn!(panic = %panic_message(&*payload), "Blocking task panicked");
                std::panic::resume_unwind(payload)
            }
            Err(e) => Err(e.into()),
        },
    }
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_zero_threshold_never_cancels(failures in 0usize..1_000) {
            prop_assert!(!BatchPolicy::wait_for_all().should_cancel(failures));
        }

        #[test]
        fn prop_threshold_cancels_at_n(threshold in 1usize..50, failures in 0usize..100) {
            let policy = BatchPolicy::cancel_after(threshold);
            prop_assert_eq!(policy.should_cancel(failures), failures >= threshold);
        }
    }
}
