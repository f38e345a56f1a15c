//! Named workers
//!
//! A worker is one detached tokio task with a process-unique name. The name
//! is recorded on the worker's tracing span; the handle resolves to the
//! worker's output.

use crate::context::ScopeContext;
use crate::error::panic_message;
use courier_core::TaskError;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use tokio::task::{JoinError, JoinHandle};
use tracing::Instrument;

static WORKER_COUNTER: AtomicU64 = AtomicU64::new(0);

/// `prefix` plus the next value of the process-wide worker counter.
pub fn next_worker_name(prefix: &str) -> String {
    let n = WORKER_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    format!("{}-{}", prefix, n)
}

/// Spawn `body` as a detached worker named `{name_prefix}-{n}`.
///
/// The worker inherits the caller's scope bindings.
pub fn spawn_named_worker<F>(name_prefix: &str, body: F) -> WorkerHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let name = next_worker_name(name_prefix);
    let span = tracing::debug_span!("worker", worker = %name);
    let context = ScopeContext::current();
    let handle = tokio::spawn(context.scope(body).instrument(span));
    tracing::trace!(worker = %name, "Worker spawned");
    WorkerHandle { name, handle }
}

/// Handle to a running worker. Awaiting it yields the worker's output, or a
/// [`TaskError`] if the worker panicked or was aborted.
#[derive(Debug)]
pub struct WorkerHandle<T> {
    name: String,
    handle: JoinHandle<T>,
}

impl<T> WorkerHandle<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn abort(&self) {
        self.handle.abort();
    }
}

impl<T> Future for WorkerHandle<T> {
    type Output = Result<T, TaskError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.handle).poll(cx) {
            Poll::Ready(Ok(value)) => Poll::Ready(Ok(value)),
            Poll::Ready(Err(e)) => Poll::Ready(Err(worker_error(&this.name, e))),
            Poll::Pending => Poll::Pending,
        }
    }
}

fn worker_error(name: &str, error: JoinError) -> TaskError {
    match error.try_into_panic() {
        Ok(payload) => TaskError::Panicked {
            index: 0,
            message: panic_message(&*payload),
        },
        Err(_) => TaskError::Cancelled {
            scope: name.to_string(),
        },
    }
}
