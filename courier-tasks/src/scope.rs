//! Fork/join scope shared by the runner entry points
//!
//! A scope owns a `JoinSet` of children, the deadline computed when it
//! opened, and the context snapshot children inherit. Dropping a scope aborts
//! every child that has not been joined.

use crate::context::ScopeContext;
use crate::error::{panic_message, unwrap_root_message, PanicError};
use crate::options::ScopeOptions;
use courier_core::{BoxError, SharedError, TaskError};
use futures_util::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::Instrument;

/// How a child ended, before it is mapped into an outcome or error.
pub(crate) enum ChildError {
    Failed(SharedError),
    Panicked(String),
}

impl ChildError {
    pub(crate) fn into_shared(self) -> SharedError {
        match self {
            ChildError::Failed(source) => source,
            ChildError::Panicked(message) => Arc::new(PanicError { message }),
        }
    }

    pub(crate) fn into_task_error(self, index: usize) -> TaskError {
        match self {
            ChildError::Failed(source) => TaskError::Failed {
                index,
                message: unwrap_root_message(&*source),
                source,
            },
            ChildError::Panicked(message) => TaskError::Panicked { index, message },
        }
    }
}

type ChildResult<T> = (usize, Result<T, ChildError>);

pub(crate) enum Joined<T> {
    Done(usize, Result<T, ChildError>),
    TimedOut,
    Exhausted,
}

pub(crate) struct TaskScope<'a, T> {
    options: &'a ScopeOptions,
    children: JoinSet<ChildResult<T>>,
    context: ScopeContext,
    deadline: Option<Instant>,
    forked: usize,
}

impl<'a, T: Send + 'static> TaskScope<'a, T> {
    pub(crate) fn open(options: &'a ScopeOptions) -> Self {
        Self {
            options,
            children: JoinSet::new(),
            context: ScopeContext::current(),
            deadline: options.timeout().map(|timeout| Instant::now() + timeout),
            forked: 0,
        }
    }

    pub(crate) fn label(&self) -> &str {
        self.options.scope_label()
    }

    pub(crate) fn forked(&self) -> usize {
        self.forked
    }

    /// Start `task` as the next child. Its index is its fork position.
    pub(crate) fn fork<F, E>(&mut self, task: F) -> usize
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        let index = self.forked;
        self.forked += 1;

        let worker = self.options.worker_name(index);
        let span = tracing::debug_span!("task", scope = %self.label(), worker = %worker, index);
        let context = self.context.clone();

        self.children.spawn(
            async move {
                let result = match AssertUnwindSafe(context.scope(task)).catch_unwind().await {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(error)) => {
                        let boxed: BoxError = error.into();
                        Err(ChildError::Failed(Arc::from(boxed)))
                    }
                    Err(payload) => Err(ChildError::Panicked(panic_message(&*payload))),
                };
                if let Err(ChildError::Panicked(message)) = &result {
                    tracing::warn!(panic = %message, "Task panicked");
                }
                (index, result)
            }
            .instrument(span),
        );
        index
    }

    /// Wait for the next child to finish, or for the deadline to pass.
    pub(crate) async fn join_next(&mut self) -> Joined<T> {
        loop {
            let next = match self.deadline {
                Some(deadline) => {
                    match tokio::time::timeout_at(deadline, self.children.join_next()).await {
                        Ok(next) => next,
                        Err(_) => return Joined::TimedOut,
                    }
                }
                None => self.children.join_next().await,
            };

            match next {
                None => return Joined::Exhausted,
                Some(Ok((index, result))) => return Joined::Done(index, result),
                Some(Err(e)) => {
                    tracing::warn!(scope = %self.label(), error = %e, "Task did not run to completion");
                }
            }
        }
    }

    /// Abort every unfinished child and wait until they are gone.
    pub(crate) async fn cancel(&mut self) {
        if !self.children.is_empty() {
            tracing::debug!(
                scope = %self.label(),
                pending = self.children.len(),
                "Cancelling unfinished tasks"
            );
        }
        self.children.shutdown().await;
    }

    pub(crate) fn timeout(&self) -> Duration {
        self.options.timeout().unwrap_or_default()
    }

    pub(crate) fn timed_out(&self) -> TaskError {
        tracing::warn!(scope = %self.label(), timeout = ?self.timeout(), "Scope deadline expired");
        TaskError::TimedOut {
            scope: self.label().to_string(),
            timeout: self.timeout(),
        }
    }

    pub(crate) fn cancelled(&self) -> TaskError {
        TaskError::Cancelled {
            scope: self.label().to_string(),
        }
    }
}
