//! Bounded executors the scheduler dispatches onto.
//!
//! An executor is a named FIFO semaphore. The serialized worker holds one
//! permit, so its executions never overlap and start in dispatch order; the
//! pool holds `pool_size`.

use futures_util::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::handle::TaskId;

#[derive(Debug, Clone)]
pub(crate) struct Executor {
    name: Arc<str>,
    permits: Arc<Semaphore>,
}

/// How one execution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Executed {
    Completed,
    Panicked,
    /// Dropped mid-flight by a forced shutdown.
    Interrupted,
}

impl Executor {
    pub(crate) fn serial(name: &str) -> Self {
        Self::bounded(name, 1)
    }

    pub(crate) fn pool(name: &str, size: usize) -> Self {
        Self::bounded(name, size.max(1))
    }

    fn bounded(name: &str, permits: usize) -> Self {
        Self {
            name: Arc::from(name),
            permits: Arc::new(Semaphore::new(permits)),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Wait for a free slot unless `cancel` fires first.
    pub(crate) async fn acquire(&self, cancel: &CancellationToken) -> Option<OwnedSemaphorePermit> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            permit = self.permits.clone().acquire_owned() => permit.ok(),
        }
    }

    /// Run `job` to completion, or until `shutdown` fires.
    ///
    /// The caller must hold a permit from [`acquire`](Self::acquire).
    pub(crate) async fn execute<F>(&self, id: TaskId, shutdown: &CancellationToken, job: F) -> Executed
    where
        F: Future<Output = ()>,
    {
        let span = tracing::debug_span!("scheduled", worker = %self.name, id = %id);
        let guarded = AssertUnwindSafe(job).catch_unwind().instrument(span);

        tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                tracing::debug!(worker = %self.name, id = %id, "Scheduled task interrupted by shutdown");
                Executed::Interrupted
            }
            result = guarded => match result {
                Ok(()) => Executed::Completed,
                Err(panic) => {
                    tracing::error!(
                        worker = %self.name,
                        id = %id,
                        panic = %panic_message(&*panic),
                        "Scheduled task panicked"
                    );
                    Executed::Panicked
                }
            },
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
