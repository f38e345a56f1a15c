//! Delayed and fixed-rate scheduling
//!
//! Every scheduled task is one tokio task spawned on the runtime the
//! scheduler was created in. It waits for its start time, takes a permit
//! from its executor, runs, and untracks itself when it is done.
//!
//! Cancellation stops a task from starting again but never interrupts an
//! execution already running. Only [`Scheduler::shutdown`] (or a graceful
//! shutdown that runs out of time) interrupts in-flight work.

use crate::executor::{Executed, Executor};
use crate::handle::{ScheduledHandle, TaskId};
use courier_core::{SchedulerConfig, SchedulerError};
use dashmap::DashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

type Tracked = Arc<DashMap<TaskId, ScheduledHandle>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lane {
    Serial,
    Pool,
}

#[derive(Debug)]
struct Inner {
    config: SchedulerConfig,
    runtime: Handle,
    serial: Executor,
    pool: Executor,
    tasks: Tracked,
    next_id: AtomicU64,
    tracker: TaskTracker,
    /// Cancels everything, including running executions.
    shutdown: CancellationToken,
    /// Child of `shutdown`; cancels repeating tasks only.
    periodic: CancellationToken,
    closed: AtomicBool,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Runs work later, once or at a fixed rate, on a serialized worker or a
/// bounded pool. Clones share the same executors and tracking.
#[derive(Debug, Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Scheduler {
    /// Create a scheduler bound to the current tokio runtime.
    pub fn new(config: &SchedulerConfig) -> Result<Self, SchedulerError> {
        let runtime = Handle::try_current().map_err(|_| SchedulerError::NoRuntime)?;
        let shutdown = CancellationToken::new();
        let periodic = shutdown.child_token();

        tracing::info!(
            serial_worker = %config.serial_worker_name,
            pool_worker = %config.pool_worker_name,
            pool_size = config.pool_size,
            "Scheduler started"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                serial: Executor::serial(&config.serial_worker_name),
                pool: Executor::pool(&config.pool_worker_name, config.pool_size),
                config: config.clone(),
                runtime,
                tasks: Arc::new(DashMap::new()),
                next_id: AtomicU64::new(1),
                tracker: TaskTracker::new(),
                shutdown,
                periodic,
                closed: AtomicBool::new(false),
            }),
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    // ========================================================================
    // ONE-SHOT
    // ========================================================================

    /// Run `task` once on the serialized worker after `delay`.
    pub fn run_later<F>(&self, task: F, delay: Duration) -> Result<ScheduledHandle, SchedulerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.schedule_once(Lane::Serial, task, delay)
    }

    /// Run `task` once on the pool after `delay`.
    pub fn run_later_async<F>(&self, task: F, delay: Duration) -> Result<ScheduledHandle, SchedulerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.schedule_once(Lane::Pool, task, delay)
    }

    // ========================================================================
    // FIXED RATE
    // ========================================================================

    /// Run `task` on the serialized worker first after `delay`, then every
    /// `period` measured from the first start, until cancelled.
    pub fn run_repeating<F, Fut>(
        &self,
        task: F,
        delay: Duration,
        period: Duration,
    ) -> Result<ScheduledHandle, SchedulerError>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.schedule_repeating(Lane::Serial, task, delay, period)
    }

    /// Like [`run_repeating`](Self::run_repeating), on the pool.
    pub fn run_repeating_async<F, Fut>(
        &self,
        task: F,
        delay: Duration,
        period: Duration,
    ) -> Result<ScheduledHandle, SchedulerError>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.schedule_repeating(Lane::Pool, task, delay, period)
    }

    // ========================================================================
    // CANCELLATION
    // ========================================================================

    /// Stop `handle` from starting again and untrack it.
    ///
    /// Returns false when it had already finished or been cancelled. An
    /// execution in progress runs to completion.
    pub fn cancel(&self, handle: &ScheduledHandle) -> bool {
        let tracked = self.inner.tasks.remove(&handle.id()).is_some();
        handle.cancel();
        if tracked {
            tracing::debug!(id = %handle.id(), "Scheduled task cancelled");
        }
        tracked
    }

    /// Cancel every tracked task; returns how many there were.
    pub fn cancel_all(&self) -> usize {
        let mut cancelled = 0;
        self.inner.tasks.retain(|_, handle| {
            handle.cancel();
            cancelled += 1;
            false
        });
        tracing::debug!(cancelled, "Cancelled all scheduled tasks");
        cancelled
    }

    /// Number of tasks still waiting to run or repeating.
    pub fn active_count(&self) -> usize {
        self.inner.tasks.len()
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    // ========================================================================
    // SHUTDOWN
    // ========================================================================

    /// Cancel everything now, interrupting running executions.
    pub fn shutdown(&self) {
        self.inner.closed.store(true, Ordering::Release);
        self.inner.shutdown.cancel();
        self.inner.tasks.clear();
        self.inner.tracker.close();
        tracing::info!("Scheduler shut down");
    }

    /// Stop accepting work, stop repeating tasks, and let pending one-shots
    /// run. Forces [`shutdown`](Self::shutdown) if that takes longer than
    /// `timeout`. Returns true when everything finished in time.
    pub async fn shutdown_gracefully(&self, timeout: Duration) -> bool {
        self.inner.closed.store(true, Ordering::Release);
        self.inner.periodic.cancel();
        self.inner.tracker.close();

        let finished = tokio::time::timeout(timeout, self.inner.tracker.wait())
            .await
            .is_ok();

        if finished {
            self.inner.tasks.clear();
            tracing::info!("Scheduler shut down gracefully");
        } else {
            tracing::warn!(
                timeout = ?timeout,
                pending = self.inner.tracker.len(),
                "Graceful shutdown timed out, forcing"
            );
            self.shutdown();
        }
        finished
    }

    /// [`shutdown_gracefully`](Self::shutdown_gracefully) with the
    /// configured timeout.
    pub async fn close(&self) -> bool {
        self.shutdown_gracefully(self.inner.config.shutdown_timeout).await
    }

    // ========================================================================
    // INTERNALS
    // ========================================================================

    fn executor(&self, lane: Lane) -> Executor {
        match lane {
            Lane::Serial => self.inner.serial.clone(),
            Lane::Pool => self.inner.pool.clone(),
        }
    }

    fn track(&self, repeating: bool) -> Result<ScheduledHandle, SchedulerError> {
        if self.is_shut_down() {
            return Err(SchedulerError::ShutDown);
        }
        let id = TaskId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let parent = if repeating {
            &self.inner.periodic
        } else {
            &self.inner.shutdown
        };
        let handle = ScheduledHandle::new(id, parent.child_token(), repeating);
        self.inner.tasks.insert(id, handle.clone());
        Ok(handle)
    }

    fn schedule_once<F>(&self, lane: Lane, task: F, delay: Duration) -> Result<ScheduledHandle, SchedulerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let start = Instant::now() + delay;
        let handle = self.track(false)?;
        let id = handle.id();
        let cancel = handle.token().clone();
        let shutdown = self.inner.shutdown.clone();
        let tasks = self.inner.tasks.clone();
        let executor = self.executor(lane);

        tracing::debug!(id = %id, worker = %executor.name(), delay = ?delay, "Scheduled one-shot task");

        self.inner.tracker.spawn_on(
            async move {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {}
                    _ = sleep_until(start) => {
                        if let Some(_permit) = executor.acquire(&cancel).await {
                            executor.execute(id, &shutdown, task).await;
                        }
                    }
                }
                tasks.remove(&id);
            },
            &self.inner.runtime,
        );
        Ok(handle)
    }

    fn schedule_repeating<F, Fut>(
        &self,
        lane: Lane,
        mut task: F,
        delay: Duration,
        period: Duration,
    ) -> Result<ScheduledHandle, SchedulerError>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if period.is_zero() {
            return Err(SchedulerError::InvalidPeriod);
        }
        let start = Instant::now() + delay;
        let handle = self.track(true)?;
        let id = handle.id();
        let cancel = handle.token().clone();
        let shutdown = self.inner.shutdown.clone();
        let tasks = self.inner.tasks.clone();
        let executor = self.executor(lane);

        tracing::debug!(
            id = %id,
            worker = %executor.name(),
            delay = ?delay,
            period = ?period,
            "Scheduled repeating task"
        );

        self.inner.tracker.spawn_on(
            async move {
                // late executions catch up rather than shift the schedule
                let mut ticks = interval_at(start, period);
                ticks.set_missed_tick_behavior(MissedTickBehavior::Burst);

                loop {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        _ = ticks.tick() => {}
                    }
                    let Some(_permit) = executor.acquire(&cancel).await else {
                        break;
                    };
                    match executor.execute(id, &shutdown, task()).await {
                        Executed::Completed => {}
                        Executed::Panicked => {
                            tracing::warn!(id = %id, "Repeating task panicked, suppressing further runs");
                            break;
                        }
                        Executed::Interrupted => break,
                    }
                }
                tasks.remove(&id);
            },
            &self.inner.runtime,
        );
        Ok(handle)
    }
}
