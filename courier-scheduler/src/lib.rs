//! Courier Scheduler
//!
//! Delayed one-shot and fixed-rate repeating work on two executors: a
//! serialized worker whose executions never overlap, and a pool bounded to
//! `SchedulerConfig::pool_size` concurrent executions.
//!
//! ```ignore
//! let scheduler = Scheduler::new(&SchedulerConfig::from_env())?;
//! let heartbeat = scheduler.run_repeating(
//!     || async { tracing::debug!("courier heartbeat") },
//!     Duration::ZERO,
//!     Duration::from_secs(30),
//! )?;
//! // ...
//! scheduler.cancel(&heartbeat);
//! scheduler.close().await;
//! ```

mod executor;
pub mod handle;
pub mod scheduler;

pub use handle::{ScheduledHandle, TaskId};
pub use scheduler::Scheduler;

pub use courier_core::{SchedulerConfig, SchedulerError};
