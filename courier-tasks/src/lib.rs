//! Courier Tasks - Structured Concurrency
//!
//! Runs blocking I/O and third-party calls as tokio tasks grouped into
//! scopes. A scope forks its children, joins them before the entry point
//! returns, and cancels whatever is still running when the call fails fast,
//! trips a failure threshold, or passes its deadline.
//!
//! Scope bindings ([`context`]) travel with forked children so shared state
//! can be reached without globals.

pub mod context;
pub mod error;
pub mod options;
pub mod outcome;
pub mod runner;
mod scope;
pub mod worker;

pub use context::ScopeContext;
pub use error::{root_message, unwrap_root_message, BatchError, PanicError};
pub use options::{ScopeOptions, WorkerNamer};
pub use outcome::{BatchResult, Outcome, OutcomeState};
pub use runner::{
    blocking, boxed, run_all_or_fail, run_any_success, run_as_future, run_batch, run_single,
    BatchPolicy, BoxTask, TaskFuture,
};
pub use worker::{next_worker_name, spawn_named_worker, WorkerHandle};

pub use courier_core::{BoxError, SharedError, TaskError};
