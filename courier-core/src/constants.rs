//! Constants for the courier runtime
//!
//! Defaults for every configurable knob live here so they are easy to find.

// ============================================================================
// TASK RUNNER
// ============================================================================

/// Name given to scopes opened without an explicit name.
pub const DEFAULT_SCOPE_NAME: &str = "courier-scope";

/// Worker name prefix used by `run_as_future` when the scope has no name.
pub const DEFAULT_FUTURE_WORKER_PREFIX: &str = "async-task";

// ============================================================================
// CACHE
// ============================================================================

/// Default time-to-live for values registered by the domain caches (5 minutes).
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

// ============================================================================
// SCHEDULER
// ============================================================================

/// Lower bound on the size of the scheduler's worker pool.
pub const MIN_SCHEDULER_POOL_SIZE: usize = 2;

/// Default name of the scheduler's serialized worker.
pub const DEFAULT_SERIAL_WORKER_NAME: &str = "courier-scheduler-serial";

/// Default name prefix of the scheduler's pooled workers.
pub const DEFAULT_POOL_WORKER_NAME: &str = "courier-scheduler-pool";

/// Default wait used by graceful scheduler shutdown.
pub const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 5_000;

// ============================================================================
// TELEMETRY
// ============================================================================

/// Default `tracing` filter directive.
pub const DEFAULT_LOG_FILTER: &str = "info";
