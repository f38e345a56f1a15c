//! Error types for courier runtime operations

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Error type task bodies may return; anything `Into<BoxError>` is accepted.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A captured task failure. Shared so outcomes can be inspected repeatedly.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Task runner errors.
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    #[error("Task {index} failed: {message}")]
    Failed {
        index: usize,
        /// Message of the deepest cause in the failure chain.
        message: String,
        #[source]
        source: SharedError,
    },

    #[error("Task {index} panicked: {message}")]
    Panicked { index: usize, message: String },

    #[error("Scope '{scope}' timed out after {timeout:?}")]
    TimedOut { scope: String, timeout: Duration },

    #[error("All {count} tasks failed, first failure: {message}")]
    AllFailed {
        count: usize,
        message: String,
        #[source]
        source: SharedError,
    },

    #[error("Scope '{scope}' was cancelled before producing a result")]
    Cancelled { scope: String },

    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },
}

impl TaskError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TaskError::TimedOut { .. })
    }

    /// Index of the task that caused this error, when one task is to blame.
    pub fn task_index(&self) -> Option<usize> {
        match self {
            TaskError::Failed { index, .. } | TaskError::Panicked { index, .. } => Some(*index),
            _ => None,
        }
    }
}

/// Cache errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("{cache} accessed outside of a bound scope; wrap the work in run_scoped")]
    IllegalScopeAccess { cache: &'static str },

    #[error("Cache type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

/// Scheduler errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Scheduler has been shut down")]
    ShutDown,

    #[error("Repeating tasks need a non-zero period")]
    InvalidPeriod,

    #[error("Scheduler created outside a tokio runtime")]
    NoRuntime,
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to initialize telemetry: {reason}")]
    TelemetryInit { reason: String },
}

/// Master error type for all courier runtime errors.
#[derive(Debug, Clone, Error)]
pub enum CourierError {
    #[error("Task error: {0}")]
    Task(#[from] TaskError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for courier runtime operations.
pub type CourierResult<T> = Result<T, CourierError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[derive(Debug, Error)]
    #[error("database unavailable")]
    struct DbDown;

    #[test]
    fn test_task_error_display_failed() {
        let err = TaskError::Failed {
            index: 2,
            message: "database unavailable".to_string(),
            source: Arc::new(DbDown),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Task 2 failed"));
        assert!(msg.contains("database unavailable"));
        assert!(err.source().is_some());
        assert_eq!(err.task_index(), Some(2));
    }

    #[test]
    fn test_task_error_display_timed_out() {
        let err = TaskError::TimedOut {
            scope: "label-scan".to_string(),
            timeout: Duration::from_millis(50),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("label-scan"));
        assert!(msg.contains("50ms"));
        assert!(err.is_timeout());
        assert_eq!(err.task_index(), None);
    }

    #[test]
    fn test_cache_error_display_illegal_scope_access() {
        let err = CacheError::IllegalScopeAccess {
            cache: "DeliveryStateCache",
        };
        let msg = format!("{}", err);
        assert!(msg.contains("DeliveryStateCache"));
        assert!(msg.contains("outside of a bound scope"));
    }

    #[test]
    fn test_config_error_display_invalid_value() {
        let err = ConfigError::InvalidValue {
            field: "pool_size".to_string(),
            value: "0".to_string(),
            reason: "must be at least 1".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("pool_size"));
        assert!(msg.contains("must be at least 1"));
    }

    #[test]
    fn test_courier_error_from_variants() {
        let task = CourierError::from(TaskError::InvalidArgument {
            reason: "empty".to_string(),
        });
        assert!(matches!(task, CourierError::Task(_)));

        let cache = CourierError::from(CacheError::IllegalScopeAccess { cache: "QrCodeCache" });
        assert!(matches!(cache, CourierError::Cache(_)));

        let scheduler = CourierError::from(SchedulerError::ShutDown);
        assert!(matches!(scheduler, CourierError::Scheduler(_)));

        let config = CourierError::from(ConfigError::TelemetryInit {
            reason: "already set".to_string(),
        });
        assert!(matches!(config, CourierError::Config(_)));
    }
}
