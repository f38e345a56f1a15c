//! Runtime configuration
//!
//! Configuration is loaded from environment variables with defaults from
//! [`crate::constants`]. Every struct offers `Default`, `from_env()` and a
//! `development()` preset with short timings for local runs and tests.

use crate::constants::{
    DEFAULT_CACHE_TTL_SECS, DEFAULT_FUTURE_WORKER_PREFIX, DEFAULT_LOG_FILTER,
    DEFAULT_POOL_WORKER_NAME, DEFAULT_SCOPE_NAME, DEFAULT_SERIAL_WORKER_NAME,
    DEFAULT_SHUTDOWN_TIMEOUT_MS, MIN_SCHEDULER_POOL_SIZE,
};
use crate::error::ConfigError;
use std::str::FromStr;
use std::time::Duration;

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .map(|s| matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

// ============================================================================
// TASK RUNNER
// ============================================================================

/// Defaults applied to task runner scopes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Name for scopes opened without one.
    pub default_scope_name: String,
    /// Deadline applied to scopes opened without one. `None` = no deadline.
    pub default_timeout: Option<Duration>,
    /// Worker name prefix for `run_as_future` when the scope has no name.
    pub future_worker_prefix: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            default_scope_name: DEFAULT_SCOPE_NAME.to_string(),
            default_timeout: None,
            future_worker_prefix: DEFAULT_FUTURE_WORKER_PREFIX.to_string(),
        }
    }
}

impl RunnerConfig {
    /// Create RunnerConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `COURIER_SCOPE_NAME`: Default scope name (default: "courier-scope")
    /// - `COURIER_SCOPE_TIMEOUT_MS`: Default scope deadline (default: none)
    /// - `COURIER_FUTURE_WORKER_PREFIX`: Future worker prefix (default: "async-task")
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_scope_name: std::env::var("COURIER_SCOPE_NAME")
                .unwrap_or(defaults.default_scope_name),
            default_timeout: env_parse::<u64>("COURIER_SCOPE_TIMEOUT_MS")
                .map(Duration::from_millis),
            future_worker_prefix: std::env::var("COURIER_FUTURE_WORKER_PREFIX")
                .unwrap_or(defaults.future_worker_prefix),
        }
    }

    /// Configuration for development/testing with a short default deadline.
    pub fn development() -> Self {
        Self {
            default_timeout: Some(Duration::from_secs(10)),
            ..Self::default()
        }
    }
}

// ============================================================================
// CACHE
// ============================================================================

/// Configuration for the domain caches and the shared store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Time-to-live stamped onto values the domain caches register.
    pub default_ttl: Duration,
    /// Interval of the optional expiry sweep. `None` keeps expiry lazy.
    pub sweep_interval: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            sweep_interval: None,
        }
    }
}

impl CacheConfig {
    /// Create CacheConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `COURIER_CACHE_TTL_SECS`: Value time-to-live (default: 300)
    /// - `COURIER_CACHE_SWEEP_INTERVAL_SECS`: Expiry sweep interval (default: none)
    pub fn from_env() -> Self {
        Self {
            default_ttl: Duration::from_secs(
                env_parse("COURIER_CACHE_TTL_SECS").unwrap_or(DEFAULT_CACHE_TTL_SECS),
            ),
            sweep_interval: env_parse::<u64>("COURIER_CACHE_SWEEP_INTERVAL_SECS")
                .map(Duration::from_secs),
        }
    }

    /// Configuration for development/testing with a short TTL and active sweeping.
    pub fn development() -> Self {
        Self {
            default_ttl: Duration::from_secs(30),
            sweep_interval: Some(Duration::from_secs(5)),
        }
    }

    /// Set the value time-to-live.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }
}

// ============================================================================
// SCHEDULER
// ============================================================================

/// Configuration for the delayed/repeating task scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Number of concurrent executions allowed on the pooled executor.
    pub pool_size: usize,
    /// Name of the serialized worker.
    pub serial_worker_name: String,
    /// Name prefix of the pooled workers.
    pub pool_worker_name: String,
    /// Wait applied by graceful shutdown before forcing it.
    pub shutdown_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
            serial_worker_name: DEFAULT_SERIAL_WORKER_NAME.to_string(),
            pool_worker_name: DEFAULT_POOL_WORKER_NAME.to_string(),
            shutdown_timeout: Duration::from_millis(DEFAULT_SHUTDOWN_TIMEOUT_MS),
        }
    }
}

/// `max(2, available parallelism)`.
pub fn default_pool_size() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .max(MIN_SCHEDULER_POOL_SIZE)
}

impl SchedulerConfig {
    /// Create SchedulerConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `COURIER_SCHEDULER_POOL_SIZE`: Pool size (default: max(2, cores))
    /// - `COURIER_SCHEDULER_SHUTDOWN_TIMEOUT_MS`: Graceful shutdown wait (default: 5000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            pool_size: env_parse("COURIER_SCHEDULER_POOL_SIZE").unwrap_or(defaults.pool_size),
            shutdown_timeout: env_parse::<u64>("COURIER_SCHEDULER_SHUTDOWN_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.shutdown_timeout),
            ..defaults
        }
    }

    /// Configuration for development/testing with a small pool.
    pub fn development() -> Self {
        Self {
            pool_size: MIN_SCHEDULER_POOL_SIZE,
            shutdown_timeout: Duration::from_millis(500),
            ..Self::default()
        }
    }
}

// ============================================================================
// TELEMETRY
// ============================================================================

/// Configuration for the `tracing` subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Filter directive used when `RUST_LOG` is not set.
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            json: false,
        }
    }
}

impl TelemetryConfig {
    /// Create TelemetryConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `COURIER_LOG`: Filter directive (default: "info")
    /// - `COURIER_LOG_JSON`: "true" for JSON output (default: false)
    pub fn from_env() -> Self {
        Self {
            filter: std::env::var("COURIER_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string()),
            json: env_flag("COURIER_LOG_JSON", false),
        }
    }
}

// ============================================================================
// AGGREGATE
// ============================================================================

/// Master configuration for the courier runtime.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CourierConfig {
    pub runner: RunnerConfig,
    pub cache: CacheConfig,
    pub scheduler: SchedulerConfig,
    pub telemetry: TelemetryConfig,
}

impl CourierConfig {
    /// Load every section from the environment and validate the result.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            runner: RunnerConfig::from_env(),
            cache: CacheConfig::from_env(),
            scheduler: SchedulerConfig::from_env(),
            telemetry: TelemetryConfig::from_env(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn development() -> Self {
        Self {
            runner: RunnerConfig::development(),
            cache: CacheConfig::development(),
            scheduler: SchedulerConfig::development(),
            telemetry: TelemetryConfig {
                filter: "debug".to_string(),
                json: false,
            },
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler.pool_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scheduler.pool_size".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.cache.default_ttl.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "cache.default_ttl".to_string(),
                value: "0s".to_string(),
                reason: "values would expire on registration".to_string(),
            });
        }
        if self.cache.sweep_interval.is_some_and(|d| d.is_zero()) {
            return Err(ConfigError::InvalidValue {
                field: "cache.sweep_interval".to_string(),
                value: "0s".to_string(),
                reason: "omit the interval to disable sweeping".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CourierConfig::default();
        assert_eq!(config.runner.default_scope_name, DEFAULT_SCOPE_NAME);
        assert_eq!(config.runner.default_timeout, None);
        assert_eq!(config.cache.default_ttl, Duration::from_secs(300));
        assert_eq!(config.cache.sweep_interval, None);
        assert!(config.scheduler.pool_size >= MIN_SCHEDULER_POOL_SIZE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_development_is_valid() {
        let config = CourierConfig::development();
        assert!(config.validate().is_ok());
        assert_eq!(config.scheduler.pool_size, 2);
    }

    #[test]
    fn test_validate_rejects_zero_pool() {
        let mut config = CourierConfig::default();
        config.scheduler.pool_size = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("scheduler.pool_size"));
    }

    #[test]
    fn test_validate_rejects_zero_ttl() {
        let mut config = CourierConfig::default();
        config.cache = config.cache.with_ttl(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_sweep_interval() {
        let mut config = CourierConfig::default();
        config.cache.sweep_interval = Some(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_pool_size_has_floor() {
        assert!(default_pool_size() >= 2);
    }
}
