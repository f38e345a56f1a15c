//! Scope configuration

use courier_core::constants::{DEFAULT_FUTURE_WORKER_PREFIX, DEFAULT_SCOPE_NAME};
use courier_core::RunnerConfig;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Produces the worker name for the child forked at a given index.
pub type WorkerNamer = Arc<dyn Fn(usize) -> String + Send + Sync>;

/// Knobs for one task runner scope: a name, a worker naming factory and a
/// deadline. Every knob is optional.
#[derive(Clone, Default)]
pub struct ScopeOptions {
    name: Option<String>,
    worker_namer: Option<WorkerNamer>,
    timeout: Option<Duration>,
    future_worker_prefix: Option<String>,
}

impl ScopeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options carrying the configured default name, deadline and future
    /// worker prefix.
    pub fn from_config(config: &RunnerConfig) -> Self {
        Self {
            name: Some(config.default_scope_name.clone()),
            worker_namer: None,
            timeout: config.default_timeout,
            future_worker_prefix: Some(config.future_worker_prefix.clone()),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_worker_namer<F>(mut self, namer: F) -> Self
    where
        F: Fn(usize) -> String + Send + Sync + 'static,
    {
        self.worker_namer = Some(Arc::new(namer));
        self
    }

    /// Deadline for the whole scope, measured from when it opens.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Prefix for the dedicated worker of `run_as_future`.
    pub fn with_future_worker_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.future_worker_prefix = Some(prefix.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Name used in spans and errors; falls back to the default scope name.
    pub fn scope_label(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_SCOPE_NAME)
    }

    /// Worker prefix for `run_as_future`: the explicit prefix, else the scope
    /// name, else `async-task`.
    pub fn future_worker_prefix(&self) -> &str {
        self.future_worker_prefix
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or(DEFAULT_FUTURE_WORKER_PREFIX)
    }

    /// Name of the child forked at `index`.
    pub fn worker_name(&self, index: usize) -> String {
        match &self.worker_namer {
            Some(namer) => namer(index),
            None => format!("{}-{}", self.scope_label(), index),
        }
    }
}

impl fmt::Debug for ScopeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeOptions")
            .field("name", &self.name)
            .field("worker_namer", &self.worker_namer.as_ref().map(|_| "<fn>"))
            .field("timeout", &self.timeout)
            .field("future_worker_prefix", &self.future_worker_prefix)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_have_no_knobs() {
        let options = ScopeOptions::new();
        assert_eq!(options.name(), None);
        assert_eq!(options.timeout(), None);
        assert_eq!(options.scope_label(), DEFAULT_SCOPE_NAME);
        assert_eq!(options.worker_name(3), format!("{}-3", DEFAULT_SCOPE_NAME));
        assert_eq!(options.future_worker_prefix(), DEFAULT_FUTURE_WORKER_PREFIX);
    }

    #[test]
    fn test_future_worker_prefix_precedence() {
        let named = ScopeOptions::new().with_name("ai-scan");
        assert_eq!(named.future_worker_prefix(), "ai-scan");

        let explicit = named.with_future_worker_prefix("scan-bridge");
        assert_eq!(explicit.future_worker_prefix(), "scan-bridge");
        assert_eq!(explicit.worker_name(0), "ai-scan-0");
    }

    #[test]
    fn test_builder_sets_knobs() {
        let options = ScopeOptions::new()
            .with_name("label-print")
            .with_timeout(Duration::from_millis(250))
            .with_worker_namer(|i| format!("printer#{i}"));
        assert_eq!(options.name(), Some("label-print"));
        assert_eq!(options.timeout(), Some(Duration::from_millis(250)));
        assert_eq!(options.worker_name(7), "printer#7");
    }

    #[test]
    fn test_from_config() {
        let config = RunnerConfig {
            default_scope_name: "dispatch".to_string(),
            default_timeout: Some(Duration::from_secs(2)),
            future_worker_prefix: "label-bridge".to_string(),
        };
        let options = ScopeOptions::from_config(&config);
        assert_eq!(options.name(), Some("dispatch"));
        assert_eq!(options.timeout(), Some(Duration::from_secs(2)));
        assert_eq!(options.future_worker_prefix(), "label-bridge");
        assert_eq!(options.worker_name(1), "dispatch-1");
    }

    #[test]
    fn test_debug_hides_namer() {
        let options = ScopeOptions::new().with_worker_namer(|i| i.to_string());
        let debug = format!("{:?}", options);
        assert!(debug.contains("<fn>"));
    }
}
