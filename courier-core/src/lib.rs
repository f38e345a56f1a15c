//! Courier Core - Shared Types
//!
//! Shared types and ambient setup. Every other courier crate
//! depends on this one:
//!
//! - cache classifiers (`CacheKind`, `CacheDomain`, `CacheSource`, `CacheVersion`)
//!   and the `CacheProfile` tuple a domain cache keys with
//! - payload records cached by the domain caches
//! - the error taxonomy shared by the task runner, cache and scheduler
//! - env-driven configuration and tracing initialization

pub mod classifier;
pub mod config;
pub mod constants;
pub mod entities;
pub mod error;
pub mod telemetry;

pub use classifier::{CacheDomain, CacheKind, CacheProfile, CacheSource, CacheVersion};
pub use config::{CacheConfig, CourierConfig, RunnerConfig, SchedulerConfig, TelemetryConfig};
pub use entities::{CameraState, QrMetadata, ScanResponse, ShippingLabel};
pub use error::{
    BoxError, CacheError, ConfigError, CourierError, CourierResult, SchedulerError, SharedError,
    TaskError,
};

use chrono::{DateTime, Utc};
use uuid::Uuid;

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Milliseconds since the Unix epoch, used for cache expiry arithmetic.
pub type EpochMillis = i64;

/// Identifier for an entity, UUIDv7 so ids sort by creation time.
pub type EntityId = Uuid;

/// Generate a new UUIDv7 identifier.
pub fn new_entity_id() -> EntityId {
    Uuid::now_v7()
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> EpochMillis {
    Utc::now().timestamp_millis()
}
