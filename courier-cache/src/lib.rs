//! Courier Cache - Composite-Key TTL Cache
//!
//! One [`CacheStore`] is shared by everything in the process. It maps a
//! [`CacheKey`] (an opaque raw key plus four classifiers) to an append-only
//! bucket of expiring [`CacheValue`]s.
//!
//! Domain caches ([`domains`]) sit on top of the store and only exist inside
//! a [`ScopedCacheService::run_scoped`] call:
//!
//! ```ignore
//! let store = Arc::new(CacheStore::new());
//! let deliveries = ScopedCacheService::<DeliveryStateCache>::new(store, &CacheConfig::default());
//!
//! deliveries
//!     .run_scoped(Some(label), async {
//!         let cache = DeliveryStateCache::current()?;
//!         Ok::<_, CacheError>(cache.find_by_tracking_number("TRK-8F2KQ01Z"))
//!     })
//!     .await?;
//! ```
//!
//! Expiry is lazy. Callers check [`CacheValue::is_expired`], call
//! [`CacheStore::sweep_expired`], or spawn [`expiry_sweep_task`].

pub mod domains;
pub mod key;
pub mod scoped;
pub mod stats;
pub mod store;
pub mod sweep;
pub mod value;

pub use domains::{DeliveryStateCache, QrCodeCache, ScanCache};
pub use key::CacheKey;
pub use scoped::{CacheHandle, DomainCache, InstanceId, ScopedCacheService};
pub use stats::CacheStats;
pub use store::CacheStore;
pub use sweep::{expiry_sweep_task, spawn_expiry_sweep, SweepMetrics, SweepSnapshot};
pub use value::{CacheObject, CacheValue};

pub use courier_core::{CacheDomain, CacheError, CacheKind, CacheProfile, CacheSource, CacheVersion};
