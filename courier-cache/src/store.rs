//! Concurrent store of append-only buckets
//!
//! Maps each [`CacheKey`] to an ordered bucket of [`CacheValue`]s. Adding to
//! an existing key appends under the shard lock for that key, so concurrent
//! appends are never lost. Reads hand out copies of whole buckets.
//!
//! One store is shared by every domain cache in the process; construct it
//! once and pass an `Arc<CacheStore>` around.

use crate::key::CacheKey;
use crate::stats::CacheStats;
use crate::value::{CacheObject, CacheValue};
use courier_core::{CacheDomain, CacheKind, EpochMillis};
use dashmap::DashMap;
use std::any::Any;

#[derive(Debug, Default)]
pub struct CacheStore {
    buckets: DashMap<CacheKey, Vec<CacheValue>>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // MUTATION
    // ========================================================================

    /// Append `value` to the bucket under `key`, creating the bucket if needed.
    pub fn add(&self, key: CacheKey, value: CacheValue) {
        tracing::trace!(key = %key, value_type = value.type_name(), "Adding value to cache bucket");
        self.buckets.entry(key).or_default().push(value);
    }

    /// Drop the bucket under `key`, returning its values.
    pub fn remove(&self, key: &CacheKey) -> Option<Vec<CacheValue>> {
        let removed = self.buckets.remove(key).map(|(_, bucket)| bucket);
        if removed.is_some() {
            tracing::debug!(key = %key, "Removed cache key");
        }
        removed
    }

    /// Remove every value equal to `value` from every bucket. Keys stay,
    /// even when their bucket ends up empty. Returns the number removed.
    pub fn remove_value(&self, value: &CacheValue) -> usize {
        let mut removed = 0;
        for mut bucket in self.buckets.iter_mut() {
            let before = bucket.len();
            bucket.retain(|v| v != value);
            let dropped = before - bucket.len();
            if dropped > 0 {
                tracing::debug!(domain = %bucket.key().cache_domain(), dropped, "Removed value from bucket");
                removed += dropped;
            }
        }
        removed
    }

    pub fn clear(&self) {
        self.buckets.clear();
    }

    /// Record an observation of the stored key equal to `key`.
    pub fn touch(&self, key: &CacheKey) -> Option<u32> {
        self.buckets.get(key).map(|entry| entry.key().record_access())
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// Copy of the bucket under `key`; empty when the key is absent.
    pub fn get(&self, key: &CacheKey) -> Vec<CacheValue> {
        self.buckets
            .get(key)
            .map(|bucket| bucket.value().clone())
            .unwrap_or_default()
    }

    pub fn contains_key(&self, key: &CacheKey) -> bool {
        self.buckets.contains_key(key)
    }

    /// True when the bucket under `key` holds a value whose payload equals
    /// `payload`.
    pub fn contains_payload(&self, key: &CacheKey, payload: &dyn CacheObject) -> bool {
        self.buckets
            .get(key)
            .is_some_and(|bucket| bucket.iter().any(|v| v.holds(payload)))
    }

    /// Buckets whose key has domain `domain`, in map iteration order.
    pub fn find_by_domain(&self, domain: CacheDomain) -> Vec<Vec<CacheValue>> {
        self.buckets
            .iter()
            .filter(|entry| entry.key().cache_domain() == domain)
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Buckets whose key has kind `kind`, in map iteration order.
    pub fn find_by_kind(&self, kind: CacheKind) -> Vec<Vec<CacheValue>> {
        self.buckets
            .iter()
            .filter(|entry| entry.key().cache_kind() == kind)
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Extract the payload of `value` as a `V`.
    ///
    /// A payload of another type is logged and yields `None`.
    pub fn unwrap<V: Any + Clone>(&self, value: &CacheValue) -> Option<V> {
        match value.try_downcast::<V>() {
            Ok(payload) => Some(payload.clone()),
            Err(e) => {
                tracing::warn!(error = %e, "Cache type mismatch");
                None
            }
        }
    }

    /// Number of distinct keys.
    pub fn size(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn stats(&self, now: EpochMillis) -> CacheStats {
        let mut stats = CacheStats {
            keys: self.buckets.len(),
            ..CacheStats::default()
        };
        for bucket in self.buckets.iter() {
            for value in bucket.value() {
                stats.values += 1;
                if value.is_expired(now) {
                    stats.expired += 1;
                } else {
                    stats.valid += 1;
                }
            }
        }
        stats
    }

    // ========================================================================
    // EXPIRY
    // ========================================================================

    /// Remove values expired at `now` and drop buckets left empty.
    ///
    /// Expiry is otherwise lazy; nothing calls this unless a caller or
    /// [`crate::expiry_sweep_task`] does. Returns the number of values removed.
    pub fn sweep_expired(&self, now: EpochMillis) -> usize {
        let mut removed = 0;
        self.buckets.retain(|_, bucket| {
            let before = bucket.len();
            bucket.retain(|v| !v.is_expired(now));
            removed += before - bucket.len();
            !bucket.is_empty()
        });
        if removed > 0 {
            tracing::debug!(removed, "Swept expired cache values");
        }
        removed
    }
}
