//! Scope-bound domain caches
//!
//! A domain cache instance exists only inside [`ScopedCacheService::run_scoped`].
//! The instance is bound to the running scope, is visible to every task the
//! scope forks, and disappears when `run_scoped` returns. Outside such a scope
//! [`DomainCache::current`] fails with [`CacheError::IllegalScopeAccess`];
//! there is no fallback instance.
//!
//! Each instance keys its bucket in the shared [`CacheStore`] by its own
//! [`InstanceId`] under the domain's fixed [`CacheProfile`]. Buckets outlive
//! the instance and expire like any other value.

use crate::key::CacheKey;
use crate::store::CacheStore;
use crate::value::{CacheObject, CacheValue};
use courier_core::{
    now_millis, BoxError, CacheConfig, CacheError, CacheProfile, EpochMillis, TaskError,
};
use courier_tasks::{context, run_single, ScopeOptions};
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Identity of one domain cache instance; the raw key of its bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(Uuid);

impl InstanceId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// CACHE HANDLE
// ============================================================================

/// One instance's view of the shared store.
#[derive(Debug, Clone)]
pub struct CacheHandle {
    instance: InstanceId,
    store: Arc<CacheStore>,
    ttl: Duration,
    key: CacheKey,
}

impl CacheHandle {
    pub fn new(store: Arc<CacheStore>, profile: CacheProfile, ttl: Duration) -> Self {
        let instance = InstanceId::new();
        Self {
            instance,
            store,
            ttl,
            key: CacheKey::with_profile(instance, profile),
        }
    }

    /// Append `data` to this instance's bucket, expiring after the TTL.
    pub fn register<V: CacheObject>(&self, data: V) {
        self.store
            .add(self.key.clone(), CacheValue::with_ttl(data, self.ttl, now_millis()));
    }

    /// Drop this instance's bucket.
    pub fn remove(&self) -> Option<Vec<CacheValue>> {
        self.store.remove(&self.key)
    }

    pub fn contains_key(&self) -> bool {
        self.store.contains_key(&self.key)
    }

    /// Every payload of type `V` in this instance's bucket, oldest first.
    pub fn entries<V: CacheObject + Clone>(&self) -> Vec<V> {
        self.store
            .get(&self.key)
            .iter()
            .filter_map(|value| value.downcast_ref::<V>().cloned())
            .collect()
    }

    /// Like [`entries`](Self::entries), skipping values expired at `now`.
    pub fn live_entries<V: CacheObject + Clone>(&self, now: EpochMillis) -> Vec<V> {
        self.store
            .get(&self.key)
            .iter()
            .filter(|value| !value.is_expired(now))
            .filter_map(|value| value.downcast_ref::<V>().cloned())
            .collect()
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

// ============================================================================
// DOMAIN CACHE
// ============================================================================

/// A cache for one domain, opened fresh for every scoped run.
pub trait DomainCache: Send + Sync + Sized + 'static {
    type Payload: CacheObject + Clone;

    /// Name used in logs and in [`CacheError::IllegalScopeAccess`].
    const NAME: &'static str;

    /// Classifier tuple every key of this cache carries.
    const PROFILE: CacheProfile;

    fn open(handle: CacheHandle) -> Self;

    fn handle(&self) -> &CacheHandle;

    fn register(&self, data: Self::Payload) {
        self.handle().register(data);
    }

    fn remove(&self) {
        self.handle().remove();
    }

    fn entries(&self) -> Vec<Self::Payload> {
        self.handle().entries::<Self::Payload>()
    }

    fn contains_key(&self) -> bool {
        self.handle().contains_key()
    }

    fn key(&self) -> &CacheKey {
        self.handle().key()
    }

    /// The instance bound to the running scope.
    fn current() -> Result<Arc<Self>, CacheError> {
        context::current::<Self>().ok_or(CacheError::IllegalScopeAccess { cache: Self::NAME })
    }
}

// ============================================================================
// SCOPED SERVICE
// ============================================================================

/// Entry point for work that needs a domain cache of type `C`.
pub struct ScopedCacheService<C> {
    store: Arc<CacheStore>,
    ttl: Duration,
    options: ScopeOptions,
    _cache: PhantomData<fn() -> C>,
}

impl<C> Clone for ScopedCacheService<C> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            ttl: self.ttl,
            options: self.options.clone(),
            _cache: PhantomData,
        }
    }
}

impl<C: DomainCache> fmt::Debug for ScopedCacheService<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedCacheService")
            .field("cache", &C::NAME)
            .field("ttl", &self.ttl)
            .field("options", &self.options)
            .finish()
    }
}

impl<C: DomainCache> ScopedCacheService<C> {
    pub fn new(store: Arc<CacheStore>, config: &CacheConfig) -> Self {
        Self {
            store,
            ttl: config.default_ttl,
            options: ScopeOptions::new().with_name(C::NAME),
            _cache: PhantomData,
        }
    }

    /// Scope options used for the task of every `run_scoped` call.
    pub fn with_options(mut self, options: ScopeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    /// The instance bound to the running scope.
    pub fn get(&self) -> Result<Arc<C>, CacheError> {
        C::current()
    }

    /// Open a fresh instance, bind it, seed it with `initial`, and run `task`
    /// in its own scope. The binding is gone once this returns, whatever the
    /// outcome.
    pub async fn run_scoped<T, E, F>(&self, initial: Option<C::Payload>, task: F) -> Result<T, TaskError>
    where
        T: Send + 'static,
        E: Into<BoxError> + Send + 'static,
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        let cache = Arc::new(C::open(CacheHandle::new(self.store.clone(), C::PROFILE, self.ttl)));
        let instance = cache.handle().instance();
        tracing::debug!(cache = C::NAME, %instance, seeded = initial.is_some(), "Opening scoped cache");

        let options = &self.options;
        let result = context::bind(cache.clone(), async move {
            if let Some(data) = initial {
                cache.register(data);
            }
            run_single(task, options).await
        })
        .await;

        match &result {
            Ok(_) => tracing::debug!(cache = C::NAME, %instance, "Closed scoped cache"),
            Err(e) => tracing::debug!(cache = C::NAME, %instance, error = %e, "Closed scoped cache after failure"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::{CacheDomain, CacheSource};

    #[derive(Debug)]
    struct NotesCache {
        handle: CacheHandle,
    }

    impl DomainCache for NotesCache {
        type Payload = String;
        const NAME: &'static str = "NotesCache";
        const PROFILE: CacheProfile = CacheProfile::memory(CacheDomain::User, CacheSource::Unset);

        fn open(handle: CacheHandle) -> Self {
            Self { handle }
        }

        fn handle(&self) -> &CacheHandle {
            &self.handle
        }
    }

    fn service() -> ScopedCacheService<NotesCache> {
        ScopedCacheService::new(Arc::new(CacheStore::new()), &CacheConfig::default())
    }

    #[test]
    fn test_handle_keys_by_instance_and_profile() {
        let store = Arc::new(CacheStore::new());
        let a = CacheHandle::new(store.clone(), NotesCache::PROFILE, Duration::from_secs(60));
        let b = CacheHandle::new(store.clone(), NotesCache::PROFILE, Duration::from_secs(60));
        assert_ne!(a.key(), b.key());
        assert_eq!(a.key().profile(), NotesCache::PROFILE);
        assert_eq!(a.key().raw_as::<InstanceId>(), Some(&a.instance()));

        a.register("one".to_string());
        a.register(7u32);
        assert_eq!(a.entries::<String>(), vec!["one".to_string()]);
        assert!(b.entries::<String>().is_empty());
        assert!(a.contains_key());

        assert_eq!(a.remove().map(|bucket| bucket.len()), Some(2));
        assert!(!a.contains_key());
    }

    #[test]
    fn test_live_entries_skip_expired() {
        let handle = CacheHandle::new(
            Arc::new(CacheStore::new()),
            NotesCache::PROFILE,
            Duration::from_millis(10),
        );
        handle.register("soon stale".to_string());
        let now = now_millis();
        assert_eq!(handle.live_entries::<String>(now).len(), 1);
        assert!(handle.live_entries::<String>(now + 60_000).is_empty());
    }

    #[test]
    fn test_get_outside_scope_is_illegal() {
        assert_eq!(
            service().get().unwrap_err(),
            CacheError::IllegalScopeAccess { cache: "NotesCache" }
        );
    }

    #[tokio::test]
    async fn test_run_scoped_seeds_and_binds() {
        let service = service();
        let seen = service
            .run_scoped(Some("seed".to_string()), async {
                let cache = NotesCache::current()?;
                cache.register("second".to_string());
                Ok::<_, CacheError>(cache.entries())
            })
            .await
            .unwrap();
        assert_eq!(seen, vec!["seed".to_string(), "second".to_string()]);
        assert!(service.get().is_err());
    }

    #[test]
    fn test_debug_names_cache() {
        let rendered = format!("{:?}", service());
        assert!(rendered.contains("NotesCache"));
    }
}
