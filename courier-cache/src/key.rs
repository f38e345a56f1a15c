//! Composite cache key
//!
//! A key is an opaque raw key plus the four classifiers of a
//! [`CacheProfile`]. Identity and hash cover exactly those five parts. An
//! unset classifier is its own value: a key with `CacheDomain::Unset` never
//! matches a key with a real domain.

use crate::value::CacheObject;
use chrono::Utc;
use courier_core::{CacheDomain, CacheKind, CacheProfile, CacheSource, CacheVersion, Timestamp};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

#[derive(Clone)]
pub struct CacheKey {
    raw: Arc<dyn CacheObject>,
    profile: CacheProfile,
    created_at: Timestamp,
    /// Shared by clones of this key; not part of identity.
    access_count: Arc<AtomicU32>,
}

impl CacheKey {
    /// Key with every classifier unset.
    pub fn new<K: CacheObject>(raw: K) -> Self {
        Self::with_profile(raw, CacheProfile::UNSET)
    }

    pub fn with_profile<K: CacheObject>(raw: K, profile: CacheProfile) -> Self {
        Self {
            raw: Arc::new(raw),
            profile,
            created_at: Utc::now(),
            access_count: Arc::new(AtomicU32::new(1)),
        }
    }

    pub fn kind(mut self, kind: CacheKind) -> Self {
        self.profile.kind = kind;
        self
    }

    pub fn domain(mut self, domain: CacheDomain) -> Self {
        self.profile.domain = domain;
        self
    }

    pub fn source(mut self, source: CacheSource) -> Self {
        self.profile.source = source;
        self
    }

    pub fn version(mut self, version: CacheVersion) -> Self {
        self.profile.version = version;
        self
    }

    pub fn raw(&self) -> &dyn CacheObject {
        &*self.raw
    }

    pub fn raw_as<K: CacheObject>(&self) -> Option<&K> {
        self.raw.as_any().downcast_ref::<K>()
    }

    pub fn profile(&self) -> CacheProfile {
        self.profile
    }

    pub fn cache_kind(&self) -> CacheKind {
        self.profile.kind
    }

    pub fn cache_domain(&self) -> CacheDomain {
        self.profile.domain
    }

    pub fn cache_source(&self) -> CacheSource {
        self.profile.source
    }

    pub fn cache_version(&self) -> CacheVersion {
        self.profile.version
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Observations recorded so far; construction counts as the first.
    pub fn access_count(&self) -> u32 {
        self.access_count.load(Ordering::Relaxed)
    }

    /// Record one more observation and return the new count.
    pub fn record_access(&self) -> u32 {
        self.access_count.fetch_add(1, Ordering::Relaxed).saturating_add(1)
    }
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        self.profile == other.profile && self.raw.eq_object(&*other.raw)
    }
}

impl Eq for CacheKey {}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash_object(state);
        self.profile.hash(state);
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheKey")
            .field("raw", &self.raw)
            .field("profile", &self.profile.to_string())
            .field("access_count", &self.access_count())
            .finish()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:?}", self.profile, self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::collections::HashSet;

    fn hash_of(key: &CacheKey) -> u64 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        hasher.finish()
    }

    fn delivery_key(raw: &str) -> CacheKey {
        CacheKey::new(raw.to_string())
            .kind(CacheKind::Memory)
            .domain(CacheDomain::Delivery)
            .source(CacheSource::DeliveryStateTracker)
            .version(CacheVersion::V1_0)
    }

    #[test]
    fn test_identical_components_are_equal() {
        let a = delivery_key("TRK-1");
        let b = delivery_key("TRK-1");
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_domain_difference_breaks_equality() {
        let a = delivery_key("TRK-1");
        let b = delivery_key("TRK-1").domain(CacheDomain::Tracking);
        assert_ne!(a, b);
    }

    #[test]
    fn test_unset_is_not_a_wildcard() {
        let unset = CacheKey::new("TRK-1".to_string());
        assert_eq!(unset.profile(), CacheProfile::UNSET);
        assert_ne!(unset, delivery_key("TRK-1"));
        assert_ne!(
            CacheKey::new("TRK-1".to_string()).kind(CacheKind::Memory),
            CacheKey::new("TRK-1".to_string())
        );
    }

    #[test]
    fn test_raw_key_type_matters() {
        assert_ne!(CacheKey::new(1u32), CacheKey::new(1u64));
        assert_eq!(CacheKey::new(1u32).raw_as::<u32>(), Some(&1));
    }

    #[test]
    fn test_access_count_is_shared_and_not_identity() {
        let key = delivery_key("TRK-9");
        let clone = key.clone();
        assert_eq!(key.access_count(), 1);
        assert_eq!(clone.record_access(), 2);
        assert_eq!(key.access_count(), 2);

        let fresh = delivery_key("TRK-9");
        assert_eq!(fresh, key);
        let set: HashSet<CacheKey> = [key, fresh].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_profile_accessors() {
        let key = CacheKey::with_profile(
            "r".to_string(),
            CacheProfile::memory(CacheDomain::Qr, CacheSource::QrCodeGenerator),
        );
        assert_eq!(key.cache_kind(), CacheKind::Memory);
        assert_eq!(key.cache_domain(), CacheDomain::Qr);
        assert_eq!(key.cache_source(), CacheSource::QrCodeGenerator);
        assert_eq!(key.cache_version(), CacheVersion::V1_0);
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use courier_test_utils::generators::{arb_cache_profile, arb_tracking_number};
    use proptest::prelude::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(key: &CacheKey) -> u64 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        hasher.finish()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_equal_components_equal_keys(raw in arb_tracking_number(), profile in arb_cache_profile()) {
            let a = CacheKey::with_profile(raw.clone(), profile);
            let b = CacheKey::with_profile(raw, profile);
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(hash_of(&a), hash_of(&b));
        }

        #[test]
        fn prop_key_equality_tracks_profile_equality(
            raw in arb_tracking_number(),
            p1 in arb_cache_profile(),
            p2 in arb_cache_profile(),
        ) {
            let a = CacheKey::with_profile(raw.clone(), p1);
            let b = CacheKey::with_profile(raw, p2);
            prop_assert_eq!(a == b, p1 == p2);
        }
    }
}
