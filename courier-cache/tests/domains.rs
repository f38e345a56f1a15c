//! Domain caches driven through scoped runs and generated payloads.

use courier_cache::{
    CacheDomain, CacheHandle, CacheStore, DeliveryStateCache, DomainCache, QrCodeCache, ScanCache,
    ScopedCacheService,
};
use courier_core::{BoxError, CacheConfig};
use courier_test_utils::fixtures::{priority_label, shipping_label};
use courier_test_utils::generators::{arb_qr_metadata, arb_scan_response};
use courier_test_utils::init_test_tracing;
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn open<C: DomainCache>(store: &Arc<CacheStore>) -> C {
    C::open(CacheHandle::new(store.clone(), C::PROFILE, Duration::from_secs(60)))
}

#[tokio::test]
async fn test_priority_label_survives_scoped_prime() {
    init_test_tracing();
    let store = Arc::new(CacheStore::new());
    let service = ScopedCacheService::<DeliveryStateCache>::new(store.clone(), &CacheConfig::default());

    let found = service
        .run_scoped(Some(shipping_label("u-1", "1Z001")), async {
            let cache = DeliveryStateCache::current()?;
            cache.prime(vec![priority_label("u-2", "1z002")]);
            Ok::<_, BoxError>(cache.find_by_tracking_number(" 1Z002 "))
        })
        .await
        .unwrap()
        .expect("primed label is indexed");

    assert!(found.priority);
    assert_eq!(found.uuid, "u-2");
    assert_eq!(store.find_by_domain(CacheDomain::Delivery).len(), 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_recent_responses_are_newest_first(
        responses in prop::collection::vec(arb_scan_response(), 1..12),
        limit in 0usize..15,
    ) {
        let store = Arc::new(CacheStore::new());
        let cache: ScanCache = open(&store);
        for response in &responses {
            cache.register(response.clone());
        }

        let newest_first: Vec<_> = responses.iter().rev().cloned().collect();
        let expected = if limit == 0 {
            newest_first.clone()
        } else {
            newest_first.iter().take(limit).cloned().collect()
        };
        prop_assert_eq!(cache.recent_responses(limit), expected);
        prop_assert_eq!(cache.recent_responses(0), newest_first);
    }

    #[test]
    fn prop_qr_lookup_returns_latest_registration(
        codes in prop::collection::vec(arb_qr_metadata(), 1..10),
    ) {
        let store = Arc::new(CacheStore::new());
        let cache: QrCodeCache = open(&store);
        for code in &codes {
            cache.register(code.clone());
        }

        prop_assert_eq!(cache.entries(), codes.clone());
        for code in &codes {
            let latest = codes.iter().rev().find(|c| c.uuid == code.uuid).cloned();
            prop_assert_eq!(cache.find_by_uuid(&code.uuid), latest);
        }

        cache.remove();
        prop_assert!(cache.entries().is_empty());
        prop_assert!(store.is_empty());
    }
}
