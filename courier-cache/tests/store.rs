//! Shared store under concurrent forked writers.

use courier_cache::{CacheDomain, CacheKey, CacheKind, CacheStore, CacheValue};
use courier_core::BoxError;
use courier_tasks::{run_all_or_fail, ScopeOptions};
use proptest::prelude::*;
use std::sync::Arc;

fn bucket_key(raw: &str, domain: CacheDomain) -> CacheKey {
    CacheKey::new(raw.to_string())
        .kind(CacheKind::Memory)
        .domain(domain)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_forked_appends_to_one_key_are_not_lost() {
    let store = Arc::new(CacheStore::new());
    let tasks = (0..64u32).map(|i| {
        let store = store.clone();
        async move {
            for j in 0..16u32 {
                store.add(
                    bucket_key("shared", CacheDomain::Scans),
                    CacheValue::new(i * 100 + j, i64::MAX),
                );
                tokio::task::yield_now().await;
            }
            Ok::<_, BoxError>(())
        }
    });

    run_all_or_fail(tasks, &ScopeOptions::new()).await.unwrap();

    let bucket = store.get(&bucket_key("shared", CacheDomain::Scans));
    assert_eq!(bucket.len(), 64 * 16);
    assert_eq!(store.size(), 1);
    assert_eq!(store.stats(0).valid, 64 * 16);
}

#[test]
fn test_find_by_domain_returns_exactly_matching_buckets() {
    let store = CacheStore::new();
    for (raw, domain) in [
        ("a", CacheDomain::Delivery),
        ("b", CacheDomain::Delivery),
        ("c", CacheDomain::Scans),
        ("d", CacheDomain::Unset),
    ] {
        store.add(bucket_key(raw, domain), CacheValue::new(raw.to_string(), 0));
    }

    let mut raws: Vec<String> = store
        .find_by_domain(CacheDomain::Delivery)
        .into_iter()
        .flatten()
        .filter_map(|v| v.downcast_ref::<String>().cloned())
        .collect();
    raws.sort();
    assert_eq!(raws, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(store.find_by_domain(CacheDomain::Unset).len(), 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_bucket_preserves_insertion_order(values in proptest::collection::vec(any::<u32>(), 1..40)) {
        let store = CacheStore::new();
        let key = bucket_key("ordered", CacheDomain::Tracking);
        for value in &values {
            store.add(key.clone(), CacheValue::new(*value, 0));
        }
        let stored: Vec<u32> = store
            .get(&key)
            .iter()
            .filter_map(|v| v.downcast_ref::<u32>().copied())
            .collect();
        prop_assert_eq!(stored, values);
        prop_assert_eq!(store.size(), 1);
    }
}
