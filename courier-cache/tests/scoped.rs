//! Scope-bound domain caches driven through the task runner.

use courier_cache::{
    CacheDomain, CacheError, CacheStore, DeliveryStateCache, DomainCache, QrCodeCache, ScanCache,
    ScopedCacheService,
};
use courier_core::{BoxError, CacheConfig, TaskError};
use courier_tasks::{run_all_or_fail, ScopeOptions};
use courier_test_utils::fixtures::{qr_metadata, scan_found, shipping_label};
use courier_test_utils::ms;
use std::sync::Arc;

fn deliveries(store: &Arc<CacheStore>) -> ScopedCacheService<DeliveryStateCache> {
    ScopedCacheService::new(store.clone(), &CacheConfig::default())
}

#[test]
fn test_get_outside_run_scoped_is_illegal() {
    let store = Arc::new(CacheStore::new());
    let err = deliveries(&store).get().unwrap_err();
    assert_eq!(
        err,
        CacheError::IllegalScopeAccess {
            cache: "DeliveryStateCache"
        }
    );
}

#[tokio::test]
async fn test_get_inside_run_scoped_is_seeded() {
    let store = Arc::new(CacheStore::new());
    let found = deliveries(&store)
        .run_scoped(Some(shipping_label("u-1", "TRK-AAA")), async {
            let cache = DeliveryStateCache::current()?;
            Ok::<_, CacheError>((cache.is_primed(), cache.find_by_tracking_number("trk-aaa")))
        })
        .await
        .unwrap();

    assert!(found.0);
    assert_eq!(found.1.map(|label| label.uuid), Some("u-1".to_string()));
    assert_eq!(store.find_by_domain(CacheDomain::Delivery).len(), 1);
}

#[tokio::test]
async fn test_unseeded_scope_starts_empty() {
    let store = Arc::new(CacheStore::new());
    let labels = deliveries(&store)
        .run_scoped(None, async {
            let cache = DeliveryStateCache::current()?;
            Ok::<_, CacheError>((cache.is_primed(), cache.all_labels()))
        })
        .await
        .unwrap();
    assert!(!labels.0);
    assert!(labels.1.is_empty());
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_children_see_the_bound_instance() {
    let store = Arc::new(CacheStore::new());
    let instances = ScopedCacheService::<ScanCache>::new(store.clone(), &CacheConfig::default())
        .run_scoped(None, async {
            let parent = ScanCache::current()?.handle().instance();
            let children = (0..4).map(|i| async move {
                let cache = ScanCache::current()?;
                cache.register(scan_found(&format!("TRK-{i}")));
                Ok::<_, CacheError>(cache.handle().instance())
            });
            let seen = run_all_or_fail(children, &ScopeOptions::new()).await?;
            let count = ScanCache::current()?.recent_responses(0).len();
            Ok::<_, BoxError>((parent, seen, count))
        })
        .await
        .unwrap();

    let (parent, seen, count) = instances;
    assert!(seen.iter().all(|instance| *instance == parent));
    assert_eq!(count, 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_scopes_are_isolated() {
    let store = Arc::new(CacheStore::new());
    let service = ScopedCacheService::<QrCodeCache>::new(store.clone(), &CacheConfig::default());

    let runs = (0..8).map(|i| {
        let service = service.clone();
        tokio::spawn(async move {
            service
                .run_scoped(Some(qr_metadata(&format!("u-{i}"))), async move {
                    tokio::time::sleep(ms(10)).await;
                    let cache = QrCodeCache::current()?;
                    Ok::<_, CacheError>(cache.entries())
                })
                .await
        })
    });

    for (i, run) in runs.collect::<Vec<_>>().into_iter().enumerate() {
        let entries = run.await.unwrap().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].uuid, format!("u-{i}"));
    }
    assert_eq!(store.find_by_domain(CacheDomain::Qr).len(), 8);
}

#[tokio::test]
async fn test_binding_torn_down_after_failure() {
    let store = Arc::new(CacheStore::new());
    let service = deliveries(&store);

    let err = service
        .run_scoped(Some(shipping_label("u-1", "TRK-1")), async {
            DeliveryStateCache::current()?;
            Err::<(), BoxError>("label rejected".into())
        })
        .await
        .unwrap_err();
    assert!(matches!(err, TaskError::Failed { .. }));
    assert!(service.get().is_err());

    // seeded data outlives the scope in the shared store
    assert_eq!(store.find_by_domain(CacheDomain::Delivery).len(), 1);
}

#[tokio::test]
async fn test_unrelated_spawn_does_not_inherit_binding() {
    let store = Arc::new(CacheStore::new());
    let leaked = deliveries(&store)
        .run_scoped(None, async {
            let outside = tokio::spawn(async { DeliveryStateCache::current().is_ok() });
            Ok::<_, BoxError>(outside.await?)
        })
        .await
        .unwrap();
    assert!(!leaked);
}
