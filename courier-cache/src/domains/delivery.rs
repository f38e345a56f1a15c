//! Delivery state cache
//!
//! Holds the shipping labels of deliveries in flight. Besides the store
//! bucket every instance keeps two lookup indexes: by UUID (trimmed) and by
//! tracking number (trimmed, upper-cased). A label whose UUID is already
//! indexed replaces the indexed copy without appending to the store again.

use crate::scoped::{CacheHandle, DomainCache};
use courier_core::{CacheDomain, CacheProfile, CacheSource, ShippingLabel};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug)]
pub struct DeliveryStateCache {
    handle: CacheHandle,
    by_tracking: DashMap<String, ShippingLabel>,
    by_uuid: DashMap<String, ShippingLabel>,
    primed: AtomicBool,
}

impl DomainCache for DeliveryStateCache {
    type Payload = ShippingLabel;
    const NAME: &'static str = "DeliveryStateCache";
    const PROFILE: CacheProfile =
        CacheProfile::memory(CacheDomain::Delivery, CacheSource::DeliveryStateTracker);

    fn open(handle: CacheHandle) -> Self {
        Self {
            handle,
            by_tracking: DashMap::new(),
            by_uuid: DashMap::new(),
            primed: AtomicBool::new(false),
        }
    }

    fn handle(&self) -> &CacheHandle {
        &self.handle
    }

    fn register(&self, label: ShippingLabel) {
        self.insert(label);
        self.primed.store(true, Ordering::Release);
        tracing::debug!(cache = Self::NAME, "Delivery state registered");
    }

    /// Drops the store bucket and both indexes.
    fn remove(&self) {
        if self.handle.remove().is_some() {
            tracing::debug!(cache = Self::NAME, "Delivery state removed");
        }
        self.by_tracking.clear();
        self.by_uuid.clear();
    }
}

impl DeliveryStateCache {
    /// Bulk-load `labels` and mark the cache primed, even when empty.
    pub fn prime<I>(&self, labels: I) -> usize
    where
        I: IntoIterator<Item = ShippingLabel>,
    {
        let mut loaded = 0;
        for label in labels {
            self.insert(label);
            loaded += 1;
        }
        self.primed.store(true, Ordering::Release);
        tracing::info!(cache = Self::NAME, loaded, "Delivery state cache primed");
        loaded
    }

    pub fn find_by_tracking_number(&self, tracking_number: &str) -> Option<ShippingLabel> {
        let normalized = normalize_tracking_number(tracking_number)?;
        self.by_tracking.get(&normalized).map(|entry| entry.value().clone())
    }

    pub fn find_by_uuid(&self, uuid: &str) -> Option<ShippingLabel> {
        let normalized = normalize_uuid(uuid)?;
        self.by_uuid.get(&normalized).map(|entry| entry.value().clone())
    }

    /// Every label indexed by UUID, in no particular order.
    pub fn all_labels(&self) -> Vec<ShippingLabel> {
        self.by_uuid.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn is_primed(&self) -> bool {
        self.primed.load(Ordering::Acquire)
    }

    fn insert(&self, label: ShippingLabel) {
        if self.index(&label) {
            self.handle.register(label);
        }
    }

    /// Index `label`; true when its UUID was not indexed before.
    fn index(&self, label: &ShippingLabel) -> bool {
        let tracking = normalize_tracking_number(&label.tracking_number);
        let previous = normalize_uuid(&label.uuid)
            .and_then(|uuid| self.by_uuid.insert(uuid, label.clone()));

        if let Some(previous) = &previous {
            if let Some(stale) = normalize_tracking_number(&previous.tracking_number) {
                if Some(&stale) != tracking.as_ref() {
                    self.by_tracking.remove_if(&stale, |_, indexed| indexed == previous);
                }
            }
        }
        if let Some(tracking) = tracking {
            self.by_tracking.insert(tracking, label.clone());
        }
        previous.is_none()
    }
}

fn normalize_tracking_number(tracking_number: &str) -> Option<String> {
    let trimmed = tracking_number.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_uppercase())
}

fn normalize_uuid(uuid: &str) -> Option<String> {
    let trimmed = uuid.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
