//! Scan response cache

use crate::scoped::{CacheHandle, DomainCache};
use courier_core::{CacheDomain, CacheProfile, CacheSource, ScanResponse};

/// Responses produced by the label scanner during one scoped run.
#[derive(Debug)]
pub struct ScanCache {
    handle: CacheHandle,
}

impl DomainCache for ScanCache {
    type Payload = ScanResponse;
    const NAME: &'static str = "ScanCache";
    const PROFILE: CacheProfile = CacheProfile::memory(CacheDomain::Scans, CacheSource::AiScanner);

    fn open(handle: CacheHandle) -> Self {
        Self { handle }
    }

    fn handle(&self) -> &CacheHandle {
        &self.handle
    }

    fn register(&self, response: ScanResponse) {
        tracing::debug!(
            cache = Self::NAME,
            state = %response.camera_state,
            uuid = ?response.uuid,
            tracking_number = ?response.tracking_number,
            "Caching scan response"
        );
        if response.uuid.as_deref().map_or(true, |uuid| uuid.trim().is_empty()) {
            tracing::warn!(cache = Self::NAME, "Scan response has no UUID");
        }
        self.handle.register(response);
    }
}

impl ScanCache {
    /// Up to `limit` responses, newest first. A `limit` of 0 returns all.
    pub fn recent_responses(&self, limit: usize) -> Vec<ScanResponse> {
        let newest_first = self.entries().into_iter().rev();
        if limit == 0 {
            newest_first.collect()
        } else {
            newest_first.take(limit).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CacheStore;
    use courier_test_utils::fixtures::{scan_error, scan_found};
    use std::sync::Arc;
    use std::time::Duration;

    fn cache() -> ScanCache {
        ScanCache::open(CacheHandle::new(
            Arc::new(CacheStore::new()),
            ScanCache::PROFILE,
            Duration::from_secs(60),
        ))
    }

    #[test]
    fn test_recent_responses_newest_first() {
        let cache = cache();
        cache.register(scan_found("TRK-1"));
        cache.register(scan_error("blurry"));
        cache.register(scan_found("TRK-3"));

        let recent = cache.recent_responses(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].tracking_number.as_deref(), Some("TRK-3"));
        assert_eq!(recent[1].notes.as_deref(), Some("blurry"));

        let all = cache.recent_responses(0);
        assert_eq!(all.len(), 3);
        assert_eq!(all[2].tracking_number.as_deref(), Some("TRK-1"));
    }

    #[test]
    fn test_recent_responses_empty() {
        assert!(cache().recent_responses(5).is_empty());
    }
}
