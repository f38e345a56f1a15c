//! QR code cache

use crate::scoped::{CacheHandle, DomainCache};
use courier_core::{CacheDomain, CacheProfile, CacheSource, QrMetadata};

/// QR codes generated during one scoped run.
#[derive(Debug)]
pub struct QrCodeCache {
    handle: CacheHandle,
}

impl DomainCache for QrCodeCache {
    type Payload = QrMetadata;
    const NAME: &'static str = "QrCodeCache";
    const PROFILE: CacheProfile = CacheProfile::memory(CacheDomain::Qr, CacheSource::QrCodeGenerator);

    fn open(handle: CacheHandle) -> Self {
        Self { handle }
    }

    fn handle(&self) -> &CacheHandle {
        &self.handle
    }

    fn register(&self, qr: QrMetadata) {
        tracing::debug!(cache = Self::NAME, uuid = %qr.uuid, "QR metadata registered");
        self.handle.register(qr);
    }
}

impl QrCodeCache {
    /// Most recently registered code for `uuid`.
    pub fn find_by_uuid(&self, uuid: &str) -> Option<QrMetadata> {
        let uuid = uuid.trim();
        self.entries().into_iter().rev().find(|qr| qr.uuid == uuid)
    }
}
