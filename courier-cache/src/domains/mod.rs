//! Domain caches built on [`DomainCache`](crate::DomainCache).

mod delivery;
mod qr;
mod scans;

pub use delivery::DeliveryStateCache;
pub use qr::QrCodeCache;
pub use scans::ScanCache;
