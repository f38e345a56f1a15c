//! Cache classifiers
//!
//! Every cache key carries four classifiers next to its raw key. Each
//! classifier has an explicit `Unset` variant: a key built without a domain
//! is keyed under `CacheDomain::Unset`, which never compares equal to a real
//! domain. There is no wildcard.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// CLASSIFIER ENUMS
// ============================================================================

/// Storage tier a cached entry is intended for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CacheKind {
    #[default]
    Unset,
    /// Fastest, short-lived
    Memory,
    /// Shared, distributed, semi-persistent
    Redis,
    /// Flat file or embedded database
    Disk,
    /// Memory with a slower fallback
    Hybrid,
    /// Persistent, slowest
    Database,
}

/// Subsystem a cached entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CacheDomain {
    #[default]
    Unset,
    Scans,
    ScanErrors,
    Qr,
    Tracking,
    Delivery,
    User,
    Routes,
}

/// Component that produced a cached entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CacheSource {
    #[default]
    Unset,
    AiScanner,
    QrCodeGenerator,
    TrackingNumberGenerator,
    DeliveryStateTracker,
}

/// Schema version of a cached entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CacheVersion {
    #[default]
    Unset,
    Alpha,
    Beta,
    Dev,
    V1_0,
    V1_1,
    V1_2,
    V1_3,
    V1_4,
    V1_5,
    Experimental,
}

impl CacheKind {
    /// Every variant, in declaration order.
    pub const ALL: &'static [CacheKind] = &[
        CacheKind::Unset,
        CacheKind::Memory,
        CacheKind::Redis,
        CacheKind::Disk,
        CacheKind::Hybrid,
        CacheKind::Database,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheKind::Unset => "unset",
            CacheKind::Memory => "memory",
            CacheKind::Redis => "redis",
            CacheKind::Disk => "disk",
            CacheKind::Hybrid => "hybrid",
            CacheKind::Database => "database",
        }
    }

    pub fn is_set(&self) -> bool {
        *self != CacheKind::Unset
    }
}

impl CacheDomain {
    /// Every variant, in declaration order.
    pub const ALL: &'static [CacheDomain] = &[
        CacheDomain::Unset,
        CacheDomain::Scans,
        CacheDomain::ScanErrors,
        CacheDomain::Qr,
        CacheDomain::Tracking,
        CacheDomain::Delivery,
        CacheDomain::User,
        CacheDomain::Routes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheDomain::Unset => "unset",
            CacheDomain::Scans => "scans",
            CacheDomain::ScanErrors => "scan_errors",
            CacheDomain::Qr => "qr",
            CacheDomain::Tracking => "tracking",
            CacheDomain::Delivery => "delivery",
            CacheDomain::User => "user",
            CacheDomain::Routes => "routes",
        }
    }

    pub fn is_set(&self) -> bool {
        *self != CacheDomain::Unset
    }
}

impl CacheSource {
    /// Every variant, in declaration order.
    pub const ALL: &'static [CacheSource] = &[
        CacheSource::Unset,
        CacheSource::AiScanner,
        CacheSource::QrCodeGenerator,
        CacheSource::TrackingNumberGenerator,
        CacheSource::DeliveryStateTracker,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheSource::Unset => "unset",
            CacheSource::AiScanner => "ai_scanner",
            CacheSource::QrCodeGenerator => "qr_code_generator",
            CacheSource::TrackingNumberGenerator => "tracking_number_generator",
            CacheSource::DeliveryStateTracker => "delivery_state_tracker",
        }
    }

    pub fn is_set(&self) -> bool {
        *self != CacheSource::Unset
    }
}

impl CacheVersion {
    /// Every variant, in declaration order.
    pub const ALL: &'static [CacheVersion] = &[
        CacheVersion::Unset,
        CacheVersion::Alpha,
        CacheVersion::Beta,
        CacheVersion::Dev,
        CacheVersion::V1_0,
        CacheVersion::V1_1,
        CacheVersion::V1_2,
        CacheVersion::V1_3,
        CacheVersion::V1_4,
        CacheVersion::V1_5,
        CacheVersion::Experimental,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheVersion::Unset => "unset",
            CacheVersion::Alpha => "alpha",
            CacheVersion::Beta => "beta",
            CacheVersion::Dev => "dev",
            CacheVersion::V1_0 => "v1.0",
            CacheVersion::V1_1 => "v1.1",
            CacheVersion::V1_2 => "v1.2",
            CacheVersion::V1_3 => "v1.3",
            CacheVersion::V1_4 => "v1.4",
            CacheVersion::V1_5 => "v1.5",
            CacheVersion::Experimental => "experimental",
        }
    }

    pub fn is_set(&self) -> bool {
        *self != CacheVersion::Unset
    }
}

macro_rules! classifier_strings {
    ($($ty:ident),*) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }

            impl FromStr for $ty {
                type Err = String;

                /// Case-insensitive; surrounding whitespace is ignored.
                fn from_str(s: &str) -> Result<Self, Self::Err> {
                    let normalized = s.trim().to_ascii_lowercase();
                    $ty::ALL
                        .iter()
                        .copied()
                        .find(|variant| variant.as_str() == normalized)
                        .ok_or_else(|| format!("Invalid {}: {}", stringify!($ty), s))
                }
            }
        )*
    };
}

classifier_strings!(CacheKind, CacheDomain, CacheSource, CacheVersion);

// ============================================================================
// CACHE PROFILE
// ============================================================================

/// The fixed `(kind, domain, source, version)` tuple a domain cache keys with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CacheProfile {
    pub kind: CacheKind,
    pub domain: CacheDomain,
    pub source: CacheSource,
    pub version: CacheVersion,
}

impl CacheProfile {
    /// Profile with every classifier unset.
    pub const UNSET: CacheProfile = CacheProfile::new(
        CacheKind::Unset,
        CacheDomain::Unset,
        CacheSource::Unset,
        CacheVersion::Unset,
    );

    pub const fn new(
        kind: CacheKind,
        domain: CacheDomain,
        source: CacheSource,
        version: CacheVersion,
    ) -> Self {
        Self {
            kind,
            domain,
            source,
            version,
        }
    }

    /// In-memory, version 1.0 profile for a domain and source.
    pub const fn memory(domain: CacheDomain, source: CacheSource) -> Self {
        Self::new(CacheKind::Memory, domain, source, CacheVersion::V1_0)
    }
}

impl fmt::Display for CacheProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.kind, self.domain, self.source, self.version
        )
    }
}
