//! Courier Test Utilities
//!
//! Centralized test infrastructure for the courier workspace:
//! - Proptest generators for classifiers and payload records
//! - Fixtures for shipping labels, QR codes and scan responses
//! - Scripted task bodies and layered error chains for runner tests
//! - Test tracing initialization

pub use courier_core::{
    BoxError, CacheDomain, CacheKind, CacheProfile, CacheSource, CacheVersion, CameraState,
    QrMetadata, ScanResponse, ShippingLabel, Timestamp,
};

use std::error::Error;
use std::fmt;
use std::time::Duration;

// ============================================================================
// TASK HELPERS
// ============================================================================

/// Shorthand for `Duration::from_millis`.
pub fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

/// A task body that sleeps for `delay` and then returns `outcome`.
///
/// Success and failure share one future type, so scripted tasks can be
/// collected into a `Vec` without boxing.
pub async fn delayed<T>(delay: Duration, outcome: Result<T, &'static str>) -> Result<T, BoxError> {
    tokio::time::sleep(delay).await;
    outcome.map_err(Into::into)
}

/// Error with an optional cause, for building source chains.
#[derive(Debug)]
pub struct LayeredError {
    message: String,
    cause: Option<Box<LayeredError>>,
}

impl fmt::Display for LayeredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for LayeredError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause.as_deref().map(|c| c as &(dyn Error + 'static))
    }
}

/// Chain of errors, outermost first: `["top", "mid", "deep"]` builds
/// `top` caused by `mid` caused by `deep`. An empty message makes that
/// layer render as nothing.
pub fn layered_error(messages: &[&str]) -> LayeredError {
    let mut layers = messages.iter().rev();
    let innermost = LayeredError {
        message: layers.next().map(|m| m.to_string()).unwrap_or_default(),
        cause: None,
    };
    layers.fold(innermost, |cause, message| LayeredError {
        message: message.to_string(),
        cause: Some(Box::new(cause)),
    })
}

/// Install a test-writer tracing subscriber once per test binary.
pub fn init_test_tracing() {
    courier_core::telemetry::init_test_tracing("debug");
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating courier types.

    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use uuid::Uuid;

    // === Classifier Generators ===

    /// Any CacheKind, including `Unset`.
    pub fn arb_cache_kind() -> impl Strategy<Value = CacheKind> {
        prop_oneof![
            Just(CacheKind::Unset),
            Just(CacheKind::Memory),
            Just(CacheKind::Redis),
            Just(CacheKind::Disk),
            Just(CacheKind::Hybrid),
            Just(CacheKind::Database),
        ]
    }

    /// Any CacheDomain, including `Unset`.
    pub fn arb_cache_domain() -> impl Strategy<Value = CacheDomain> {
        prop_oneof![
            Just(CacheDomain::Unset),
            Just(CacheDomain::Scans),
            Just(CacheDomain::ScanErrors),
            Just(CacheDomain::Qr),
            Just(CacheDomain::Tracking),
            Just(CacheDomain::Delivery),
            Just(CacheDomain::User),
            Just(CacheDomain::Routes),
        ]
    }

    /// Any CacheSource, including `Unset`.
    pub fn arb_cache_source() -> impl Strategy<Value = CacheSource> {
        prop_oneof![
            Just(CacheSource::Unset),
            Just(CacheSource::AiScanner),
            Just(CacheSource::QrCodeGenerator),
            Just(CacheSource::TrackingNumberGenerator),
            Just(CacheSource::DeliveryStateTracker),
        ]
    }

    /// Any CacheVersion, including `Unset`.
    pub fn arb_cache_version() -> impl Strategy<Value = CacheVersion> {
        prop_oneof![
            Just(CacheVersion::Unset),
            Just(CacheVersion::Alpha),
            Just(CacheVersion::Beta),
            Just(CacheVersion::Dev),
            Just(CacheVersion::V1_0),
            Just(CacheVersion::V1_1),
            Just(CacheVersion::V1_2),
            Just(CacheVersion::V1_3),
            Just(CacheVersion::V1_4),
            Just(CacheVersion::V1_5),
            Just(CacheVersion::Experimental),
        ]
    }

    /// Any classifier tuple.
    pub fn arb_cache_profile() -> impl Strategy<Value = CacheProfile> {
        (
            arb_cache_kind(),
            arb_cache_domain(),
            arb_cache_source(),
            arb_cache_version(),
        )
            .prop_map(|(kind, domain, source, version)| {
                CacheProfile::new(kind, domain, source, version)
            })
    }

    // === Payload Generators ===

    /// Generate a Timestamp within 2020-2030.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (1577836800i64..1893456000i64).prop_map(|secs| {
            chrono::DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
        })
    }

    /// Generate a hyphenated UUID string.
    pub fn arb_uuid_string() -> impl Strategy<Value = String> {
        any::<[u8; 16]>().prop_map(|bytes| Uuid::from_bytes(bytes).to_string())
    }

    /// Generate a tracking number such as `TRK-8F2KQ01Z`.
    pub fn arb_tracking_number() -> impl Strategy<Value = String> {
        "TRK-[0-9A-Z]{8}"
    }

    pub fn arb_shipping_label() -> impl Strategy<Value = ShippingLabel> {
        (
            arb_uuid_string(),
            arb_tracking_number(),
            "[A-Z][a-z]{2,10} [A-Z][a-z]{2,12}",
            "[1-9][0-9]{0,4} [A-Z][a-z]{3,10} (St|Ave|Rd)",
            any::<bool>(),
            any::<bool>(),
            arb_timestamp(),
        )
            .prop_map(
                |(uuid, tracking_number, recipient_name, address, priority, delivered, created_at)| {
                    ShippingLabel {
                        uuid,
                        tracking_number,
                        recipient_name,
                        address,
                        priority,
                        delivered,
                        created_at,
                    }
                },
            )
    }

    pub fn arb_qr_metadata() -> impl Strategy<Value = QrMetadata> {
        (arb_uuid_string(), "[a-zA-Z0-9:/._-]{8,64}", arb_timestamp()).prop_map(
            |(uuid, qr_data, created_at)| QrMetadata {
                uuid,
                qr_data,
                created_at,
            },
        )
    }

    pub fn arb_camera_state() -> impl Strategy<Value = CameraState> {
        prop_oneof![
            Just(CameraState::Searching),
            Just(CameraState::Analyzing),
            Just(CameraState::Found),
            Just(CameraState::Error),
        ]
    }

    pub fn arb_scan_response() -> impl Strategy<Value = ScanResponse> {
        (
            proptest::option::of(arb_uuid_string()),
            arb_camera_state(),
            proptest::option::of(arb_tracking_number()),
            proptest::option::of("[A-Z][a-z]{2,10}"),
            proptest::option::of("[1-9][0-9]{0,4} [A-Z][a-z]{3,10} St"),
            any::<bool>(),
        )
            .prop_map(
                |(uuid, camera_state, tracking_number, name, address, pending_intake)| {
                    ScanResponse {
                        uuid,
                        camera_state,
                        tracking_number,
                        name,
                        address,
                        notes: None,
                        pending_intake,
                    }
                },
            )
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built payloads for common testing scenarios.

    use super::*;
    use chrono::Utc;

    /// A pending shipping label with the given identifiers.
    pub fn shipping_label(uuid: &str, tracking_number: &str) -> ShippingLabel {
        ShippingLabel {
            uuid: uuid.to_string(),
            tracking_number: tracking_number.to_string(),
            recipient_name: "Ada Lovelace".to_string(),
            address: "12 Analytical Way".to_string(),
            priority: false,
            delivered: false,
            created_at: Utc::now(),
        }
    }

    pub fn priority_label(uuid: &str, tracking_number: &str) -> ShippingLabel {
        ShippingLabel {
            priority: true,
            ..shipping_label(uuid, tracking_number)
        }
    }

    pub fn qr_metadata(uuid: &str) -> QrMetadata {
        QrMetadata {
            uuid: uuid.to_string(),
            qr_data: format!("courier://label/{}", uuid),
            created_at: Utc::now(),
        }
    }

    /// A successful scan that read both tracking number and address.
    pub fn scan_found(tracking_number: &str) -> ScanResponse {
        ScanResponse {
            uuid: None,
            camera_state: CameraState::Found,
            tracking_number: Some(tracking_number.to_string()),
            name: Some("Grace Hopper".to_string()),
            address: Some("1 Compiler Ct".to_string()),
            notes: None,
            pending_intake: true,
        }
    }

    /// A scan that produced nothing usable.
    pub fn scan_error(notes: &str) -> ScanResponse {
        ScanResponse {
            uuid: None,
            camera_state: CameraState::Error,
            tracking_number: None,
            name: None,
            address: None,
            notes: Some(notes.to_string()),
            pending_intake: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layered_error_chain() {
        let err = layered_error(&["top", "mid", "deep-message"]);
        assert_eq!(err.to_string(), "top");
        let mid = err.source().unwrap();
        assert_eq!(mid.to_string(), "mid");
        let deep = mid.source().unwrap();
        assert_eq!(deep.to_string(), "deep-message");
        assert!(deep.source().is_none());
    }

    #[test]
    fn test_layered_error_empty() {
        let err = layered_error(&[]);
        assert_eq!(err.to_string(), "");
        assert!(err.source().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_waits_then_resolves() {
        let start = tokio::time::Instant::now();
        assert_eq!(delayed(ms(30), Ok(5)).await.unwrap(), 5);
        assert!(start.elapsed() >= ms(30));
        let err = delayed::<u8>(ms(0), Err("nope")).await.unwrap_err();
        assert_eq!(err.to_string(), "nope");
    }

    #[test]
    fn test_fixtures() {
        let label = fixtures::priority_label("u-1", "TRK-1");
        assert!(label.priority);
        assert_eq!(label.tracking_number, "TRK-1");
        assert!(fixtures::scan_error("blurry").is_missing_critical_data());
        assert!(!fixtures::scan_found("TRK-2").is_missing_critical_data());
        assert!(fixtures::qr_metadata("u-9").qr_data.ends_with("u-9"));
    }
}
