//! Payload records cached by the domain caches
//!
//! These mirror the rows the courier services persist elsewhere. Only the
//! fields the caches index or compare on are carried here.

use crate::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shipping label metadata tracked while a delivery is in flight.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShippingLabel {
    pub uuid: String,
    pub tracking_number: String,
    pub recipient_name: String,
    pub address: String,
    pub priority: bool,
    pub delivered: bool,
    pub created_at: Timestamp,
}

/// QR code generated for a shipping label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QrMetadata {
    pub uuid: String,
    pub qr_data: String,
    pub created_at: Timestamp,
}

/// State of the camera pipeline when a scan response was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CameraState {
    Searching,
    Analyzing,
    Found,
    Error,
}

impl CameraState {
    pub fn display_name(&self) -> &'static str {
        match self {
            CameraState::Searching => "Searching",
            CameraState::Analyzing => "Analyzing",
            CameraState::Found => "Found",
            CameraState::Error => "Error",
        }
    }
}

impl fmt::Display for CameraState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Result of scanning a shipping label through the vision service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanResponse {
    pub uuid: Option<String>,
    pub camera_state: CameraState,
    pub tracking_number: Option<String>,
    pub name: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub pending_intake: bool,
}

impl ScanResponse {
    /// True when neither a tracking number nor an address was read.
    pub fn is_missing_critical_data(&self) -> bool {
        is_blank(&self.tracking_number) && is_blank(&self.address)
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |s| s.trim().is_empty())
}
