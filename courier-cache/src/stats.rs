//! Cache statistics.

use serde::{Deserialize, Serialize};

/// Snapshot of the store taken at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of distinct keys.
    pub keys: usize,
    /// Number of values across every bucket.
    pub values: usize,
    /// Values not yet expired at the snapshot instant.
    pub valid: usize,
    /// Values expired at the snapshot instant.
    pub expired: usize,
}

impl CacheStats {
    /// Share of values that are still valid (0.0 to 1.0).
    pub fn valid_ratio(&self) -> f64 {
        if self.values == 0 {
            0.0
        } else {
            self.valid as f64 / self.values as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_ratio() {
        assert_eq!(CacheStats::default().valid_ratio(), 0.0);
        let stats = CacheStats {
            keys: 1,
            values: 4,
            valid: 3,
            expired: 1,
        };
        assert!((stats.valid_ratio() - 0.75).abs() < f64::EPSILON);
    }
}
