//! Reconciliation monitor configuration

use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

/// Mismatch thresholds
///
/// `tolerance` is in display units; the severity bounds are percentages of
/// the order total. Each bound is exclusive on its upper side.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReconciliationThresholds {
    /// Differences strictly below this count as synced
    pub tolerance: Decimal,
    /// Mismatches strictly below this percentage are Low
    pub low_below_pct: Decimal,
    /// Mismatches strictly below this percentage are Medium, the rest High
    pub medium_below_pct: Decimal,
}

impl Default for ReconciliationThresholds {
    fn default() -> Self {
        Self {
            tolerance: Decimal::new(1, 6),
            low_below_pct: Decimal::new(1, 1),
            medium_below_pct: Decimal::ONE,
        }
    }
}

/// Reconciliation monitor configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Seconds between scans
    pub scan_interval_secs: u64,
    pub thresholds: ReconciliationThresholds,
}

impl MonitorConfig {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: 300,
            thresholds: ReconciliationThresholds::default(),
        }
    }
}
