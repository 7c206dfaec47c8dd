//! Reconciliation results: scan metrics and mismatch alerts

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::ids::OrderId;
use crate::numeric::TokenAmount;

/// Drift severity, graded against configurable thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        };
        f.write_str(label)
    }
}

/// Aggregate result of one scan cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncMetrics {
    pub scanned_at: i64, // Unix millis
    pub total_orders: u64,
    pub synced_orders: u64,
    pub failed_checks: u64,
    pub mismatches: u64,
    pub mismatches_by_severity: BTreeMap<Severity, u64>,
    /// Mean absolute difference across mismatching orders, display units
    pub average_abs_difference: Decimal,
}

impl SyncMetrics {
    pub fn empty(scanned_at: i64) -> Self {
        Self {
            scanned_at,
            total_orders: 0,
            synced_orders: 0,
            failed_checks: 0,
            mismatches: 0,
            mismatches_by_severity: BTreeMap::new(),
            average_abs_difference: Decimal::ZERO,
        }
    }

    pub fn count_for(&self, severity: Severity) -> u64 {
        self.mismatches_by_severity.get(&severity).copied().unwrap_or(0)
    }
}

/// Drift detected on one order; persists until an operator resolves it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MismatchAlert {
    pub order_id: OrderId,
    pub severity: Severity,
    pub off_chain_amount: TokenAmount,
    pub on_chain_amount: TokenAmount,
    /// |off-chain − on-chain| in display units
    pub difference: Decimal,
    pub detected_at: i64,
    pub first_detected_at: i64,
    pub resolved: bool,
}

impl MismatchAlert {
    /// Merge a fresh detection into an existing alert for the same order
    ///
    /// Keeps the original detection time and reopens a resolved alert.
    pub fn merge_into(self, existing: Option<&MismatchAlert>) -> MismatchAlert {
        match existing {
            Some(previous) => MismatchAlert {
                first_detected_at: previous.first_detected_at,
                resolved: false,
                ..self
            },
            None => self,
        }
    }
}
