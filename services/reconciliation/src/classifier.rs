//! Mismatch classification
//!
//! Boundary policy:
//! - `|diff| < tolerance` is synced; a difference equal to the tolerance is a mismatch
//! - `pct < low_below_pct` is Low, `pct < medium_below_pct` is Medium, anything else High
//! - a nonzero difference on an order with a zero total is High

use rust_decimal::Decimal;
use types::errors::AmountError;
use types::numeric::TokenAmount;
use types::reconciliation::Severity;

use crate::config::ReconciliationThresholds;

/// Outcome of comparing one order across ledgers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Synced,
    Mismatch {
        severity: Severity,
        /// Absolute difference in display units
        difference: Decimal,
    },
}

#[derive(Debug, Clone)]
pub struct MismatchClassifier {
    thresholds: ReconciliationThresholds,
}

impl MismatchClassifier {
    pub fn new(thresholds: ReconciliationThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &ReconciliationThresholds {
        &self.thresholds
    }

    /// Compare the off-chain and on-chain remaining amounts of one order
    pub fn classify(
        &self,
        off_chain: TokenAmount,
        on_chain: TokenAmount,
        total: TokenAmount,
        decimals: u8,
    ) -> Result<Classification, AmountError> {
        let difference = off_chain.abs_diff(on_chain).to_display(decimals)?;
        if difference < self.thresholds.tolerance {
            return Ok(Classification::Synced);
        }

        let total = total.to_display(decimals)?;
        Ok(Classification::Mismatch {
            severity: self.severity(difference, total),
            difference,
        })
    }

    /// Grade a difference against the order total
    pub fn severity(&self, difference: Decimal, total: Decimal) -> Severity {
        if total.is_zero() {
            return Severity::High;
        }
        let pct = difference
            .checked_div(total)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED));
        match pct {
            Some(pct) if pct < self.thresholds.low_below_pct => Severity::Low,
            Some(pct) if pct < self.thresholds.medium_below_pct => Severity::Medium,
            _ => Severity::High,
        }
    }
}

impl Default for MismatchClassifier {
    fn default() -> Self {
        Self::new(ReconciliationThresholds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::str::FromStr;

    const UNIT: u128 = 1_000_000;

    fn classify(off: u128, on: u128, total: u128) -> Classification {
        MismatchClassifier::default()
            .classify(TokenAmount::new(off), TokenAmount::new(on), TokenAmount::new(total), 6)
            .unwrap()
    }

    fn severity_of(c: Classification) -> Option<Severity> {
        match c {
            Classification::Synced => None,
            Classification::Mismatch { severity, .. } => Some(severity),
        }
    }

    #[test]
    fn test_sub_tolerance_difference_is_synced() {
        // 100.0 vs 99.9999995 on an 18-decimal token
        let classifier = MismatchClassifier::default();
        let off = TokenAmount::new(100_000_000_000_000_000_000);
        let on = TokenAmount::new(99_999_999_500_000_000_000);
        let result = classifier.classify(off, on, off, 18).unwrap();
        assert_eq!(result, Classification::Synced);
    }

    #[test]
    fn test_difference_equal_to_tolerance_is_mismatch() {
        // One base unit of a 6-decimal token is exactly 0.000001
        let result = classify(100 * UNIT, 100 * UNIT - 1, 100 * UNIT);
        assert_eq!(
            result,
            Classification::Mismatch {
                severity: Severity::Low,
                difference: Decimal::from_str("0.000001").unwrap(),
            }
        );
    }

    #[test]
    fn test_exact_low_boundary_is_medium() {
        // 0.1 of 100 is exactly 0.1%
        let result = classify(100 * UNIT, 100 * UNIT - UNIT / 10, 100 * UNIT);
        assert_eq!(severity_of(result), Some(Severity::Medium));
    }

    #[test]
    fn test_exact_medium_boundary_is_high() {
        let result = classify(100 * UNIT, 99 * UNIT, 100 * UNIT);
        assert_eq!(severity_of(result), Some(Severity::High));
    }

    #[test]
    fn test_just_below_boundaries() {
        let low = classify(100 * UNIT, 100 * UNIT - UNIT / 10 + 1, 100 * UNIT);
        assert_eq!(severity_of(low), Some(Severity::Low));
        let medium = classify(100 * UNIT, 99 * UNIT + 1, 100 * UNIT);
        assert_eq!(severity_of(medium), Some(Severity::Medium));
    }

    #[test]
    fn test_zero_total_with_difference_is_high() {
        let result = classify(5 * UNIT, 0, 0);
        assert_eq!(severity_of(result), Some(Severity::High));
    }

    #[test]
    fn test_direction_does_not_matter() {
        assert_eq!(classify(100 * UNIT, 90 * UNIT, 100 * UNIT), classify(90 * UNIT, 100 * UNIT, 100 * UNIT));
    }

    proptest! {
        #[test]
        fn prop_classification_is_deterministic(
            off in 0u128..1_000_000_000,
            on in 0u128..1_000_000_000,
            total in 0u128..1_000_000_000,
        ) {
            prop_assert_eq!(classify(off, on, total), classify(off, on, total));
        }

        #[test]
        fn prop_severity_monotonic_in_difference(
            total in 1_000u128..1_000_000_000,
            a in 1u128..1_000_000,
            b in 1u128..1_000_000,
        ) {
            let (small, large) = if a <= b { (a, b) } else { (b, a) };
            let s = severity_of(classify(total + small, total, total));
            let l = severity_of(classify(total + large, total, total));
            prop_assert!(s <= l);
        }
    }
}
