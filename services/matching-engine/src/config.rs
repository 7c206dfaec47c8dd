//! Matching and ranking configuration

use rust_decimal::Decimal;
use serde::Deserialize;

/// Matching engine configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Network to match on when the request does not name one
    pub chain_id: Option<u64>,
    /// Weight of the reputation bonus in the order score
    pub reputation_weight: Decimal,
    /// Platform minimum purchase, in display units of the token
    pub min_amount: Decimal,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            chain_id: None,
            reputation_weight: Decimal::new(5, 1),
            min_amount: Decimal::ONE,
        }
    }
}

/// Seller ranking configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Most single-seller suggestions returned
    pub max_suggestions: usize,
    /// Distance (display units) from the request within which one seller fulfils alone
    pub fulfil_tolerance: Decimal,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            max_suggestions: 3,
            fulfil_tolerance: Decimal::new(1, 6),
        }
    }
}
