//! Seller reputation summary used for scoring and ranking

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Reputation snapshot of one seller (or a bundle of sellers)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SellerReputation {
    /// Mean rating on a 0-5 scale
    pub average_rating: Decimal,
    pub rating_count: u64,
    pub trade_count: u64,
    /// Share of trades canceled, 0-1
    pub cancellation_rate: Decimal,
    /// Mean seconds between fiat payment and token release
    pub average_release_time_secs: Decimal,
}

impl SellerReputation {
    pub fn new(
        average_rating: Decimal,
        rating_count: u64,
        trade_count: u64,
        cancellation_rate: Decimal,
        average_release_time_secs: Decimal,
    ) -> Self {
        Self {
            average_rating,
            rating_count,
            trade_count,
            cancellation_rate,
            average_release_time_secs,
        }
    }

    /// A seller nobody has rated yet
    pub fn unrated() -> Self {
        Self::default()
    }
}
