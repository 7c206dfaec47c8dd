//! Seller suggestions presented to the buyer
//!
//! Ranking output only. A bundle groups orders from several sellers for
//! display; the matched orders underneath are unchanged.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::WalletAddress;
use crate::numeric::TokenAmount;
use crate::plan::MatchedOrder;
use crate::reputation::SellerReputation;

/// Pseudo-seller id shown when several sellers are required
pub const BUNDLED_SELLERS: &str = "BUNDLED_SELLERS";

/// Who a suggestion represents
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "address", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SuggestedSeller {
    Single(WalletAddress),
    Bundle,
}

impl SuggestedSeller {
    pub fn is_bundle(&self) -> bool {
        matches!(self, SuggestedSeller::Bundle)
    }
}

impl fmt::Display for SuggestedSeller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuggestedSeller::Single(address) => write!(f, "{}", address),
            SuggestedSeller::Bundle => f.write_str(BUNDLED_SELLERS),
        }
    }
}

/// One ranked choice for the buyer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellerSuggestion {
    pub seller: SuggestedSeller,
    pub matched: Vec<MatchedOrder>,
    pub total_amount: TokenAmount,
    /// Estimated fiat cost; recomputed against the oracle at confirmation
    pub estimated_fiat_cost: Option<Decimal>,
    pub reputation: SellerReputation,
}
