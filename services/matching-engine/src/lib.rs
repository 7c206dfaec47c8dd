//! Matching Engine Service
//!
//! Selects escrowed sell orders for a buyer's request and prepares what the
//! buyer confirms:
//! - `engine`: filter, score and allocate open orders into a `TradePlan`
//! - `ranking`: group the plan by seller into suggestions
//! - `pricing`: lock prices against the oracle at confirmation
//!
//! **Key Invariants:**
//! - A single order that covers the request is always preferred
//! - Allocation never exceeds an order's remaining amount
//! - Either the full request is allocated or no plan is returned
//! - No self-trades

pub mod config;
pub mod engine;
pub mod errors;
pub mod pricing;
pub mod ranking;
pub mod scoring;

pub use config::{MatchingConfig, RankingConfig};
pub use engine::{allocate, MatchingEngine};
pub use errors::{MatchError, PricingError, RankingError};
pub use pricing::{price_plan, price_suggestion, FixedPriceOracle, PriceOracle};
pub use ranking::{SellerRanker, SELLER_SORT_ORDER};
pub use scoring::ScoredOrder;
