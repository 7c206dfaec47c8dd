//! Seller ranking
//!
//! Groups matched orders by seller and decides what the buyer is shown:
//! - up to `max_suggestions` sellers that can each fill the request alone,
//!   ordered by `SELLER_SORT_ORDER`
//! - otherwise one `BUNDLED_SELLERS` suggestion over every matched order,
//!   with reputation weighted by trade count

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;
use types::ids::WalletAddress;
use types::numeric::{Token, TokenAmount};
use types::plan::{MatchedOrder, TradePlan};
use types::reputation::SellerReputation;
use types::suggestion::{SellerSuggestion, SuggestedSeller};

use crate::config::RankingConfig;
use crate::errors::RankingError;

/// Reputation field a ranking step compares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortKey {
    Rating,
    TradeCount,
    CancellationRate,
    AverageReleaseTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Asc,
    Desc,
}

/// Tie-break order for single-seller suggestions, most significant first
pub const SELLER_SORT_ORDER: [(SortKey, Direction); 4] = [
    (SortKey::Rating, Direction::Desc),
    (SortKey::TradeCount, Direction::Desc),
    (SortKey::CancellationRate, Direction::Asc),
    (SortKey::AverageReleaseTime, Direction::Asc),
];

impl SortKey {
    fn compare(&self, a: &SellerReputation, b: &SellerReputation) -> Ordering {
        match self {
            SortKey::Rating => a.average_rating.cmp(&b.average_rating),
            SortKey::TradeCount => a.trade_count.cmp(&b.trade_count),
            SortKey::CancellationRate => a.cancellation_rate.cmp(&b.cancellation_rate),
            SortKey::AverageReleaseTime => a
                .average_release_time_secs
                .cmp(&b.average_release_time_secs),
        }
    }
}

/// Compare two reputations under an ordered list of sort keys
pub fn compare_by_keys(
    keys: &[(SortKey, Direction)],
    a: &SellerReputation,
    b: &SellerReputation,
) -> Ordering {
    keys.iter()
        .map(|(key, direction)| match direction {
            Direction::Asc => key.compare(a, b),
            Direction::Desc => key.compare(b, a),
        })
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Orders from one seller, in plan order
struct SellerGroup {
    seller: WalletAddress,
    reputation: SellerReputation,
    matched: Vec<MatchedOrder>,
    total: TokenAmount,
}

/// Builds seller suggestions from matched orders
pub struct SellerRanker {
    config: RankingConfig,
}

impl SellerRanker {
    pub fn new(config: RankingConfig) -> Self {
        Self { config }
    }

    /// Suggestions for a trade plan
    pub fn rank_plan(&self, plan: &TradePlan) -> Result<Vec<SellerSuggestion>, RankingError> {
        self.rank(&plan.token, plan.requested, &plan.matched)
    }

    /// Suggestions for `requested` units of `token` over `matched`
    pub fn rank(
        &self,
        token: &Token,
        requested: TokenAmount,
        matched: &[MatchedOrder],
    ) -> Result<Vec<SellerSuggestion>, RankingError> {
        if matched.is_empty() {
            return Ok(Vec::new());
        }

        let tolerance = token.base_units(self.config.fulfil_tolerance)?;
        let groups = group_by_seller(matched);

        let mut singles: Vec<&SellerGroup> = groups
            .iter()
            .filter(|group| requested.abs_diff(group.total) <= tolerance)
            .collect();

        if singles.is_empty() {
            debug!(sellers = groups.len(), "No single seller fills the request, bundling");
            return Ok(vec![bundle(&groups, matched)]);
        }

        singles.sort_by(|a, b| compare_by_keys(&SELLER_SORT_ORDER, &a.reputation, &b.reputation));
        Ok(singles
            .into_iter()
            .take(self.config.max_suggestions)
            .map(|group| SellerSuggestion {
                seller: SuggestedSeller::Single(group.seller.clone()),
                matched: group.matched.clone(),
                total_amount: group.total,
                estimated_fiat_cost: estimated_fiat_cost(&group.matched),
                reputation: group.reputation.clone(),
            })
            .collect())
    }
}

fn group_by_seller(matched: &[MatchedOrder]) -> Vec<SellerGroup> {
    let mut groups: Vec<SellerGroup> = Vec::new();
    for m in matched {
        match groups.iter_mut().find(|g| &g.seller == m.seller()) {
            Some(group) => {
                group.total = group.total.saturating_add(m.amount_to_take);
                group.matched.push(m.clone());
            }
            None => groups.push(SellerGroup {
                seller: m.seller().clone(),
                reputation: m.seller_reputation.clone(),
                matched: vec![m.clone()],
                total: m.amount_to_take,
            }),
        }
    }
    groups
}

fn bundle(groups: &[SellerGroup], matched: &[MatchedOrder]) -> SellerSuggestion {
    let total = matched
        .iter()
        .fold(TokenAmount::ZERO, |acc, m| acc.saturating_add(m.amount_to_take));
    let reputations: Vec<&SellerReputation> = groups.iter().map(|g| &g.reputation).collect();
    SellerSuggestion {
        seller: SuggestedSeller::Bundle,
        matched: matched.to_vec(),
        total_amount: total,
        estimated_fiat_cost: estimated_fiat_cost(matched),
        reputation: weighted_reputation(&reputations),
    }
}

/// Trade-count weighted reputation of several sellers
///
/// Falls back to a simple mean when none of them has traded.
pub fn weighted_reputation(reputations: &[&SellerReputation]) -> SellerReputation {
    if reputations.is_empty() {
        return SellerReputation::unrated();
    }

    let trade_count: u64 = reputations.iter().map(|r| r.trade_count).sum();
    let rating_count: u64 = reputations.iter().map(|r| r.rating_count).sum();
    let (weights, denominator): (Vec<Decimal>, Decimal) = if trade_count == 0 {
        (vec![Decimal::ONE; reputations.len()], Decimal::from(reputations.len()))
    } else {
        (
            reputations.iter().map(|r| Decimal::from(r.trade_count)).collect(),
            Decimal::from(trade_count),
        )
    };

    let mean = |field: fn(&SellerReputation) -> Decimal| -> Decimal {
        let sum: Decimal = reputations
            .iter()
            .zip(&weights)
            .map(|(r, w)| field(*r) * *w)
            .sum();
        sum / denominator
    };

    SellerReputation {
        average_rating: mean(|r: &SellerReputation| r.average_rating),
        rating_count,
        trade_count,
        cancellation_rate: mean(|r: &SellerReputation| r.cancellation_rate),
        average_release_time_secs: mean(|r: &SellerReputation| r.average_release_time_secs),
    }
}

fn estimated_fiat_cost(matched: &[MatchedOrder]) -> Option<Decimal> {
    matched
        .iter()
        .try_fold(Decimal::ZERO, |acc, m| acc.checked_add(m.fiat_cost()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use types::ids::{FiatCurrency, OrderId, PaymentChannel};
    use types::numeric::Markup;
    use types::order::Order;

    const UNIT: u128 = 1_000_000;

    fn usdc() -> Token {
        Token::new("USDC", 6)
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn rep(rating: &str, trades: u64, cancel: &str, release: u64) -> SellerReputation {
        SellerReputation::new(dec(rating), trades, trades, dec(cancel), Decimal::from(release))
    }

    fn matched(id: u64, seller: &str, reputation: SellerReputation, take: u128) -> MatchedOrder {
        let order = Order::new(
            OrderId::new(id),
            WalletAddress::new(seller),
            usdc(),
            FiatCurrency::new("KES"),
            Markup::from_bps(100),
            TokenAmount::new(1_000 * UNIT),
            vec![PaymentChannel::new("M-PESA")],
            1,
            0,
        );
        MatchedOrder::new(order, reputation, TokenAmount::new(take))
    }

    #[test]
    fn test_sort_order_tie_breaks() {
        let a = rep("4.5", 10, "0.1", 300);
        let b = rep("4.5", 20, "0.1", 300);
        assert_eq!(compare_by_keys(&SELLER_SORT_ORDER, &b, &a), Ordering::Less);

        let c = rep("4.5", 20, "0.05", 300);
        assert_eq!(compare_by_keys(&SELLER_SORT_ORDER, &c, &b), Ordering::Less);

        let d = rep("4.5", 20, "0.05", 120);
        assert_eq!(compare_by_keys(&SELLER_SORT_ORDER, &d, &c), Ordering::Less);
        assert_eq!(compare_by_keys(&SELLER_SORT_ORDER, &d, &d), Ordering::Equal);
    }

    #[test]
    fn test_single_sellers_ranked_and_capped() {
        let ranker = SellerRanker::new(RankingConfig::default());
        let candidates = vec![
            matched(1, "0xlow", rep("3.9", 50, "0", 60), 60 * UNIT),
            matched(2, "0xtop", rep("4.9", 5, "0", 60), 60 * UNIT),
            matched(3, "0xmid", rep("4.5", 80, "0", 60), 60 * UNIT),
            matched(4, "0xmid2", rep("4.5", 30, "0", 60), 60 * UNIT),
        ];
        let suggestions = ranker.rank(&usdc(), TokenAmount::new(60 * UNIT), &candidates).unwrap();
        let sellers: Vec<String> = suggestions.iter().map(|s| s.seller.to_string()).collect();
        assert_eq!(sellers, vec!["0xtop", "0xmid", "0xmid2"]);
    }

    #[test]
    fn test_shortfall_within_tolerance_still_single() {
        let ranker = SellerRanker::new(RankingConfig::default());
        let candidates = vec![matched(1, "0xa", rep("4", 1, "0", 60), 60 * UNIT - 1)];
        let suggestions = ranker.rank(&usdc(), TokenAmount::new(60 * UNIT), &candidates).unwrap();
        assert_eq!(suggestions.len(), 1);
        assert!(!suggestions[0].seller.is_bundle());
    }

    #[test]
    fn test_oversized_seller_is_not_single() {
        let ranker = SellerRanker::new(RankingConfig::default());
        let candidates = vec![matched(1, "0xa", rep("4", 1, "0", 60), 100 * UNIT)];
        let suggestions = ranker.rank(&usdc(), TokenAmount::new(60 * UNIT), &candidates).unwrap();
        assert_eq!(suggestions.len(), 1);
        assert!(suggestions[0].seller.is_bundle());

        let candidates = vec![matched(1, "0xa", rep("4", 1, "0", 60), 60 * UNIT + 1)];
        let suggestions = ranker.rank(&usdc(), TokenAmount::new(60 * UNIT), &candidates).unwrap();
        assert!(!suggestions[0].seller.is_bundle());
    }

    #[test]
    fn test_bundle_when_no_single_seller_suffices() {
        let ranker = SellerRanker::new(RankingConfig::default());
        let candidates = vec![
            matched(2, "0xb", rep("4", 30, "0.1", 100), 40 * UNIT),
            matched(1, "0xa", rep("5", 10, "0.3", 300), 20 * UNIT),
        ];
        let suggestions = ranker.rank(&usdc(), TokenAmount::new(60 * UNIT), &candidates).unwrap();
        assert_eq!(suggestions.len(), 1);

        let bundle = &suggestions[0];
        assert_eq!(bundle.seller.to_string(), "BUNDLED_SELLERS");
        assert_eq!(bundle.total_amount, TokenAmount::new(60 * UNIT));
        assert_eq!(bundle.matched.len(), 2);
        assert_eq!(bundle.reputation.trade_count, 40);
        // (4 * 30 + 5 * 10) / 40
        assert_eq!(bundle.reputation.average_rating, dec("4.25"));
        assert_eq!(bundle.reputation.cancellation_rate, dec("0.15"));
        assert_eq!(bundle.reputation.average_release_time_secs, Decimal::from(150));
        assert_eq!(bundle.estimated_fiat_cost, None);
    }

    #[test]
    fn test_bundle_without_trades_uses_simple_mean() {
        let a = rep("4", 0, "0", 100);
        let b = rep("5", 0, "0", 200);
        let merged = weighted_reputation(&[&a, &b]);
        assert_eq!(merged.average_rating, dec("4.5"));
        assert_eq!(merged.average_release_time_secs, Decimal::from(150));
        assert_eq!(merged.trade_count, 0);
    }

    #[test]
    fn test_orders_grouped_per_seller() {
        let ranker = SellerRanker::new(RankingConfig::default());
        let reputation = rep("4", 3, "0", 60);
        let candidates = vec![
            matched(1, "0xa", reputation.clone(), 40 * UNIT),
            matched(2, "0xa", reputation, 20 * UNIT),
        ];
        let suggestions = ranker.rank(&usdc(), TokenAmount::new(60 * UNIT), &candidates).unwrap();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].seller.to_string(), "0xa");
        assert_eq!(suggestions[0].matched.len(), 2);
    }

    #[test]
    fn test_priced_suggestion_has_fiat_estimate() {
        let ranker = SellerRanker::new(RankingConfig::default());
        let mut m = matched(1, "0xa", rep("4", 3, "0", 60), 10 * UNIT);
        m.locked_price = Some(dec("130.50"));
        let suggestions = ranker.rank(&usdc(), TokenAmount::new(10 * UNIT), &[m]).unwrap();
        assert_eq!(suggestions[0].estimated_fiat_cost, Some(dec("1305.000000")));
    }
}
