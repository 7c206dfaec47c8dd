//! Order scoring
//!
//! `score = markup% - average_rating * log10(rating_count + 1) * weight`
//!
//! Lower is better: a cheap order from a well-reviewed seller wins. The
//! log dampens the advantage of very high review counts.

use rust_decimal::{Decimal, MathematicalOps};
use std::cmp::Ordering;
use types::order::Order;
use types::reputation::SellerReputation;

/// Score an order given its seller's reputation
pub fn score(order: &Order, reputation: &SellerReputation, reputation_weight: Decimal) -> Decimal {
    let volume = Decimal::from(reputation.rating_count) + Decimal::ONE;
    let dampened = volume.checked_log10().unwrap_or(Decimal::ZERO);
    order.markup.percent() - reputation.average_rating * dampened * reputation_weight
}

/// An eligible order with its seller's reputation and score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredOrder {
    pub order: Order,
    pub reputation: SellerReputation,
    pub score: Decimal,
}

impl ScoredOrder {
    pub fn new(order: Order, reputation: SellerReputation, reputation_weight: Decimal) -> Self {
        let score = score(&order, &reputation, reputation_weight);
        Self {
            order,
            reputation,
            score,
        }
    }

    /// Full-fill preference: lowest score, then older order, then lower id
    pub fn cmp_preference(&self, other: &Self) -> Ordering {
        self.score
            .cmp(&other.score)
            .then_with(|| self.order.created_at.cmp(&other.order.created_at))
            .then_with(|| self.order.order_id.cmp(&other.order.order_id))
    }

    /// Bin-packing order: largest remaining first, then score, then id
    pub fn cmp_packing(&self, other: &Self) -> Ordering {
        other
            .order
            .remaining_amount
            .cmp(&self.order.remaining_amount)
            .then_with(|| self.score.cmp(&other.score))
            .then_with(|| self.order.order_id.cmp(&other.order.order_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use types::ids::{FiatCurrency, OrderId, PaymentChannel, WalletAddress};
    use types::numeric::{Markup, Token, TokenAmount};

    fn order(id: u64, markup_bps: i32, remaining: u128, created_at: i64) -> Order {
        Order::new(
            OrderId::new(id),
            WalletAddress::new("0xseller"),
            Token::new("USDC", 6),
            FiatCurrency::new("KES"),
            Markup::from_bps(markup_bps),
            TokenAmount::new(remaining),
            vec![PaymentChannel::new("M-PESA")],
            1,
            created_at,
        )
    }

    fn weight() -> Decimal {
        Decimal::from_str("0.5").unwrap()
    }

    #[test]
    fn test_unrated_seller_scores_markup() {
        let s = score(&order(1, 200, 100, 0), &SellerReputation::unrated(), weight());
        assert_eq!(s, Decimal::from(2));
    }

    #[test]
    fn test_reputation_lowers_score() {
        // 3% markup, rating 4 over 9 reviews: 3 - 4 * log10(10) * 0.5 = 1
        let reputation = SellerReputation::new(Decimal::from(4), 9, 9, Decimal::ZERO, Decimal::ZERO);
        let s = score(&order(1, 300, 100, 0), &reputation, weight());
        let expected = Decimal::ONE;
        assert!((s - expected).abs() < Decimal::from_str("0.000000001").unwrap());
    }

    #[test]
    fn test_more_reviews_score_better() {
        let few = SellerReputation::new(Decimal::from(5), 2, 2, Decimal::ZERO, Decimal::ZERO);
        let many = SellerReputation::new(Decimal::from(5), 200, 200, Decimal::ZERO, Decimal::ZERO);
        let o = order(1, 100, 100, 0);
        assert!(score(&o, &many, weight()) < score(&o, &few, weight()));
    }

    #[test]
    fn test_negative_markup() {
        let s = score(&order(1, -50, 100, 0), &SellerReputation::unrated(), weight());
        assert_eq!(s, Decimal::from_str("-0.5").unwrap());
    }

    #[test]
    fn test_preference_tie_breaks() {
        let unrated = SellerReputation::unrated();
        let older = ScoredOrder::new(order(9, 100, 100, 10), unrated.clone(), weight());
        let newer = ScoredOrder::new(order(1, 100, 100, 20), unrated.clone(), weight());
        assert_eq!(older.cmp_preference(&newer), Ordering::Less);

        let same_time = ScoredOrder::new(order(2, 100, 100, 10), unrated, weight());
        assert_eq!(same_time.cmp_preference(&older), Ordering::Less);
    }

    #[test]
    fn test_packing_prefers_larger_remaining() {
        let unrated = SellerReputation::unrated();
        let small_cheap = ScoredOrder::new(order(1, 0, 30, 0), unrated.clone(), weight());
        let large_dear = ScoredOrder::new(order(2, 500, 40, 0), unrated, weight());
        assert_eq!(large_dear.cmp_packing(&small_cheap), Ordering::Less);
    }
}
