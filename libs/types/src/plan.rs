//! Matching output: matched orders and trade plans
//!
//! A plan is ephemeral until the buyer confirms it and the on-chain lock
//! succeeds. Allocation fields are integer base units; fiat fields are
//! estimates for display and are only fixed once a price is locked.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ids::{FiatCurrency, OrderId, PlanId, WalletAddress};
use crate::numeric::{Token, TokenAmount};
use crate::order::Order;
use crate::reputation::SellerReputation;

/// Liquidity taken from one order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedOrder {
    /// Order snapshot at match time
    pub order: Order,
    pub seller_reputation: SellerReputation,
    pub amount_to_take: TokenAmount,
    /// Fiat price per display unit, set when the plan is priced
    pub locked_price: Option<Decimal>,
}

impl MatchedOrder {
    pub fn new(order: Order, seller_reputation: SellerReputation, amount_to_take: TokenAmount) -> Self {
        Self {
            order,
            seller_reputation,
            amount_to_take,
            locked_price: None,
        }
    }

    pub fn order_id(&self) -> OrderId {
        self.order.order_id
    }

    pub fn seller(&self) -> &WalletAddress {
        &self.order.seller
    }

    /// Fiat cost of this allocation, once priced
    pub fn fiat_cost(&self) -> Option<Decimal> {
        let price = self.locked_price?;
        let display = self.order.token.display(self.amount_to_take).ok()?;
        display.checked_mul(price)
    }
}

/// Ordered allocation across one or more orders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradePlan {
    pub plan_id: PlanId,
    pub buyer: WalletAddress,
    pub token: Token,
    pub fiat_currency: FiatCurrency,
    pub requested: TokenAmount,
    pub matched: Vec<MatchedOrder>,
}

impl TradePlan {
    pub fn new(
        buyer: WalletAddress,
        token: Token,
        fiat_currency: FiatCurrency,
        requested: TokenAmount,
        matched: Vec<MatchedOrder>,
    ) -> Self {
        Self {
            plan_id: PlanId::new(),
            buyer,
            token,
            fiat_currency,
            requested,
            matched,
        }
    }

    /// Sum of allocated amounts (`None` on overflow)
    pub fn total_allocated(&self) -> Option<TokenAmount> {
        TokenAmount::checked_sum(self.matched.iter().map(|m| m.amount_to_take))
    }

    pub fn is_single_order(&self) -> bool {
        self.matched.len() == 1
    }

    pub fn is_fully_priced(&self) -> bool {
        !self.matched.is_empty() && self.matched.iter().all(|m| m.locked_price.is_some())
    }

    pub fn order_ids(&self) -> Vec<OrderId> {
        self.matched.iter().map(MatchedOrder::order_id).collect()
    }

    /// Total fiat cost; `None` until every matched order is priced
    pub fn aggregate_fiat_cost(&self) -> Option<Decimal> {
        if !self.is_fully_priced() {
            return None;
        }
        self.matched
            .iter()
            .try_fold(Decimal::ZERO, |acc, m| acc.checked_add(m.fiat_cost()?))
    }

    /// Fiat cost per display unit across the whole plan
    pub fn average_price(&self) -> Option<Decimal> {
        let cost = self.aggregate_fiat_cost()?;
        let allocated = self.token.display(self.total_allocated()?).ok()?;
        if allocated.is_zero() {
            return None;
        }
        cost.checked_div(allocated)
    }
}
