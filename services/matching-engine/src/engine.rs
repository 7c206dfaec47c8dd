//! Matching engine core
//!
//! Turns a buy request into a trade plan over the open orders in the store.
//! Read-only: nothing here writes to the store or the chain.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use order_store::{OrderFilter, OrderStore};
use rust_decimal::Decimal;
use tracing::{debug, info};
use types::ids::WalletAddress;
use types::numeric::TokenAmount;
use types::order::Order;
use types::plan::{MatchedOrder, TradePlan};
use types::reputation::SellerReputation;
use types::request::BuyRequest;
use types::trade::cancellation_rate;

use crate::config::MatchingConfig;
use crate::errors::MatchError;
use crate::scoring::ScoredOrder;

/// Selects the orders that fill a buy request
pub struct MatchingEngine {
    store: Arc<dyn OrderStore>,
    config: MatchingConfig,
}

impl MatchingEngine {
    pub fn new(store: Arc<dyn OrderStore>, config: MatchingConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    /// Build a trade plan for the request
    ///
    /// Prefers a single order that covers the whole amount; otherwise packs
    /// the largest orders first. Returns `InsufficientLiquidity` rather than a
    /// partial plan when the eligible orders cannot cover the request.
    pub async fn find_best_match(&self, request: &BuyRequest) -> Result<TradePlan, MatchError> {
        request.validate(self.config.min_amount)?;

        let chain_id = request.chain_id.or(self.config.chain_id);
        let filter = OrderFilter::open()
            .token(request.token.symbol.clone())
            .fiat(request.fiat_currency.clone())
            .channel(request.payment_channel.clone())
            .chain(chain_id);
        let orders = self.store.query_orders(&filter).await?;

        let mut seen = HashSet::new();
        let sellers: Vec<WalletAddress> = orders
            .iter()
            .filter(|order| seen.insert(order.seller.clone()))
            .map(|order| order.seller.clone())
            .collect();
        let reputations = if sellers.is_empty() {
            HashMap::new()
        } else {
            self.store.seller_reputations(&sellers).await?
        };

        let candidates = self.eligible(request, orders, &reputations);
        if candidates.is_empty() {
            debug!(buyer = %request.buyer, token = %request.token, "No eligible orders");
            return Err(MatchError::NoCandidates);
        }

        let matched = allocate(candidates, request.amount)?;
        let plan = TradePlan::new(
            request.buyer.clone(),
            request.token.clone(),
            request.fiat_currency.clone(),
            request.amount,
            matched,
        );

        info!(
            plan_id = %plan.plan_id,
            buyer = %plan.buyer,
            requested = %plan.requested,
            orders = plan.matched.len(),
            "Trade plan produced"
        );
        Ok(plan)
    }

    /// A buyer's cancellation rate over their trade history
    pub async fn buyer_cancellation_rate(&self, buyer: &WalletAddress) -> Result<Decimal, MatchError> {
        let trades = self.store.trades_for_buyer(buyer).await?;
        Ok(cancellation_rate(&trades))
    }

    fn eligible(
        &self,
        request: &BuyRequest,
        orders: Vec<Order>,
        reputations: &HashMap<WalletAddress, SellerReputation>,
    ) -> Vec<ScoredOrder> {
        orders
            .into_iter()
            .filter(|order| {
                let reason = if order.remaining_amount.is_zero() {
                    Some("nothing remaining")
                } else if order.seller == request.buyer {
                    Some("self-trade")
                } else if !order.admits_buyer(request.buyer_cancellation_rate) {
                    Some("buyer cancellation rate above limit")
                } else if request.max_markup.is_some_and(|ceiling| order.markup > ceiling) {
                    Some("markup above ceiling")
                } else {
                    None
                };
                if let Some(reason) = reason {
                    debug!(order_id = %order.order_id, reason, "Order filtered");
                }
                reason.is_none()
            })
            .map(|order| {
                let reputation = reputations.get(&order.seller).cloned().unwrap_or_default();
                ScoredOrder::new(order, reputation, self.config.reputation_weight)
            })
            .collect()
    }
}

/// Allocate `requested` across scored candidates
///
/// Pure function over the candidate set; all arithmetic is in base units.
pub fn allocate(
    mut candidates: Vec<ScoredOrder>,
    requested: TokenAmount,
) -> Result<Vec<MatchedOrder>, MatchError> {
    let full_fill = candidates
        .iter()
        .filter(|c| c.order.remaining_amount >= requested)
        .min_by(|a, b| a.cmp_preference(b))
        .cloned();
    if let Some(best) = full_fill {
        debug!(order_id = %best.order.order_id, score = %best.score, "Full fill");
        return Ok(vec![MatchedOrder::new(best.order, best.reputation, requested)]);
    }

    candidates.sort_by(|a, b| a.cmp_packing(b));
    let available = candidates
        .iter()
        .fold(TokenAmount::ZERO, |acc, c| acc.saturating_add(c.order.remaining_amount));
    if available < requested {
        return Err(MatchError::InsufficientLiquidity { requested, available });
    }

    let mut needed = requested;
    let mut matched = Vec::new();
    for candidate in candidates {
        if needed.is_zero() {
            break;
        }
        let take = candidate.order.remaining_amount.min(needed);
        needed = needed.saturating_sub(take);
        debug!(order_id = %candidate.order.order_id, take = %take, "Packed");
        matched.push(MatchedOrder::new(candidate.order, candidate.reputation, take));
    }
    Ok(matched)
}
