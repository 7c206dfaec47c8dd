//! Order store interface
//!
//! The store is a document database holding open orders, trades, seller
//! reputations, mismatch alerts and scan metrics. It offers equality-filter
//! queries, one atomic read-modify-write transaction (`commit_lock`) and
//! batched writes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use types::ids::{FiatCurrency, LockId, OrderId, PaymentChannel, WalletAddress};
use types::order::{Order, OrderStatus};
use types::reconciliation::{MismatchAlert, SyncMetrics};
use types::reputation::SellerReputation;
use types::trade::Trade;

use crate::errors::StoreError;

/// Equality filter over orders; unset fields match anything
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFilter {
    /// Empty means any status
    pub statuses: Vec<OrderStatus>,
    pub token_symbol: Option<String>,
    pub fiat_currency: Option<FiatCurrency>,
    /// Matches orders whose accepted channels contain this one
    pub payment_channel: Option<PaymentChannel>,
    pub chain_id: Option<u64>,
}

impl OrderFilter {
    /// Orders available for matching
    pub fn open() -> Self {
        Self {
            statuses: vec![OrderStatus::Open],
            ..Self::default()
        }
    }

    /// Orders the store does not consider finished
    pub fn non_terminal() -> Self {
        Self {
            statuses: OrderStatus::non_terminal(),
            ..Self::default()
        }
    }

    pub fn token(mut self, symbol: impl Into<String>) -> Self {
        self.token_symbol = Some(symbol.into());
        self
    }

    pub fn fiat(mut self, currency: FiatCurrency) -> Self {
        self.fiat_currency = Some(currency);
        self
    }

    pub fn channel(mut self, channel: PaymentChannel) -> Self {
        self.payment_channel = Some(channel);
        self
    }

    pub fn chain(mut self, chain_id: Option<u64>) -> Self {
        self.chain_id = chain_id;
        self
    }

    /// Evaluate the filter against one order
    pub fn matches(&self, order: &Order) -> bool {
        (self.statuses.is_empty() || self.statuses.contains(&order.status))
            && self
                .token_symbol
                .as_ref()
                .map_or(true, |symbol| &order.token.symbol == symbol)
            && self
                .fiat_currency
                .as_ref()
                .map_or(true, |fiat| &order.fiat_currency == fiat)
            && self
                .payment_channel
                .as_ref()
                .map_or(true, |channel| order.accepts_channel(channel))
            && self.chain_id.map_or(true, |chain| order.chain_id == chain)
    }
}

/// One write in a batch
///
/// Order documents are never part of a batch; they change only through
/// `commit_lock`, which checks their version.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchWrite {
    /// Insert or merge the alert keyed by its order id
    UpsertAlert(MismatchAlert),
    /// Append scan metrics
    RecordMetrics(SyncMetrics),
}

/// Order store collaborator
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Orders matching an equality filter, ordered by order id
    async fn query_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, StoreError>;

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, StoreError>;

    /// Reputation per seller; sellers without a profile are omitted
    async fn seller_reputations(
        &self,
        sellers: &[WalletAddress],
    ) -> Result<HashMap<WalletAddress, SellerReputation>, StoreError>;

    async fn trades_for_buyer(&self, buyer: &WalletAddress) -> Result<Vec<Trade>, StoreError>;

    async fn get_trade(&self, lock_id: LockId) -> Result<Option<Trade>, StoreError>;

    /// Atomically record a confirmed lock
    ///
    /// Creates the trade keyed by its lock id and decrements the originating
    /// order by the trade amount, closing it at zero. The decrement is
    /// conditional on the order still being open with enough remaining;
    /// otherwise nothing is written. Returns the updated order.
    async fn commit_lock(&self, trade: Trade) -> Result<Order, StoreError>;

    /// Apply several writes together
    async fn write_batch(&self, writes: Vec<BatchWrite>) -> Result<(), StoreError>;

    async fn get_alert(&self, order_id: OrderId) -> Result<Option<MismatchAlert>, StoreError>;

    /// Mark an alert resolved (administrative action)
    async fn resolve_alert(&self, order_id: OrderId) -> Result<MismatchAlert, StoreError>;

    async fn latest_metrics(&self) -> Result<Option<SyncMetrics>, StoreError>;
}
