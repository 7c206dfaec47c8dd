//! Sell order types
//!
//! An order is owned by its seller. This core only ever decrements its
//! remaining amount (and closes it at zero); funding and cancellation
//! happen elsewhere.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::errors::OrderError;
use crate::ids::{FiatCurrency, OrderId, PaymentChannel, WalletAddress};
use crate::numeric::{Markup, Token, TokenAmount};

/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    /// Created off-chain, not yet funded on the escrow
    Pending,
    /// Funded and available for matching
    Open,
    /// Fully consumed (terminal)
    Closed,
    /// Withdrawn by the seller (terminal)
    Canceled,
}

impl OrderStatus {
    /// Check if status is terminal (no further transitions possible)
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Closed | OrderStatus::Canceled)
    }

    /// Statuses the reconciliation monitor inspects
    pub fn non_terminal() -> Vec<OrderStatus> {
        vec![OrderStatus::Pending, OrderStatus::Open]
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Open => "OPEN",
            OrderStatus::Closed => "CLOSED",
            OrderStatus::Canceled => "CANCELED",
        };
        f.write_str(label)
    }
}

/// Sell order as mirrored in the order store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub seller: WalletAddress,
    pub token: Token,
    pub fiat_currency: FiatCurrency,
    pub markup: Markup,
    pub total_amount: TokenAmount,
    pub remaining_amount: TokenAmount,
    pub payment_channels: Vec<PaymentChannel>,
    pub payment_details: BTreeMap<PaymentChannel, String>,
    /// Buyers with a higher cancellation rate than this are not served
    pub buyer_cancellation_rate_limit: Option<Decimal>,
    pub chain_id: u64,
    pub status: OrderStatus,
    pub created_at: i64, // Unix millis
    pub version: u64,    // Optimistic locking
}

impl Order {
    /// Create a new open order with its full amount remaining
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        order_id: OrderId,
        seller: WalletAddress,
        token: Token,
        fiat_currency: FiatCurrency,
        markup: Markup,
        total_amount: TokenAmount,
        payment_channels: Vec<PaymentChannel>,
        chain_id: u64,
        created_at: i64,
    ) -> Self {
        Self {
            order_id,
            seller,
            token,
            fiat_currency,
            markup,
            total_amount,
            remaining_amount: total_amount,
            payment_channels,
            payment_details: BTreeMap::new(),
            buyer_cancellation_rate_limit: None,
            chain_id,
            status: OrderStatus::Open,
            created_at,
            version: 0,
        }
    }

    /// Check amount invariants: remaining <= total, and zero remaining means terminal
    pub fn check_invariant(&self) -> bool {
        self.remaining_amount <= self.total_amount
            && (!self.remaining_amount.is_zero() || self.status.is_terminal())
    }

    pub fn is_open(&self) -> bool {
        self.status == OrderStatus::Open
    }

    pub fn accepts_channel(&self, channel: &PaymentChannel) -> bool {
        self.payment_channels.contains(channel)
    }

    /// Whether a buyer with the given cancellation rate may trade on this order
    pub fn admits_buyer(&self, buyer_cancellation_rate: Decimal) -> bool {
        self.buyer_cancellation_rate_limit
            .map_or(true, |limit| buyer_cancellation_rate <= limit)
    }

    /// Decrement the remaining amount by a confirmed lock
    ///
    /// The order must be open and hold at least `amount`. Closes the order
    /// when nothing remains.
    pub fn apply_lock(&mut self, amount: TokenAmount) -> Result<(), OrderError> {
        if !self.is_open() {
            return Err(OrderError::NotOpen {
                order_id: self.order_id,
                status: self.status.to_string(),
            });
        }

        let remaining = self.remaining_amount.checked_sub(amount).ok_or_else(|| {
            OrderError::InsufficientRemaining {
                order_id: self.order_id,
                required: amount.to_string(),
                available: self.remaining_amount.to_string(),
            }
        })?;

        self.remaining_amount = remaining;
        if remaining.is_zero() {
            self.status = OrderStatus::Closed;
        }
        self.version += 1;
        Ok(())
    }

    pub fn with_buyer_cancellation_rate_limit(mut self, limit: Decimal) -> Self {
        self.buyer_cancellation_rate_limit = Some(limit);
        self
    }

    pub fn with_payment_detail(mut self, channel: PaymentChannel, details: impl Into<String>) -> Self {
        self.payment_details.insert(channel, details.into());
        self
    }
}
