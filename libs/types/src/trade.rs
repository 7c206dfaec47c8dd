//! Trade settlement records
//!
//! A trade is created exactly once per on-chain lock event and is keyed by
//! the lock id. Later lifecycle stages (fiat payment, release, disputes) move
//! its status; amount, price and parties never change after creation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ids::{FiatCurrency, LockId, OrderId, TxHash, WalletAddress};
use crate::numeric::{Token, TokenAmount};

/// Trade status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeStatus {
    /// Liquidity locked on-chain, awaiting fiat payment
    Locked,
    /// Buyer marked the fiat payment as sent
    FiatPaid,
    /// Seller asked for a payment screenshot
    RequestingScreenshot,
    /// Dispute opened by either party
    Disputed,
    /// Tokens released to the buyer (terminal)
    Released,
    /// Lock canceled and liquidity returned (terminal)
    Canceled,
}

impl TradeStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TradeStatus::Released | TradeStatus::Canceled)
    }
}

/// Durable settlement record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub lock_id: LockId,
    pub order_id: OrderId,
    pub buyer: WalletAddress,
    pub seller: WalletAddress,
    pub token: Token,
    pub fiat_currency: FiatCurrency,
    pub amount: TokenAmount,
    /// Fiat price per display unit of token, fixed at lock time
    pub locked_price: Decimal,
    pub status: TradeStatus,
    pub tx_hash: TxHash,
    pub created_at: i64, // Unix millis
}

impl Trade {
    /// Create a new trade in LOCKED state
    #[allow(clippy::too_many_arguments)]
    pub fn locked(
        lock_id: LockId,
        order_id: OrderId,
        buyer: WalletAddress,
        seller: WalletAddress,
        token: Token,
        fiat_currency: FiatCurrency,
        amount: TokenAmount,
        locked_price: Decimal,
        tx_hash: TxHash,
        created_at: i64,
    ) -> Self {
        Self {
            lock_id,
            order_id,
            buyer,
            seller,
            token,
            fiat_currency,
            amount,
            locked_price,
            status: TradeStatus::Locked,
            tx_hash,
            created_at,
        }
    }

    /// Fiat value of the trade (locked price × display amount)
    pub fn fiat_value(&self) -> Option<Decimal> {
        let display = self.token.display(self.amount).ok()?;
        display.checked_mul(self.locked_price)
    }

    /// Validate no self-trade
    pub fn validate_no_self_trade(&self) -> bool {
        self.buyer != self.seller
    }
}

/// Share of a buyer's trades that ended canceled (0 with no history)
pub fn cancellation_rate(trades: &[Trade]) -> Decimal {
    if trades.is_empty() {
        return Decimal::ZERO;
    }
    let canceled = trades
        .iter()
        .filter(|t| t.status == TradeStatus::Canceled)
        .count();
    Decimal::from(canceled as u64) / Decimal::from(trades.len() as u64)
}
