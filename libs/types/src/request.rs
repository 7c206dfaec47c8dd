//! Buy requests
//!
//! A request is built per match attempt and never persisted.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::RequestError;
use crate::ids::{FiatCurrency, PaymentChannel, WalletAddress};
use crate::numeric::{Markup, Token, TokenAmount};

/// A buyer's request for liquidity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuyRequest {
    pub token: Token,
    pub amount: TokenAmount,
    pub fiat_currency: FiatCurrency,
    pub payment_channel: PaymentChannel,
    pub max_markup: Option<Markup>,
    pub buyer: WalletAddress,
    /// Derived from the buyer's own trade history
    pub buyer_cancellation_rate: Decimal,
    /// Restricts matching to one network on permissioned deployments
    pub chain_id: Option<u64>,
}

impl BuyRequest {
    pub fn new(
        buyer: WalletAddress,
        token: Token,
        amount: TokenAmount,
        fiat_currency: FiatCurrency,
        payment_channel: PaymentChannel,
    ) -> Self {
        Self {
            token,
            amount,
            fiat_currency,
            payment_channel,
            max_markup: None,
            buyer,
            buyer_cancellation_rate: Decimal::ZERO,
            chain_id: None,
        }
    }

    pub fn with_max_markup(mut self, max_markup: Markup) -> Self {
        self.max_markup = Some(max_markup);
        self
    }

    pub fn with_cancellation_rate(mut self, rate: Decimal) -> Self {
        self.buyer_cancellation_rate = rate;
        self
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    /// Reject user-input errors before any network call
    ///
    /// `minimum` is the platform minimum in display units of the token.
    pub fn validate(&self, minimum: Decimal) -> Result<(), RequestError> {
        if self.payment_channel.is_empty() {
            return Err(RequestError::NoPaymentMethod);
        }
        if self.amount.is_zero() {
            return Err(RequestError::ZeroAmount);
        }

        let minimum_units = self.token.base_units(minimum)?;
        if self.amount < minimum_units {
            return Err(RequestError::BelowMinimum {
                requested: self.token.display(self.amount)?.to_string(),
                minimum: minimum.to_string(),
            });
        }
        Ok(())
    }
}
