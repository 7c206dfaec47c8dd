//! Confirmation-time pricing
//!
//! Suggestions carry estimates only. When the buyer confirms, the oracle is
//! queried again and every matched order gets its `locked_price`:
//! `rate * (1 + markup% / 100)`, rounded half-up to fiat cents.

use async_trait::async_trait;
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;
use types::ids::FiatCurrency;
use types::numeric::Markup;
use types::plan::{MatchedOrder, TradePlan};
use types::suggestion::SellerSuggestion;

use crate::errors::PricingError;

/// Fiat decimal places of a locked price
pub const PRICE_DECIMALS: u32 = 2;

/// Source of token/fiat exchange rates
#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Fiat price of one display unit of `symbol`
    async fn get_price(&self, symbol: &str, fiat: &FiatCurrency) -> Result<Decimal, PricingError>;
}

/// Oracle serving rates set by hand
#[derive(Debug, Default)]
pub struct FixedPriceOracle {
    rates: RwLock<HashMap<(String, FiatCurrency), Decimal>>,
}

impl FixedPriceOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate(self, symbol: &str, fiat: FiatCurrency, rate: Decimal) -> Result<Self, PricingError> {
        self.set_rate(symbol, fiat, rate)?;
        Ok(self)
    }

    pub fn set_rate(&self, symbol: &str, fiat: FiatCurrency, rate: Decimal) -> Result<(), PricingError> {
        self.rates
            .write()
            .map_err(|_| PricingError::Unavailable("rate table poisoned".to_string()))?
            .insert((symbol.to_uppercase(), fiat), rate);
        Ok(())
    }
}

#[async_trait]
impl PriceOracle for FixedPriceOracle {
    async fn get_price(&self, symbol: &str, fiat: &FiatCurrency) -> Result<Decimal, PricingError> {
        let rates = self
            .rates
            .read()
            .map_err(|_| PricingError::Unavailable("rate table poisoned".to_string()))?;
        rates
            .get(&(symbol.to_uppercase(), fiat.clone()))
            .copied()
            .ok_or_else(|| PricingError::RateUnavailable {
                symbol: symbol.to_string(),
                fiat: fiat.clone(),
            })
    }
}

/// Locked price for an order at the given oracle rate
pub fn locked_price(rate: Decimal, markup: Markup) -> Result<Decimal, PricingError> {
    rate.checked_mul(markup.price_factor())
        .map(|price| price.round_dp_with_strategy(PRICE_DECIMALS, RoundingStrategy::MidpointAwayFromZero))
        .ok_or(PricingError::Overflow)
}

async fn fetch_rate(
    oracle: &dyn PriceOracle,
    symbol: &str,
    fiat: &FiatCurrency,
) -> Result<Decimal, PricingError> {
    let rate = oracle.get_price(symbol, fiat).await?;
    if rate <= Decimal::ZERO {
        return Err(PricingError::InvalidRate {
            symbol: symbol.to_string(),
            fiat: fiat.clone(),
            rate,
        });
    }
    Ok(rate)
}

fn price_matched(matched: &mut [MatchedOrder], rate: Decimal) -> Result<(), PricingError> {
    for m in matched.iter_mut() {
        let price = locked_price(rate, m.order.markup)?;
        debug!(order_id = %m.order.order_id, rate = %rate, price = %price, "Order priced");
        m.locked_price = Some(price);
    }
    Ok(())
}

/// Price every matched order of a plan at the current rate
pub async fn price_plan(oracle: &dyn PriceOracle, plan: &mut TradePlan) -> Result<(), PricingError> {
    let rate = fetch_rate(oracle, &plan.token.symbol, &plan.fiat_currency).await?;
    price_matched(&mut plan.matched, rate)
}

/// Price a suggestion at the current rate and refresh its fiat estimate
pub async fn price_suggestion(
    oracle: &dyn PriceOracle,
    suggestion: &mut SellerSuggestion,
) -> Result<(), PricingError> {
    let Some(first) = suggestion.matched.first() else {
        return Ok(());
    };
    let symbol = first.order.token.symbol.clone();
    let fiat = first.order.fiat_currency.clone();

    let rate = fetch_rate(oracle, &symbol, &fiat).await?;
    price_matched(&mut suggestion.matched, rate)?;
    suggestion.estimated_fiat_cost = suggestion
        .matched
        .iter()
        .try_fold(Decimal::ZERO, |acc, m| acc.checked_add(m.fiat_cost()?));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_locked_price_applies_markup() {
        // 129.40 * 1.015 = 131.341
        assert_eq!(locked_price(dec("129.40"), Markup::from_bps(150)).unwrap(), dec("131.34"));
    }

    #[test]
    fn test_locked_price_rounds_half_up() {
        // 100.005 rounds away from zero
        assert_eq!(locked_price(dec("100.005"), Markup::from_bps(0)).unwrap(), dec("100.01"));
    }

    #[test]
    fn test_negative_markup_discounts() {
        assert_eq!(locked_price(dec("200"), Markup::from_bps(-250)).unwrap(), dec("195.00"));
    }

    #[tokio::test]
    async fn test_fixed_oracle_lookup() {
        let oracle = FixedPriceOracle::new()
            .with_rate("usdc", FiatCurrency::new("KES"), dec("129.4"))
            .unwrap();
        assert_eq!(
            oracle.get_price("USDC", &FiatCurrency::new("KES")).await.unwrap(),
            dec("129.4")
        );
        assert!(matches!(
            oracle.get_price("USDC", &FiatCurrency::new("NGN")).await,
            Err(PricingError::RateUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_non_positive_rate_rejected() {
        let oracle = FixedPriceOracle::new()
            .with_rate("USDC", FiatCurrency::new("KES"), Decimal::ZERO)
            .unwrap();
        let err = fetch_rate(&oracle, "USDC", &FiatCurrency::new("KES")).await.unwrap_err();
        assert!(matches!(err, PricingError::InvalidRate { .. }));
    }
}
