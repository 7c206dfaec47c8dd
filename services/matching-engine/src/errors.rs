//! Matching and pricing errors

use order_store::StoreError;
use rust_decimal::Decimal;
use thiserror::Error;
use types::errors::{AmountError, RequestError};
use types::ids::FiatCurrency;
use types::numeric::TokenAmount;

/// Order selection errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchError {
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] RequestError),

    #[error("No eligible orders for this request")]
    NoCandidates,

    #[error("Insufficient liquidity: requested {requested}, available {available}")]
    InsufficientLiquidity {
        requested: TokenAmount,
        available: TokenAmount,
    },

    #[error("Order store error: {0}")]
    Store(#[from] StoreError),
}

/// Seller ranking errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RankingError {
    #[error("Amount error: {0}")]
    Amount(#[from] AmountError),
}

/// Confirmation-time pricing errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PricingError {
    #[error("No rate for {symbol}/{fiat}")]
    RateUnavailable { symbol: String, fiat: FiatCurrency },

    #[error("Invalid oracle rate for {symbol}/{fiat}: {rate}")]
    InvalidRate {
        symbol: String,
        fiat: FiatCurrency,
        rate: Decimal,
    },

    #[error("Price oracle unavailable: {0}")]
    Unavailable(String),

    #[error("Price overflow")]
    Overflow,

    #[error("Amount error: {0}")]
    Amount(#[from] AmountError),
}
