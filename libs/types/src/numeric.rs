//! Token amounts, markups and token metadata
//!
//! Every allocation and liquidity decision works on `TokenAmount`, an integer
//! count of base units. `Decimal` enters only through `TokenAmount::to_display`
//! and is used for display, fiat estimation, tolerances and percentages.
//! Nothing here touches `f32`/`f64`.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::AmountError;

/// Largest decimal precision `Decimal` can represent.
const MAX_DECIMALS: u8 = 28;

/// Token amount in base units (smallest indivisible unit)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenAmount(u128);

impl TokenAmount {
    pub const ZERO: TokenAmount = TokenAmount(0);

    pub const fn new(base_units: u128) -> Self {
        Self(base_units)
    }

    pub fn base_units(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: TokenAmount) -> Option<TokenAmount> {
        self.0.checked_add(other.0).map(TokenAmount)
    }

    pub fn checked_sub(self, other: TokenAmount) -> Option<TokenAmount> {
        self.0.checked_sub(other.0).map(TokenAmount)
    }

    pub fn saturating_add(self, other: TokenAmount) -> TokenAmount {
        TokenAmount(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: TokenAmount) -> TokenAmount {
        TokenAmount(self.0.saturating_sub(other.0))
    }

    /// Absolute difference, never negative
    pub fn abs_diff(self, other: TokenAmount) -> TokenAmount {
        TokenAmount(self.0.abs_diff(other.0))
    }

    /// Sum a sequence of amounts, returning `None` on overflow
    pub fn checked_sum<I>(amounts: I) -> Option<TokenAmount>
    where
        I: IntoIterator<Item = TokenAmount>,
    {
        amounts
            .into_iter()
            .try_fold(TokenAmount::ZERO, |acc, amount| acc.checked_add(amount))
    }

    /// Convert to display units (e.g. 1_500_000 with 6 decimals -> 1.5)
    pub fn to_display(&self, decimals: u8) -> Result<Decimal, AmountError> {
        if decimals > MAX_DECIMALS {
            return Err(AmountError::UnsupportedDecimals(decimals));
        }
        let mantissa = i128::try_from(self.0).map_err(|_| AmountError::Overflow)?;
        Decimal::try_from_i128_with_scale(mantissa, u32::from(decimals))
            .map_err(|_| AmountError::Overflow)
    }

    /// Convert display units to base units, truncating sub-unit precision
    pub fn from_display(amount: Decimal, decimals: u8) -> Result<TokenAmount, AmountError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(AmountError::Negative(amount.to_string()));
        }
        let scaled = amount
            .checked_mul(unit_multiplier(decimals)?)
            .ok_or(AmountError::Overflow)?;
        scaled
            .trunc()
            .to_u128()
            .map(TokenAmount)
            .ok_or(AmountError::Overflow)
    }
}

/// 10^decimals as a Decimal
fn unit_multiplier(decimals: u8) -> Result<Decimal, AmountError> {
    if decimals > MAX_DECIMALS {
        return Err(AmountError::UnsupportedDecimals(decimals));
    }
    Decimal::try_from_i128_with_scale(10i128.pow(u32::from(decimals)), 0)
        .map_err(|_| AmountError::Overflow)
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u128> for TokenAmount {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

/// Seller markup over the oracle price, in basis points
///
/// 150 bps = 1.50%. Negative markups (selling below market) are allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Markup(i32);

impl Markup {
    pub const fn from_bps(bps: i32) -> Self {
        Self(bps)
    }

    /// Build from a percentage, rounded to basis-point precision
    pub fn from_percent(percent: Decimal) -> Result<Self, AmountError> {
        (percent * Decimal::ONE_HUNDRED)
            .round()
            .to_i32()
            .map(Self)
            .ok_or(AmountError::Overflow)
    }

    pub fn bps(&self) -> i32 {
        self.0
    }

    /// Markup as a percentage (150 bps -> 1.50)
    pub fn percent(&self) -> Decimal {
        Decimal::new(i64::from(self.0), 2)
    }

    /// Multiplier applied to the oracle rate (150 bps -> 1.015)
    pub fn price_factor(&self) -> Decimal {
        Decimal::ONE + Decimal::new(i64::from(self.0), 4)
    }
}

impl fmt::Display for Markup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percent())
    }
}

/// Token traded on the escrow (e.g. USDC with 6 decimals)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub symbol: String,
    pub decimals: u8,
}

impl Token {
    pub fn new(symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            symbol: symbol.into().to_uppercase(),
            decimals,
        }
    }

    /// Display-unit value of a base-unit amount of this token
    pub fn display(&self, amount: TokenAmount) -> Result<Decimal, AmountError> {
        amount.to_display(self.decimals)
    }

    /// Base-unit value of a display amount of this token
    pub fn base_units(&self, amount: Decimal) -> Result<TokenAmount, AmountError> {
        TokenAmount::from_display(amount, self.decimals)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}
