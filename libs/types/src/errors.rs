//! Error types shared across the core
//!
//! Comprehensive error taxonomy using thiserror

use thiserror::Error;

use crate::ids::OrderId;

/// Amount conversion errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("Amount overflow")]
    Overflow,

    #[error("Negative amount: {0}")]
    Negative(String),

    #[error("Unsupported token precision: {0} decimals")]
    UnsupportedDecimals(u8),
}

/// User-input errors, rejected before any network call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("No payment method selected")]
    NoPaymentMethod,

    #[error("Amount must be greater than zero")]
    ZeroAmount,

    #[error("Amount below platform minimum: requested {requested}, minimum {minimum}")]
    BelowMinimum { requested: String, minimum: String },

    #[error("Invalid amount: {0}")]
    Amount(#[from] AmountError),
}

/// Order bookkeeping errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    #[error("Order {order_id} is {status}, not OPEN")]
    NotOpen { order_id: OrderId, status: String },

    #[error("Insufficient remaining on order {order_id}: required {required}, available {available}")]
    InsufficientRemaining {
        order_id: OrderId,
        required: String,
        available: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_error_display() {
        let err = RequestError::BelowMinimum {
            requested: "0.5".to_string(),
            minimum: "1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Amount below platform minimum: requested 0.5, minimum 1"
        );
    }

    #[test]
    fn test_request_error_from_amount_error() {
        let err: RequestError = AmountError::Overflow.into();
        assert!(matches!(err, RequestError::Amount(AmountError::Overflow)));
    }

    #[test]
    fn test_order_error_display() {
        let err = OrderError::InsufficientRemaining {
            order_id: OrderId::new(7),
            required: "60".to_string(),
            available: "50".to_string(),
        };
        assert!(err.to_string().contains("order 7"));
        assert!(err.to_string().contains("60"));
    }
}
