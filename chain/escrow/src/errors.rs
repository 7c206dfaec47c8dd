//! Escrow-specific error types
//!
//! Ledger call failures and lock-event decoding failures are kept apart:
//! the first means the transaction may not have happened, the second means it
//! happened but cannot be mirrored off-chain.

use thiserror::Error;
use types::ids::{OrderId, TxHash, WalletAddress};

/// Ledger call errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Ledger unreachable: {0}")]
    Unreachable(String),

    #[error("Order not found on-chain: {order_id}")]
    OrderNotFound { order_id: OrderId },

    #[error("Batch length mismatch: {orders} order ids, {amounts} amounts")]
    LengthMismatch { orders: usize, amounts: usize },

    #[error("Empty batch: no orders to lock")]
    EmptyBatch,

    #[error("Receipt not found for transaction {tx_hash}")]
    ReceiptNotFound { tx_hash: TxHash },

    #[error("RPC error: {0}")]
    Rpc(String),
}

impl LedgerError {
    /// Whether the ledger as a whole could not be reached
    pub fn is_unreachable(&self) -> bool {
        matches!(self, LedgerError::Unreachable(_))
    }
}

/// Lock-event decoding errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EventDecodeError {
    #[error("Expected {expected} lock events, found {found}")]
    CountMismatch { expected: usize, found: usize },

    #[error("Malformed lock event at log index {index}: {reason}")]
    Malformed { index: usize, reason: String },

    #[error("Lock event for order {order_id} not in the submitted batch")]
    UnexpectedOrder { order_id: OrderId },

    #[error("Lock event for order {order_id} names buyer {buyer}")]
    WrongBuyer { order_id: OrderId, buyer: WalletAddress },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_error_display() {
        let err = LedgerError::LengthMismatch { orders: 2, amounts: 3 };
        assert_eq!(err.to_string(), "Batch length mismatch: 2 order ids, 3 amounts");
    }

    #[test]
    fn test_unreachable_classification() {
        assert!(LedgerError::Unreachable("timeout".into()).is_unreachable());
        assert!(!LedgerError::Rpc("execution reverted".into()).is_unreachable());
    }

    #[test]
    fn test_decode_error_display() {
        let err = EventDecodeError::CountMismatch { expected: 2, found: 1 };
        assert!(err.to_string().contains("Expected 2"));
    }
}
