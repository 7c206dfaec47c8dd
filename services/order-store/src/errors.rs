//! Order store errors

use thiserror::Error;
use types::errors::OrderError;
use types::ids::{LockId, OrderId};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Order not found: {order_id}")]
    OrderNotFound { order_id: OrderId },

    #[error("Alert not found for order {order_id}")]
    AlertNotFound { order_id: OrderId },

    #[error("Trade already recorded for lock {lock_id}")]
    TradeAlreadyExists { lock_id: LockId },

    #[error("Lock {lock_id} has the seller as buyer")]
    SelfTrade { lock_id: LockId },

    #[error("Order rejected the lock: {0}")]
    Order(#[from] OrderError),

    #[error("Version conflict on order {order_id}: expected {expected}, found {found}")]
    VersionConflict {
        order_id: OrderId,
        expected: u64,
        found: u64,
    },

    #[error("Transaction aborted after {attempts} attempts on order {order_id}")]
    TransactionAborted { order_id: OrderId, attempts: u32 },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Whether retrying the same operation could succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::VersionConflict { .. }
                | StoreError::TransactionAborted { .. }
                | StoreError::Unavailable(_)
        )
    }
}
