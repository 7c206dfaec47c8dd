//! Settlement errors
//!
//! Everything here stops a settlement as a whole. Individual commit
//! failures after a confirmed lock are reported in `SettlementReport`.

use escrow::{EventDecodeError, LedgerError};
use order_store::StoreError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use types::ids::{OrderId, TxHash};
use types::numeric::TokenAmount;

/// Why an order can no longer take its allocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum StaleReason {
    Missing,
    NotOpen { status: String },
    Insufficient { required: TokenAmount, available: TokenAmount },
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaleReason::Missing => f.write_str("missing"),
            StaleReason::NotOpen { status } => write!(f, "status {}", status),
            StaleReason::Insufficient { required, available } => {
                write!(f, "requires {}, {} remaining", required, available)
            }
        }
    }
}

/// An order that failed pre-validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaleOrder {
    pub order_id: OrderId,
    pub reason: StaleReason,
}

fn describe(stale: &[StaleOrder]) -> String {
    stale
        .iter()
        .map(|s| format!("{} ({})", s.order_id, s.reason))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SettlementError {
    #[error("Trade plan has no matched orders")]
    EmptyPlan,

    #[error("Order {order_id} has no locked price")]
    Unpriced { order_id: OrderId },

    #[error("Orders changed since matching: {}", describe(.0))]
    StaleOrders(Vec<StaleOrder>),

    #[error("Order store error: {0}")]
    Store(#[from] StoreError),

    #[error("Chain error: {0}")]
    Chain(#[from] LedgerError),

    #[error("Lock transaction {tx_hash} reverted")]
    Reverted { tx_hash: TxHash },

    #[error("No receipt for lock transaction {tx_hash} within the confirmation timeout")]
    ConfirmationTimeout { tx_hash: TxHash },

    #[error("Lock transaction {tx_hash} confirmed but its events cannot be mirrored: {source}")]
    Integration {
        tx_hash: TxHash,
        source: EventDecodeError,
    },
}

impl SettlementError {
    /// Whether funds may be locked on-chain without an off-chain record
    pub fn needs_operator(&self) -> bool {
        matches!(
            self,
            SettlementError::Integration { .. } | SettlementError::ConfirmationTimeout { .. }
        )
    }
}
