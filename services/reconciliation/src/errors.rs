//! Reconciliation errors
//!
//! Both variants abort one scan cycle; the monitor keeps running.

use order_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReconciliationError {
    #[error("Escrow ledger unreachable: {0}")]
    LedgerUnreachable(String),

    #[error("Order store error: {0}")]
    Store(#[from] StoreError),
}
