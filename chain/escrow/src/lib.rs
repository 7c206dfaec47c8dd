//! Escrow ledger boundary
//!
//! The exchange core talks to the on-chain escrow through the
//! `EscrowLedger` trait:
//! - `lock_multiple_orders` submits one all-or-nothing batched lock
//! - `wait_for_receipt` returns the mined receipt
//! - `get_order` reads an order's authoritative remaining amount
//!
//! `decode_lock_events` turns a receipt's logs into typed `OrderLocked`
//! events. `SimulatedEscrow` is an in-process ledger for tests and local
//! runs.

pub mod errors;
pub mod events;
pub mod ledger;
pub mod simulated;

pub use errors::{EventDecodeError, LedgerError};
pub use events::{decode_lock_events, OrderLocked, ORDER_LOCKED_EVENT};
pub use ledger::{EscrowLedger, LogEntry, OnChainOrder, ReceiptStatus, TransactionReceipt};
pub use simulated::{SimulatedEscrow, SimulatedEscrowConfig};
