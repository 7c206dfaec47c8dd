//! Settlement Service
//!
//! Executes a confirmed trade plan: one batched escrow lock on-chain, then
//! one atomic trade record per confirmed lock off-chain.
//!
//! **Key Invariants:**
//! - No chain interaction unless every matched order still holds its allocation
//! - A trade is recorded only for a lock event decoded from a successful receipt
//! - An order's mirrored remaining amount never goes negative

pub mod config;
pub mod coordinator;
pub mod errors;
pub mod report;

pub use config::SettlementConfig;
pub use coordinator::SettlementCoordinator;
pub use errors::{SettlementError, StaleOrder, StaleReason};
pub use report::{FailedCommit, SettlementReport};
