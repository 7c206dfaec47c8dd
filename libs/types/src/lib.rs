//! Types library for the P2P matching and settlement core
//!
//! This library provides the data model shared by the matching engine, the
//! settlement coordinator and the reconciliation monitor.
//!
//! # Modules
//! - `ids`: Identifiers (OrderId, LockId, PlanId, WalletAddress, TxHash, ...)
//! - `numeric`: Base-unit token amounts, markups, token metadata
//! - `order`: Sell orders and their status
//! - `request`: Buy requests and input validation
//! - `plan`: Matched orders and trade plans
//! - `suggestion`: Seller suggestions produced by ranking
//! - `reputation`: Seller reputation summaries
//! - `trade`: Settlement records
//! - `reconciliation`: Sync metrics and mismatch alerts
//! - `clock`: Injectable time source
//! - `errors`: Error taxonomy

// Public modules
pub mod ids;
pub mod numeric;
pub mod order;
pub mod request;
pub mod plan;
pub mod suggestion;
pub mod reputation;
pub mod trade;
pub mod reconciliation;
pub mod clock;
pub mod errors;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::ids::*;
    pub use crate::numeric::*;
    pub use crate::order::*;
    pub use crate::request::*;
    pub use crate::plan::*;
    pub use crate::suggestion::*;
    pub use crate::reputation::*;
    pub use crate::trade::*;
    pub use crate::reconciliation::*;
    pub use crate::clock::*;
    pub use crate::errors::*;
}
