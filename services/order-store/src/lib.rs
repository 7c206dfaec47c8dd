//! Order Store
//!
//! Interface to the document database that mirrors escrow orders off-chain,
//! plus an in-memory implementation for local runs and tests.
//!
//! **Key Invariants:**
//! - One trade per lock id
//! - An order's remaining amount never goes negative
//! - A lock commit writes the trade and the decrement together or not at all

pub mod errors;
pub mod memory;
pub mod store;

pub use errors::StoreError;
pub use memory::{InMemoryOrderStore, StoreConfig};
pub use store::{BatchWrite, OrderFilter, OrderStore};
