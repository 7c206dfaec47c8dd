//! Escrow ledger interface
//!
//! The escrow contract is an opaque external ledger. This module defines the
//! calls the core makes against it and the receipt shape it gets back.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use types::ids::{OrderId, TxHash, WalletAddress};
use types::numeric::TokenAmount;

use crate::errors::LedgerError;

/// Outcome of a mined transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptStatus {
    Success,
    Reverted,
}

/// One log emitted by a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Emitting contract
    pub address: String,
    /// Event name, e.g. "OrderLocked"
    pub event: String,
    /// Event arguments
    pub data: serde_json::Value,
}

/// Receipt of a mined transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub tx_hash: TxHash,
    pub status: ReceiptStatus,
    pub block_number: u64,
    pub logs: Vec<LogEntry>,
}

impl TransactionReceipt {
    pub fn succeeded(&self) -> bool {
        self.status == ReceiptStatus::Success
    }
}

/// Authoritative on-chain view of an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnChainOrder {
    pub order_id: OrderId,
    pub seller: WalletAddress,
    pub total_amount: TokenAmount,
    pub remaining_amount: TokenAmount,
}

/// Escrow ledger collaborator
#[async_trait]
pub trait EscrowLedger: Send + Sync {
    /// Address of the escrow contract whose logs confirm locks
    fn contract_address(&self) -> &str;

    /// Submit one batched lock transaction signed by `caller`
    ///
    /// Returns once the transaction is accepted for mining. The batch is
    /// all-or-nothing on-chain: it either locks every entry or reverts.
    async fn lock_multiple_orders(
        &self,
        caller: &WalletAddress,
        order_ids: &[OrderId],
        amounts: &[TokenAmount],
    ) -> Result<TxHash, LedgerError>;

    /// Wait until the transaction is mined and return its receipt
    async fn wait_for_receipt(&self, tx_hash: &TxHash) -> Result<TransactionReceipt, LedgerError>;

    /// Read an order's authoritative state
    async fn get_order(&self, order_id: OrderId) -> Result<OnChainOrder, LedgerError>;
}
