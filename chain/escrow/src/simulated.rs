//! In-process escrow ledger
//!
//! Mirrors the escrow contract's lock semantics closely enough to drive the
//! settlement and reconciliation services end to end:
//! - batched locks are all-or-nothing; a batch that over-draws any order is
//!   mined as a reverted receipt with no logs
//! - every successful entry emits one `OrderLocked` log with a fresh lock id
//! - receipts become available after a configurable mining delay
//!
//! Fault injection covers an unreachable node, per-order read failures,
//! dropped events and forced reverts.

use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, warn};
use types::ids::{LockId, OrderId, TxHash, WalletAddress};
use types::numeric::TokenAmount;

use crate::errors::LedgerError;
use crate::events::OrderLocked;
use crate::ledger::{EscrowLedger, OnChainOrder, ReceiptStatus, TransactionReceipt};

/// Simulated escrow configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulatedEscrowConfig {
    /// Address stamped on emitted logs
    pub contract_address: String,
    /// Mining delay before a receipt is returned
    pub receipt_delay_ms: u64,
    /// First lock id handed out
    pub first_lock_id: u64,
}

impl Default for SimulatedEscrowConfig {
    fn default() -> Self {
        Self {
            contract_address: "0xe5c40000000000000000000000000000000000e5".to_string(),
            receipt_delay_ms: 0,
            first_lock_id: 1,
        }
    }
}

#[derive(Debug, Default)]
struct Faults {
    unreachable: bool,
    failing_reads: HashSet<OrderId>,
    drop_events: usize,
    force_revert: bool,
}

#[derive(Debug)]
struct LedgerState {
    orders: BTreeMap<OrderId, OnChainOrder>,
    receipts: HashMap<TxHash, TransactionReceipt>,
    next_lock_id: u64,
    block_number: u64,
    nonce: u64,
    faults: Faults,
}

/// Escrow ledger held in memory
pub struct SimulatedEscrow {
    config: SimulatedEscrowConfig,
    state: Mutex<LedgerState>,
}

impl SimulatedEscrow {
    pub fn new(config: SimulatedEscrowConfig) -> Self {
        let state = LedgerState {
            orders: BTreeMap::new(),
            receipts: HashMap::new(),
            next_lock_id: config.first_lock_id,
            block_number: 0,
            nonce: 0,
            faults: Faults::default(),
        };
        Self {
            config,
            state: Mutex::new(state),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(SimulatedEscrowConfig::default())
    }

    fn lock(&self) -> Result<MutexGuard<'_, LedgerState>, LedgerError> {
        self.state
            .lock()
            .map_err(|_| LedgerError::Rpc("escrow state poisoned".to_string()))
    }

    /// Create (or replace) a funded order
    pub fn fund_order(
        &self,
        order_id: OrderId,
        seller: WalletAddress,
        total: TokenAmount,
    ) -> Result<(), LedgerError> {
        let mut state = self.lock()?;
        state.orders.insert(
            order_id,
            OnChainOrder {
                order_id,
                seller,
                total_amount: total,
                remaining_amount: total,
            },
        );
        Ok(())
    }

    /// Overwrite an order's on-chain remaining amount
    pub fn set_remaining(&self, order_id: OrderId, remaining: TokenAmount) -> Result<(), LedgerError> {
        let mut state = self.lock()?;
        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or(LedgerError::OrderNotFound { order_id })?;
        order.remaining_amount = remaining;
        Ok(())
    }

    /// Make every call fail with `LedgerError::Unreachable`
    pub fn set_unreachable(&self, unreachable: bool) -> Result<(), LedgerError> {
        self.lock()?.faults.unreachable = unreachable;
        Ok(())
    }

    /// Make `get_order` fail for one order
    pub fn fail_reads_for(&self, order_id: OrderId) -> Result<(), LedgerError> {
        self.lock()?.faults.failing_reads.insert(order_id);
        Ok(())
    }

    /// Omit the last `count` lock events from the next successful receipt
    pub fn drop_next_events(&self, count: usize) -> Result<(), LedgerError> {
        self.lock()?.faults.drop_events = count;
        Ok(())
    }

    /// Revert the next batch regardless of liquidity
    pub fn revert_next(&self) -> Result<(), LedgerError> {
        self.lock()?.faults.force_revert = true;
        Ok(())
    }

    /// Current on-chain view without fault injection
    pub fn order(&self, order_id: OrderId) -> Result<Option<OnChainOrder>, LedgerError> {
        Ok(self.lock()?.orders.get(&order_id).cloned())
    }

    fn tx_hash(nonce: u64, caller: &WalletAddress, order_ids: &[OrderId], amounts: &[TokenAmount]) -> TxHash {
        let mut hasher = Sha256::new();
        hasher.update(nonce.to_be_bytes());
        hasher.update(caller.as_str().as_bytes());
        for (order_id, amount) in order_ids.iter().zip(amounts) {
            hasher.update(order_id.value().to_be_bytes());
            hasher.update(amount.base_units().to_be_bytes());
        }
        TxHash::new(format!("0x{}", hex::encode(hasher.finalize())))
    }

    /// Whether every entry fits, counting repeated order ids cumulatively
    fn batch_fits(state: &LedgerState, order_ids: &[OrderId], amounts: &[TokenAmount]) -> bool {
        let mut demand: HashMap<OrderId, TokenAmount> = HashMap::new();
        for (order_id, amount) in order_ids.iter().zip(amounts) {
            let entry = demand.entry(*order_id).or_insert(TokenAmount::ZERO);
            match entry.checked_add(*amount) {
                Some(total) => *entry = total,
                None => return false,
            }
        }
        demand.iter().all(|(order_id, wanted)| {
            state
                .orders
                .get(order_id)
                .map(|order| order.remaining_amount >= *wanted)
                .unwrap_or(false)
        })
    }
}

#[async_trait]
impl EscrowLedger for SimulatedEscrow {
    fn contract_address(&self) -> &str {
        &self.config.contract_address
    }

    async fn lock_multiple_orders(
        &self,
        caller: &WalletAddress,
        order_ids: &[OrderId],
        amounts: &[TokenAmount],
    ) -> Result<TxHash, LedgerError> {
        if order_ids.len() != amounts.len() {
            return Err(LedgerError::LengthMismatch {
                orders: order_ids.len(),
                amounts: amounts.len(),
            });
        }
        if order_ids.is_empty() {
            return Err(LedgerError::EmptyBatch);
        }

        let mut state = self.lock()?;
        if state.faults.unreachable {
            return Err(LedgerError::Unreachable("escrow node offline".to_string()));
        }

        state.nonce += 1;
        state.block_number += 1;
        let tx_hash = Self::tx_hash(state.nonce, caller, order_ids, amounts);
        let block_number = state.block_number;

        let revert = std::mem::take(&mut state.faults.force_revert)
            || !Self::batch_fits(&state, order_ids, amounts);

        let receipt = if revert {
            warn!(tx_hash = %tx_hash, entries = order_ids.len(), "Batch lock reverted");
            TransactionReceipt {
                tx_hash: tx_hash.clone(),
                status: ReceiptStatus::Reverted,
                block_number,
                logs: Vec::new(),
            }
        } else {
            let mut logs = Vec::with_capacity(order_ids.len());
            for (order_id, amount) in order_ids.iter().zip(amounts) {
                let lock_id = LockId::new(state.next_lock_id);
                state.next_lock_id += 1;
                if let Some(order) = state.orders.get_mut(order_id) {
                    order.remaining_amount = order.remaining_amount.saturating_sub(*amount);
                }
                let event = OrderLocked {
                    lock_id,
                    order_id: *order_id,
                    buyer: caller.clone(),
                    amount: *amount,
                };
                let log = event
                    .to_log(&self.config.contract_address)
                    .map_err(|e| LedgerError::Rpc(e.to_string()))?;
                logs.push(log);
            }
            let dropped = std::mem::take(&mut state.faults.drop_events).min(logs.len());
            logs.truncate(logs.len() - dropped);

            info!(
                tx_hash = %tx_hash,
                block = block_number,
                entries = order_ids.len(),
                "Batch lock mined"
            );
            TransactionReceipt {
                tx_hash: tx_hash.clone(),
                status: ReceiptStatus::Success,
                block_number,
                logs,
            }
        };

        state.receipts.insert(tx_hash.clone(), receipt);
        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, tx_hash: &TxHash) -> Result<TransactionReceipt, LedgerError> {
        if self.config.receipt_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.receipt_delay_ms)).await;
        }

        let state = self.lock()?;
        if state.faults.unreachable {
            return Err(LedgerError::Unreachable("escrow node offline".to_string()));
        }
        debug!(tx_hash = %tx_hash, "Receipt lookup");
        state
            .receipts
            .get(tx_hash)
            .cloned()
            .ok_or_else(|| LedgerError::ReceiptNotFound {
                tx_hash: tx_hash.clone(),
            })
    }

    async fn get_order(&self, order_id: OrderId) -> Result<OnChainOrder, LedgerError> {
        let state = self.lock()?;
        if state.faults.unreachable {
            return Err(LedgerError::Unreachable("escrow node offline".to_string()));
        }
        if state.faults.failing_reads.contains(&order_id) {
            return Err(LedgerError::Rpc(format!("call reverted reading order {}", order_id)));
        }
        state
            .orders
            .get(&order_id)
            .cloned()
            .ok_or(LedgerError::OrderNotFound { order_id })
    }
}
