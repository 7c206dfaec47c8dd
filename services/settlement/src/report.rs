//! Settlement outcome

use order_store::StoreError;
use types::ids::{LockId, OrderId, PlanId, TxHash};
use types::trade::Trade;

/// A confirmed lock whose off-chain record could not be written
#[derive(Debug, Clone, PartialEq)]
pub struct FailedCommit {
    pub lock_id: LockId,
    pub order_id: OrderId,
    pub error: StoreError,
}

/// Result of a settlement whose lock transaction was confirmed
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementReport {
    pub plan_id: PlanId,
    pub tx_hash: TxHash,
    /// Trades recorded off-chain
    pub trades: Vec<Trade>,
    /// Locks confirmed on-chain but not recorded
    pub failed: Vec<FailedCommit>,
}

impl SettlementReport {
    pub fn succeeded(&self) -> usize {
        self.trades.len()
    }

    pub fn attempted(&self) -> usize {
        self.trades.len() + self.failed.len()
    }

    pub fn is_fully_recorded(&self) -> bool {
        self.failed.is_empty()
    }

    /// Buyer-facing notice when some locks were not recorded
    pub fn discrepancy_message(&self) -> Option<String> {
        if self.is_fully_recorded() {
            return None;
        }
        Some(format!(
            "{} of {} trades may not be recorded correctly",
            self.failed.len(),
            self.attempted()
        ))
    }
}
