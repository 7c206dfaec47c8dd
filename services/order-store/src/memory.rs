//! In-memory order store with optimistic transactions
//!
//! Every order carries a version. `commit_lock` reads a snapshot, applies the
//! decrement to a copy, and writes back only if the stored version is still
//! the one it read; on conflict it re-reads and retries up to the configured
//! attempt budget. Business rejections (closed order, insufficient remaining,
//! duplicate lock) abort immediately without retrying.
//!
//! Lock order is always orders → trades, and no guard is held across an
//! `.await`.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};
use types::ids::{LockId, OrderId, WalletAddress};
use types::order::Order;
use types::reconciliation::{MismatchAlert, SyncMetrics};
use types::reputation::SellerReputation;
use types::trade::Trade;

use crate::errors::StoreError;
use crate::store::{BatchWrite, OrderFilter, OrderStore};

/// Configuration for the in-memory store
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Attempts before a contended transaction gives up
    pub max_transaction_attempts: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_transaction_attempts: 5,
        }
    }
}

/// Document store held in process memory
pub struct InMemoryOrderStore {
    orders: Mutex<BTreeMap<OrderId, Order>>,
    trades: Mutex<BTreeMap<LockId, Trade>>,
    reputations: Mutex<HashMap<WalletAddress, SellerReputation>>,
    alerts: Mutex<BTreeMap<OrderId, MismatchAlert>>,
    metrics: Mutex<Vec<SyncMetrics>>,
    /// Simulates a store outage when set
    unavailable: AtomicBool,
    config: StoreConfig,
}

impl InMemoryOrderStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            orders: Mutex::new(BTreeMap::new()),
            trades: Mutex::new(BTreeMap::new()),
            reputations: Mutex::new(HashMap::new()),
            alerts: Mutex::new(BTreeMap::new()),
            metrics: Mutex::new(Vec::new()),
            unavailable: AtomicBool::new(false),
            config,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(StoreConfig::default())
    }

    /// Insert or replace an order document
    pub fn insert_order(&self, order: Order) -> Result<(), StoreError> {
        lock(&self.orders)?.insert(order.order_id, order);
        Ok(())
    }

    pub fn insert_trade(&self, trade: Trade) -> Result<(), StoreError> {
        lock(&self.trades)?.insert(trade.lock_id, trade);
        Ok(())
    }

    pub fn set_reputation(&self, seller: WalletAddress, reputation: SellerReputation) -> Result<(), StoreError> {
        lock(&self.reputations)?.insert(seller, reputation);
        Ok(())
    }

    /// Toggle a simulated outage
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// All alerts, resolved or not
    pub fn alerts(&self) -> Result<Vec<MismatchAlert>, StoreError> {
        Ok(lock(&self.alerts)?.values().cloned().collect())
    }

    /// Every metrics record written so far, oldest first
    pub fn metrics_history(&self) -> Result<Vec<SyncMetrics>, StoreError> {
        Ok(lock(&self.metrics)?.clone())
    }

    pub fn trades(&self) -> Result<Vec<Trade>, StoreError> {
        Ok(lock(&self.trades)?.values().cloned().collect())
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("order store offline".to_string()));
        }
        Ok(())
    }

    fn snapshot_order(&self, order_id: OrderId) -> Result<Order, StoreError> {
        lock(&self.orders)?
            .get(&order_id)
            .cloned()
            .ok_or(StoreError::OrderNotFound { order_id })
    }

    /// Write the updated order and the trade if the order is unchanged since `read_version`
    fn try_commit(&self, read_version: u64, updated: Order, trade: Trade) -> Result<Order, StoreError> {
        let mut orders = lock(&self.orders)?;
        let mut trades = lock(&self.trades)?;

        let current = orders
            .get(&updated.order_id)
            .ok_or(StoreError::OrderNotFound { order_id: updated.order_id })?;
        if current.version != read_version {
            return Err(StoreError::VersionConflict {
                order_id: updated.order_id,
                expected: read_version,
                found: current.version,
            });
        }
        if trades.contains_key(&trade.lock_id) {
            return Err(StoreError::TradeAlreadyExists { lock_id: trade.lock_id });
        }

        trades.insert(trade.lock_id, trade);
        orders.insert(updated.order_id, updated.clone());
        Ok(updated)
    }
}

impl Default for InMemoryOrderStore {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    mutex
        .lock()
        .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn query_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, StoreError> {
        self.ensure_available()?;
        Ok(lock(&self.orders)?
            .values()
            .filter(|order| filter.matches(order))
            .cloned()
            .collect())
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, StoreError> {
        self.ensure_available()?;
        Ok(lock(&self.orders)?.get(&order_id).cloned())
    }

    async fn seller_reputations(
        &self,
        sellers: &[WalletAddress],
    ) -> Result<HashMap<WalletAddress, SellerReputation>, StoreError> {
        self.ensure_available()?;
        let reputations = lock(&self.reputations)?;
        Ok(sellers
            .iter()
            .filter_map(|seller| {
                reputations
                    .get(seller)
                    .map(|reputation| (seller.clone(), reputation.clone()))
            })
            .collect())
    }

    async fn trades_for_buyer(&self, buyer: &WalletAddress) -> Result<Vec<Trade>, StoreError> {
        self.ensure_available()?;
        Ok(lock(&self.trades)?
            .values()
            .filter(|trade| &trade.buyer == buyer)
            .cloned()
            .collect())
    }

    async fn get_trade(&self, lock_id: LockId) -> Result<Option<Trade>, StoreError> {
        self.ensure_available()?;
        Ok(lock(&self.trades)?.get(&lock_id).cloned())
    }

    async fn commit_lock(&self, trade: Trade) -> Result<Order, StoreError> {
        self.ensure_available()?;
        if !trade.validate_no_self_trade() {
            warn!(lock_id = %trade.lock_id, buyer = %trade.buyer, "Self-trade lock refused");
            return Err(StoreError::SelfTrade { lock_id: trade.lock_id });
        }
        let order_id = trade.order_id;
        let attempts = self.config.max_transaction_attempts.max(1);

        for attempt in 1..=attempts {
            if lock(&self.trades)?.contains_key(&trade.lock_id) {
                return Err(StoreError::TradeAlreadyExists { lock_id: trade.lock_id });
            }

            let snapshot = self.snapshot_order(order_id)?;
            let mut updated = snapshot.clone();
            updated.apply_lock(trade.amount)?;

            match self.try_commit(snapshot.version, updated, trade.clone()) {
                Ok(order) => {
                    debug!(
                        order_id = %order_id,
                        lock_id = %trade.lock_id,
                        remaining = %order.remaining_amount,
                        attempt,
                        "Lock committed"
                    );
                    return Ok(order);
                }
                Err(StoreError::VersionConflict { expected, found, .. }) => {
                    debug!(order_id = %order_id, expected, found, attempt, "Version conflict, retrying");
                }
                Err(other) => return Err(other),
            }
        }

        warn!(order_id = %order_id, lock_id = %trade.lock_id, attempts, "Lock commit aborted under contention");
        Err(StoreError::TransactionAborted { order_id, attempts })
    }

    async fn write_batch(&self, writes: Vec<BatchWrite>) -> Result<(), StoreError> {
        self.ensure_available()?;
        let mut alerts = lock(&self.alerts)?;
        let mut metrics = lock(&self.metrics)?;

        for write in writes {
            match write {
                BatchWrite::UpsertAlert(alert) => {
                    let order_id = alert.order_id;
                    let merged = alert.merge_into(alerts.get(&order_id));
                    alerts.insert(order_id, merged);
                }
                BatchWrite::RecordMetrics(record) => metrics.push(record),
            }
        }
        Ok(())
    }

    async fn get_alert(&self, order_id: OrderId) -> Result<Option<MismatchAlert>, StoreError> {
        self.ensure_available()?;
        Ok(lock(&self.alerts)?.get(&order_id).cloned())
    }

    async fn resolve_alert(&self, order_id: OrderId) -> Result<MismatchAlert, StoreError> {
        self.ensure_available()?;
        let mut alerts = lock(&self.alerts)?;
        let alert = alerts
            .get_mut(&order_id)
            .ok_or(StoreError::AlertNotFound { order_id })?;
        alert.resolved = true;
        Ok(alert.clone())
    }

    async fn latest_metrics(&self) -> Result<Option<SyncMetrics>, StoreError> {
        self.ensure_available()?;
        Ok(lock(&self.metrics)?.last().cloned())
    }
}
