//! Settlement coordinator
//!
//! Settles a priced trade plan across both ledgers:
//! 1. re-validate every matched order against the store
//! 2. submit one batched lock and wait for its receipt
//! 3. decode one `OrderLocked` event per matched order
//! 4. record each lock off-chain in its own atomic commit
//!
//! Commits are independent. A failed commit is reported and never undoes
//! the others; the on-chain lock has already happened.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use escrow::{decode_lock_events, EscrowLedger, OrderLocked, TransactionReceipt};
use order_store::OrderStore;
use rust_decimal::Decimal;
use tracing::{error, info, warn};
use types::clock::Clock;
use types::ids::{OrderId, TxHash};
use types::numeric::TokenAmount;
use types::plan::{MatchedOrder, TradePlan};
use types::trade::Trade;

use crate::config::SettlementConfig;
use crate::errors::{SettlementError, StaleOrder, StaleReason};
use crate::report::{FailedCommit, SettlementReport};

pub struct SettlementCoordinator {
    store: Arc<dyn OrderStore>,
    ledger: Arc<dyn EscrowLedger>,
    clock: Arc<dyn Clock>,
    config: SettlementConfig,
}

impl SettlementCoordinator {
    pub fn new(
        store: Arc<dyn OrderStore>,
        ledger: Arc<dyn EscrowLedger>,
        clock: Arc<dyn Clock>,
        config: SettlementConfig,
    ) -> Self {
        Self {
            store,
            ledger,
            clock,
            config,
        }
    }

    /// Settle a priced plan
    ///
    /// Errors mean nothing was recorded off-chain. `ConfirmationTimeout` and
    /// `Integration` additionally mean the chain may hold locks with no
    /// off-chain trade; reconciliation surfaces those.
    pub async fn settle(&self, plan: &TradePlan) -> Result<SettlementReport, SettlementError> {
        if plan.matched.is_empty() {
            return Err(SettlementError::EmptyPlan);
        }
        if let Some(unpriced) = plan.matched.iter().find(|m| m.locked_price.is_none()) {
            return Err(SettlementError::Unpriced {
                order_id: unpriced.order_id(),
            });
        }

        self.validate(plan).await?;

        let order_ids = plan.order_ids();
        let amounts: Vec<TokenAmount> = plan.matched.iter().map(|m| m.amount_to_take).collect();
        let tx_hash = self
            .ledger
            .lock_multiple_orders(&plan.buyer, &order_ids, &amounts)
            .await?;
        info!(plan_id = %plan.plan_id, tx_hash = %tx_hash, orders = order_ids.len(), "Lock submitted");

        let receipt = self.await_receipt(&tx_hash).await?;
        if !receipt.succeeded() {
            warn!(plan_id = %plan.plan_id, tx_hash = %tx_hash, "Lock reverted");
            return Err(SettlementError::Reverted { tx_hash });
        }

        let entries: Vec<(OrderId, TokenAmount)> =
            order_ids.iter().copied().zip(amounts.iter().copied()).collect();
        let contract = self.ledger.contract_address();
        let events = decode_lock_events(&receipt, contract, &plan.buyer, &entries).map_err(|source| {
            error!(
                plan_id = %plan.plan_id,
                tx_hash = %tx_hash,
                error = %source,
                "Confirmed lock cannot be mirrored off-chain, operator action required"
            );
            SettlementError::Integration {
                tx_hash: tx_hash.clone(),
                source,
            }
        })?;

        let report = self.record(plan, &tx_hash, events).await;
        if report.is_fully_recorded() {
            info!(
                plan_id = %plan.plan_id,
                tx_hash = %tx_hash,
                trades = report.succeeded(),
                "Settlement committed"
            );
        } else {
            warn!(
                plan_id = %plan.plan_id,
                tx_hash = %tx_hash,
                failed = report.failed.len(),
                attempted = report.attempted(),
                "Settlement partially recorded"
            );
        }
        Ok(report)
    }

    /// Check every matched order still holds its allocation
    ///
    /// Allocations against the same order are summed. Every offending order
    /// is reported, not just the first.
    async fn validate(&self, plan: &TradePlan) -> Result<(), SettlementError> {
        let mut demand: BTreeMap<OrderId, TokenAmount> = BTreeMap::new();
        for m in &plan.matched {
            let entry = demand.entry(m.order_id()).or_insert(TokenAmount::ZERO);
            *entry = entry.saturating_add(m.amount_to_take);
        }

        let mut stale = Vec::new();
        for (order_id, required) in demand {
            let reason = match self.store.get_order(order_id).await? {
                None => Some(StaleReason::Missing),
                Some(order) if !order.is_open() => Some(StaleReason::NotOpen {
                    status: order.status.to_string(),
                }),
                Some(order) if order.remaining_amount < required => Some(StaleReason::Insufficient {
                    required,
                    available: order.remaining_amount,
                }),
                Some(_) => None,
            };
            if let Some(reason) = reason {
                warn!(plan_id = %plan.plan_id, order_id = %order_id, reason = %reason, "Stale order");
                stale.push(StaleOrder { order_id, reason });
            }
        }

        if stale.is_empty() {
            Ok(())
        } else {
            Err(SettlementError::StaleOrders(stale))
        }
    }

    async fn await_receipt(&self, tx_hash: &TxHash) -> Result<TransactionReceipt, SettlementError> {
        let timeout = self.config.confirmation_timeout();
        match tokio::time::timeout(timeout, self.ledger.wait_for_receipt(tx_hash)).await {
            Ok(receipt) => Ok(receipt?),
            Err(_) => {
                error!(
                    tx_hash = %tx_hash,
                    timeout_ms = self.config.confirmation_timeout_ms,
                    "Lock receipt not received in time"
                );
                Err(SettlementError::ConfirmationTimeout {
                    tx_hash: tx_hash.clone(),
                })
            }
        }
    }

    /// Commit one trade per lock event
    async fn record(&self, plan: &TradePlan, tx_hash: &TxHash, events: Vec<OrderLocked>) -> SettlementReport {
        let mut by_order: HashMap<OrderId, VecDeque<&MatchedOrder>> = HashMap::new();
        for m in &plan.matched {
            by_order.entry(m.order_id()).or_default().push_back(m);
        }

        let created_at = self.clock.now_millis();
        let mut trades = Vec::with_capacity(events.len());
        let mut failed = Vec::new();

        for event in events {
            // decode_lock_events guarantees one matched entry per event
            let Some(matched) = by_order.get_mut(&event.order_id).and_then(VecDeque::pop_front) else {
                continue;
            };
            let trade = Trade::locked(
                event.lock_id,
                event.order_id,
                plan.buyer.clone(),
                matched.order.seller.clone(),
                plan.token.clone(),
                plan.fiat_currency.clone(),
                event.amount,
                matched.locked_price.unwrap_or(Decimal::ZERO),
                tx_hash.clone(),
                created_at,
            );

            match self.store.commit_lock(trade.clone()).await {
                Ok(order) => {
                    info!(
                        lock_id = %event.lock_id,
                        order_id = %event.order_id,
                        remaining = %order.remaining_amount,
                        "Lock recorded"
                    );
                    trades.push(trade);
                }
                Err(e) => {
                    error!(
                        lock_id = %event.lock_id,
                        order_id = %event.order_id,
                        error = %e,
                        "Lock not recorded"
                    );
                    failed.push(FailedCommit {
                        lock_id: event.lock_id,
                        order_id: event.order_id,
                        error: e,
                    });
                }
            }
        }

        SettlementReport {
            plan_id: plan.plan_id,
            tx_hash: tx_hash.clone(),
            trades,
            failed,
        }
    }
}
