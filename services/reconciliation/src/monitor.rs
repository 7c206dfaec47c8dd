//! Reconciliation monitor
//!
//! Periodically compares every non-terminal order's mirrored remaining amount
//! with the escrow's authoritative one:
//! - differences below the tolerance count as synced
//! - larger differences raise (or refresh) a `MismatchAlert`
//! - each scan persists one `SyncMetrics` record together with its alerts
//!
//! The monitor only reads from both ledgers and never corrects either one.
//! At most one scan runs at a time; a trigger that finds a scan in flight is
//! skipped, not queued.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use escrow::EscrowLedger;
use order_store::{BatchWrite, OrderFilter, OrderStore};
use rust_decimal::Decimal;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use types::clock::Clock;
use types::reconciliation::{MismatchAlert, SyncMetrics};

use crate::classifier::{Classification, MismatchClassifier};
use crate::config::MonitorConfig;
use crate::errors::ReconciliationError;
use crate::metrics::MonitorMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Scanning,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    Completed(SyncMetrics),
    /// Another scan was already running
    Skipped,
}

/// Clears the single-flight flag when the scan ends, however it ends
struct ScanGuard<'a>(&'a AtomicBool);

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ReconciliationMonitor {
    store: Arc<dyn OrderStore>,
    ledger: Arc<dyn EscrowLedger>,
    clock: Arc<dyn Clock>,
    config: MonitorConfig,
    classifier: MismatchClassifier,
    scanning: AtomicBool,
    metrics: MonitorMetrics,
}

impl ReconciliationMonitor {
    pub fn new(
        store: Arc<dyn OrderStore>,
        ledger: Arc<dyn EscrowLedger>,
        clock: Arc<dyn Clock>,
        config: MonitorConfig,
    ) -> Self {
        let classifier = MismatchClassifier::new(config.thresholds.clone());
        Self {
            store,
            ledger,
            clock,
            config,
            classifier,
            scanning: AtomicBool::new(false),
            metrics: MonitorMetrics::new(),
        }
    }

    pub fn state(&self) -> MonitorState {
        if self.scanning.load(Ordering::Acquire) {
            MonitorState::Scanning
        } else {
            MonitorState::Idle
        }
    }

    pub fn metrics(&self) -> &MonitorMetrics {
        &self.metrics
    }

    /// Run one scan now unless one is already running
    pub async fn run_scan(&self) -> Result<ScanOutcome, ReconciliationError> {
        if self
            .scanning
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Reconciliation scan already in progress, skipping");
            self.metrics.record_skipped();
            return Ok(ScanOutcome::Skipped);
        }
        let _guard = ScanGuard(&self.scanning);

        match self.scan().await {
            Ok(metrics) => {
                self.metrics.record_completed(&metrics);
                Ok(ScanOutcome::Completed(metrics))
            }
            Err(e) => {
                self.metrics.record_aborted();
                Err(e)
            }
        }
    }

    /// Spawn the periodic scan loop
    ///
    /// The first scan runs immediately. Errors are logged and the loop waits
    /// for the next tick.
    pub fn start(self: Arc<Self>) -> MonitorHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let interval = self.config.scan_interval();
        let monitor = self;

        let task = tokio::spawn(async move {
            info!(interval_secs = interval.as_secs(), "Reconciliation monitor started");
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = monitor.run_scan().await {
                            error!(error = %e, "Reconciliation scan aborted");
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("Reconciliation monitor stopped");
        });

        MonitorHandle { shutdown_tx, task }
    }

    async fn scan(&self) -> Result<SyncMetrics, ReconciliationError> {
        let scanned_at = self.clock.now_millis();
        let orders = self.store.query_orders(&OrderFilter::non_terminal()).await?;
        debug!(orders = orders.len(), "Reconciliation scan started");

        let mut metrics = SyncMetrics::empty(scanned_at);
        metrics.total_orders = orders.len() as u64;
        let mut by_severity = BTreeMap::new();
        let mut difference_sum = Decimal::ZERO;
        let mut writes = Vec::new();

        for order in &orders {
            let on_chain = match self.ledger.get_order(order.order_id).await {
                Ok(on_chain) => on_chain,
                Err(e) if e.is_unreachable() => {
                    return Err(ReconciliationError::LedgerUnreachable(e.to_string()));
                }
                Err(e) => {
                    warn!(order_id = %order.order_id, error = %e, "On-chain read failed");
                    metrics.failed_checks += 1;
                    continue;
                }
            };

            let classification = match self.classifier.classify(
                order.remaining_amount,
                on_chain.remaining_amount,
                order.total_amount,
                order.token.decimals,
            ) {
                Ok(classification) => classification,
                Err(e) => {
                    warn!(order_id = %order.order_id, error = %e, "Order amounts not comparable");
                    metrics.failed_checks += 1;
                    continue;
                }
            };

            match classification {
                Classification::Synced => metrics.synced_orders += 1,
                Classification::Mismatch { severity, difference } => {
                    warn!(
                        order_id = %order.order_id,
                        severity = %severity,
                        off_chain = %order.remaining_amount,
                        on_chain = %on_chain.remaining_amount,
                        difference = %difference,
                        "Balance mismatch"
                    );
                    metrics.mismatches += 1;
                    *by_severity.entry(severity).or_insert(0) += 1;
                    difference_sum += difference;
                    writes.push(BatchWrite::UpsertAlert(MismatchAlert {
                        order_id: order.order_id,
                        severity,
                        off_chain_amount: order.remaining_amount,
                        on_chain_amount: on_chain.remaining_amount,
                        difference,
                        detected_at: scanned_at,
                        first_detected_at: scanned_at,
                        resolved: false,
                    }));
                }
            }
        }

        metrics.mismatches_by_severity = by_severity;
        if metrics.mismatches > 0 {
            metrics.average_abs_difference = difference_sum / Decimal::from(metrics.mismatches);
        }

        writes.push(BatchWrite::RecordMetrics(metrics.clone()));
        self.store.write_batch(writes).await?;

        info!(
            total = metrics.total_orders,
            synced = metrics.synced_orders,
            mismatches = metrics.mismatches,
            failed_checks = metrics.failed_checks,
            "Reconciliation scan completed"
        );
        Ok(metrics)
    }
}

/// Handle to a running monitor loop
pub struct MonitorHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Signal the loop to stop and wait for it to exit
    ///
    /// A scan in progress finishes first.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            error!(error = %e, "Reconciliation monitor task failed");
        }
    }
}
