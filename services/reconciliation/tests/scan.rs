//! Reconciliation scans against the in-memory store and simulated escrow

use async_trait::async_trait;
use escrow::{EscrowLedger, LedgerError, OnChainOrder, SimulatedEscrow, TransactionReceipt};
use order_store::{InMemoryOrderStore, OrderStore};
use reconciliation::{
    MonitorConfig, MonitorState, ReconciliationError, ReconciliationMonitor, ScanOutcome,
};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use types::clock::FixedClock;
use types::ids::{FiatCurrency, OrderId, PaymentChannel, TxHash, WalletAddress};
use types::numeric::{Markup, Token, TokenAmount};
use types::order::{Order, OrderStatus};
use types::reconciliation::{Severity, SyncMetrics};

const UNIT: u128 = 1_000_000;
const T0: i64 = 1_700_000_000_000;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn order(id: u64, token: Token, total: u128) -> Order {
    Order::new(
        OrderId::new(id),
        WalletAddress::new("0xseller"),
        token,
        FiatCurrency::new("KES"),
        Markup::from_bps(100),
        TokenAmount::new(total),
        vec![PaymentChannel::new("M-PESA")],
        1,
        0,
    )
}

struct Harness {
    store: Arc<InMemoryOrderStore>,
    escrow: Arc<SimulatedEscrow>,
    clock: Arc<FixedClock>,
}

impl Harness {
    fn new() -> Self {
        Self {
            store: Arc::new(InMemoryOrderStore::with_defaults()),
            escrow: Arc::new(SimulatedEscrow::with_defaults()),
            clock: Arc::new(FixedClock::new(T0)),
        }
    }

    /// Seed an order on both ledgers with different remaining amounts
    fn seed(&self, order: Order, on_chain_remaining: u128) {
        self.escrow
            .fund_order(order.order_id, order.seller.clone(), order.total_amount)
            .unwrap();
        self.escrow
            .set_remaining(order.order_id, TokenAmount::new(on_chain_remaining))
            .unwrap();
        self.store.insert_order(order).unwrap();
    }

    fn monitor(&self, config: MonitorConfig) -> ReconciliationMonitor {
        ReconciliationMonitor::new(self.store.clone(), self.escrow.clone(), self.clock.clone(), config)
    }

    async fn completed(&self, monitor: &ReconciliationMonitor) -> SyncMetrics {
        match monitor.run_scan().await.unwrap() {
            ScanOutcome::Completed(metrics) => metrics,
            ScanOutcome::Skipped => panic!("scan unexpectedly skipped"),
        }
    }
}

#[tokio::test]
async fn test_sub_tolerance_drift_counts_as_synced() {
    let h = Harness::new();
    let eth = Token::new("WETH", 18);
    // Off-chain 100.0, on-chain 99.9999995
    h.seed(order(1, eth, 100_000_000_000_000_000_000), 99_999_999_500_000_000_000);

    let metrics = h.completed(&h.monitor(MonitorConfig::default())).await;
    assert_eq!(metrics.synced_orders, 1);
    assert_eq!(metrics.mismatches, 0);
    assert!(h.store.alerts().unwrap().is_empty());
}

#[tokio::test]
async fn test_scan_grades_mismatches_and_tolerates_failed_reads() {
    init_tracing();
    let h = Harness::new();
    let usdc = Token::new("USDC", 6);
    h.seed(order(1, usdc.clone(), 100 * UNIT), 100 * UNIT);
    // 0.05% drift
    h.seed(order(2, usdc.clone(), 100 * UNIT), 100 * UNIT - UNIT / 20);
    // 5% drift
    h.seed(order(3, usdc.clone(), 100 * UNIT), 95 * UNIT);
    h.seed(order(4, usdc.clone(), 100 * UNIT), 100 * UNIT);
    h.escrow.fail_reads_for(OrderId::new(4)).unwrap();

    let mut closed = order(5, usdc, 100 * UNIT);
    closed.remaining_amount = TokenAmount::ZERO;
    closed.status = OrderStatus::Closed;
    h.seed(closed, 50 * UNIT);

    let metrics = h.completed(&h.monitor(MonitorConfig::default())).await;
    assert_eq!(metrics.scanned_at, T0);
    assert_eq!(metrics.total_orders, 4);
    assert_eq!(metrics.synced_orders, 1);
    assert_eq!(metrics.failed_checks, 1);
    assert_eq!(metrics.mismatches, 2);
    assert_eq!(metrics.count_for(Severity::Low), 1);
    assert_eq!(metrics.count_for(Severity::High), 1);
    assert_eq!(metrics.count_for(Severity::Medium), 0);
    // (0.05 + 5) / 2
    assert_eq!(metrics.average_abs_difference, Decimal::from_str("2.525").unwrap());

    let high = h.store.get_alert(OrderId::new(3)).await.unwrap().unwrap();
    assert_eq!(high.severity, Severity::High);
    assert_eq!(high.on_chain_amount, TokenAmount::new(95 * UNIT));
    assert!(!high.resolved);
    assert_eq!(h.store.latest_metrics().await.unwrap(), Some(metrics));
}

#[tokio::test]
async fn test_repeated_scans_are_idempotent() {
    let h = Harness::new();
    let usdc = Token::new("USDC", 6);
    h.seed(order(1, usdc.clone(), 100 * UNIT), 99 * UNIT);
    h.seed(order(2, usdc, 100 * UNIT), 100 * UNIT);
    let monitor = h.monitor(MonitorConfig::default());

    let first = h.completed(&monitor).await;
    let second = h.completed(&monitor).await;
    assert_eq!(first, second);
    assert_eq!(h.store.alerts().unwrap().len(), 1);
    assert_eq!(h.store.metrics_history().unwrap().len(), 2);
}

#[tokio::test]
async fn test_alert_keeps_first_detection_and_reopens() {
    let h = Harness::new();
    h.seed(order(1, Token::new("USDC", 6), 100 * UNIT), 99 * UNIT);
    let monitor = h.monitor(MonitorConfig::default());

    h.completed(&monitor).await;
    h.store.resolve_alert(OrderId::new(1)).await.unwrap();

    h.clock.advance(300_000);
    h.completed(&monitor).await;

    let alert = h.store.get_alert(OrderId::new(1)).await.unwrap().unwrap();
    assert_eq!(alert.first_detected_at, T0);
    assert_eq!(alert.detected_at, T0 + 300_000);
    assert!(!alert.resolved);
}

#[tokio::test]
async fn test_unreachable_ledger_aborts_cycle() {
    let h = Harness::new();
    h.seed(order(1, Token::new("USDC", 6), 100 * UNIT), 100 * UNIT);
    let monitor = h.monitor(MonitorConfig::default());

    h.escrow.set_unreachable(true).unwrap();
    let err = monitor.run_scan().await.unwrap_err();
    assert!(matches!(err, ReconciliationError::LedgerUnreachable(_)));
    assert!(h.store.metrics_history().unwrap().is_empty());
    assert_eq!(monitor.state(), MonitorState::Idle);

    h.escrow.set_unreachable(false).unwrap();
    let metrics = h.completed(&monitor).await;
    assert_eq!(metrics.synced_orders, 1);

    let exported = monitor.metrics().export();
    assert_eq!(exported["scans_aborted"], 1);
    assert_eq!(exported["scans_completed"], 1);
}

/// Ledger whose reads block until released
struct GatedLedger {
    inner: Arc<SimulatedEscrow>,
    gate: Arc<Notify>,
}

#[async_trait]
impl EscrowLedger for GatedLedger {
    fn contract_address(&self) -> &str {
        self.inner.contract_address()
    }

    async fn lock_multiple_orders(
        &self,
        caller: &WalletAddress,
        order_ids: &[OrderId],
        amounts: &[TokenAmount],
    ) -> Result<TxHash, LedgerError> {
        self.inner.lock_multiple_orders(caller, order_ids, amounts).await
    }

    async fn wait_for_receipt(&self, tx_hash: &TxHash) -> Result<TransactionReceipt, LedgerError> {
        self.inner.wait_for_receipt(tx_hash).await
    }

    async fn get_order(&self, order_id: OrderId) -> Result<OnChainOrder, LedgerError> {
        self.gate.notified().await;
        self.inner.get_order(order_id).await
    }
}

#[tokio::test]
async fn test_concurrent_trigger_is_skipped() {
    let h = Harness::new();
    h.seed(order(1, Token::new("USDC", 6), 100 * UNIT), 100 * UNIT);
    let gate = Arc::new(Notify::new());
    let ledger = Arc::new(GatedLedger {
        inner: h.escrow.clone(),
        gate: gate.clone(),
    });
    let monitor = Arc::new(ReconciliationMonitor::new(
        h.store.clone(),
        ledger,
        h.clock.clone(),
        MonitorConfig::default(),
    ));

    let running = {
        let monitor = Arc::clone(&monitor);
        tokio::spawn(async move { monitor.run_scan().await })
    };
    while monitor.state() != MonitorState::Scanning {
        tokio::task::yield_now().await;
    }

    assert_eq!(monitor.run_scan().await.unwrap(), ScanOutcome::Skipped);

    gate.notify_one();
    let outcome = running.await.unwrap().unwrap();
    assert!(matches!(outcome, ScanOutcome::Completed(_)));
    assert_eq!(monitor.state(), MonitorState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_loop_scans_on_interval_until_stopped() {
    let h = Harness::new();
    h.seed(order(1, Token::new("USDC", 6), 100 * UNIT), 100 * UNIT);
    let monitor = Arc::new(h.monitor(MonitorConfig::default()));

    let handle = Arc::clone(&monitor).start();
    while monitor.metrics().scans_completed() < 1 {
        tokio::task::yield_now().await;
    }

    tokio::time::advance(Duration::from_secs(300)).await;
    while monitor.metrics().scans_completed() < 2 {
        tokio::task::yield_now().await;
    }

    handle.stop().await;
    assert_eq!(h.store.metrics_history().unwrap().len(), 2);

    // No further scans once stopped
    tokio::time::advance(Duration::from_secs(900)).await;
    assert_eq!(monitor.metrics().scans_completed(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_loop_survives_unreachable_ledger() {
    let h = Harness::new();
    h.seed(order(1, Token::new("USDC", 6), 100 * UNIT), 100 * UNIT);
    h.escrow.set_unreachable(true).unwrap();
    let monitor = Arc::new(h.monitor(MonitorConfig::default()));

    let handle = Arc::clone(&monitor).start();
    while monitor.metrics().export()["scans_aborted"] < 1 {
        tokio::task::yield_now().await;
    }

    h.escrow.set_unreachable(false).unwrap();
    tokio::time::advance(Duration::from_secs(300)).await;
    while monitor.metrics().scans_completed() < 1 {
        tokio::task::yield_now().await;
    }
    handle.stop().await;
}
