//! In-process counters for the reconciliation monitor
//!
//! Complements the persisted `SyncMetrics`: these describe the monitor
//! itself (how often it ran, skipped or aborted) rather than one scan.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use types::reconciliation::SyncMetrics;

#[derive(Debug, Default)]
pub struct MonitorMetrics {
    pub scans_completed: AtomicU64,
    pub scans_skipped: AtomicU64,
    pub scans_aborted: AtomicU64,
    pub orders_checked: AtomicU64,
    pub failed_checks: AtomicU64,
    pub last_mismatches: AtomicU64,
    pub last_scan_at: AtomicU64,
}

impl MonitorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed scan.
    pub fn record_completed(&self, metrics: &SyncMetrics) {
        self.scans_completed.fetch_add(1, Ordering::Relaxed);
        self.orders_checked.fetch_add(metrics.total_orders, Ordering::Relaxed);
        self.failed_checks.fetch_add(metrics.failed_checks, Ordering::Relaxed);
        self.last_mismatches.store(metrics.mismatches, Ordering::Relaxed);
        self.last_scan_at
            .store(u64::try_from(metrics.scanned_at).unwrap_or(0), Ordering::Relaxed);
    }

    /// Record a trigger that found a scan already running.
    pub fn record_skipped(&self) {
        self.scans_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a scan cut short by an unreachable dependency.
    pub fn record_aborted(&self) {
        self.scans_aborted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn scans_completed(&self) -> u64 {
        self.scans_completed.load(Ordering::Relaxed)
    }

    /// Export metrics as a BTreeMap for Prometheus-style exposition.
    pub fn export(&self) -> BTreeMap<String, u64> {
        let mut m = BTreeMap::new();
        m.insert("scans_completed".to_string(), self.scans_completed.load(Ordering::Relaxed));
        m.insert("scans_skipped".to_string(), self.scans_skipped.load(Ordering::Relaxed));
        m.insert("scans_aborted".to_string(), self.scans_aborted.load(Ordering::Relaxed));
        m.insert("orders_checked".to_string(), self.orders_checked.load(Ordering::Relaxed));
        m.insert("failed_checks".to_string(), self.failed_checks.load(Ordering::Relaxed));
        m.insert("last_mismatches".to_string(), self.last_mismatches.load(Ordering::Relaxed));
        m.insert("last_scan_at".to_string(), self.last_scan_at.load(Ordering::Relaxed));
        m
    }
}
