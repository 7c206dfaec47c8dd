//! Reconciliation Service
//!
//! Background check that the off-chain order mirror agrees with the escrow
//! ledger. Drift is graded by severity and persisted as alerts next to a
//! per-scan `SyncMetrics` record.
//!
//! **Key Invariants:**
//! - Read-only against both ledgers; only alerts and metrics are written
//! - At most one scan in flight per monitor
//! - An unreachable ledger aborts the cycle, never the loop

pub mod classifier;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod monitor;

pub use classifier::{Classification, MismatchClassifier};
pub use config::{MonitorConfig, ReconciliationThresholds};
pub use errors::ReconciliationError;
pub use metrics::MonitorMetrics;
pub use monitor::{MonitorHandle, MonitorState, ReconciliationMonitor, ScanOutcome};
