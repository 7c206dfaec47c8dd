//! Settlement configuration

use serde::Deserialize;
use std::time::Duration;

/// Settlement coordinator configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SettlementConfig {
    /// How long to wait for the lock receipt before giving up
    pub confirmation_timeout_ms: u64,
}

impl SettlementConfig {
    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_millis(self.confirmation_timeout_ms)
    }
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            confirmation_timeout_ms: 120_000,
        }
    }
}
