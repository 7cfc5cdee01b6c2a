//! Ledger runtime configuration.
//!
//! Loaded from a TOML or JSON file (chosen by extension), then overridden by
//! `TALLY_*` environment variables.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};

/// Environment override for [`LedgerConfig::recovery_delay_ms`].
pub const ENV_RECOVERY_DELAY_MS: &str = "TALLY_RECOVERY_DELAY_MS";
/// Environment override for [`LedgerConfig::lock_timeout_ms`].
pub const ENV_LOCK_TIMEOUT_MS: &str = "TALLY_LOCK_TIMEOUT_MS";

/// Lock and recovery settings for a [`crate::Ledger`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Simulated recovery latency per conflicting resource
    pub recovery_delay_ms: u64,
    /// Upper bound on waiting for either lock in `record`; `None` waits forever
    pub lock_timeout_ms: Option<u64>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            recovery_delay_ms: 1_000,
            lock_timeout_ms: None,
        }
    }
}

impl LedgerConfig {
    /// Read a configuration file. `.toml` and `.json` are supported.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| LedgerError::config(format!("Failed to read config file: {e}")))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&content)
                .map_err(|e| LedgerError::config(format!("Invalid TOML: {e}"))),
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| LedgerError::config(format!("Invalid JSON: {e}"))),
            _ => Err(LedgerError::config("Unsupported file format")),
        }
    }

    /// Apply `TALLY_*` environment overrides.
    pub fn merge_with_env(&mut self) -> Result<()> {
        self.merge_with_vars(|key| std::env::var(key).ok())
    }

    fn merge_with_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(delay) = lookup(ENV_RECOVERY_DELAY_MS) {
            self.recovery_delay_ms = delay.parse().map_err(|_| {
                LedgerError::config(format!("Invalid delay in {ENV_RECOVERY_DELAY_MS}"))
            })?;
        }
        if let Some(timeout) = lookup(ENV_LOCK_TIMEOUT_MS) {
            self.lock_timeout_ms = Some(timeout.parse().map_err(|_| {
                LedgerError::config(format!("Invalid timeout in {ENV_LOCK_TIMEOUT_MS}"))
            })?);
        }
        Ok(())
    }

    /// Reject settings that would make every contended lock fail.
    pub fn validate(&self) -> Result<()> {
        if self.lock_timeout_ms == Some(0) {
            return Err(LedgerError::config("lock_timeout_ms must be greater than zero"));
        }
        Ok(())
    }

    /// Recovery delay as a `Duration`
    pub fn recovery_delay(&self) -> Duration {
        Duration::from_millis(self.recovery_delay_ms)
    }

    /// Lock timeout as a `Duration`
    pub fn lock_timeout(&self) -> Option<Duration> {
        self.lock_timeout_ms.map(Duration::from_millis)
    }
}
