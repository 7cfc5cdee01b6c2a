//! Recovery strategies run once per conflicting resource during an audit.
//!
//! Recovery is simulated: the default strategy pauses for a fixed delay and
//! reports success. It never touches the ledger history.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// Default simulated recovery latency.
pub const DEFAULT_RECOVERY_DELAY: Duration = Duration::from_secs(1);

/// Capability invoked by the audit for every resource with a conflict.
#[async_trait]
pub trait RecoveryStrategy: Send + Sync {
    /// Run recovery for `resource`.
    async fn recover(&self, resource: &str) -> Result<()>;
}

/// Sleeps for a fixed duration and succeeds.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelayRecovery {
    delay: Duration,
}

impl FixedDelayRecovery {
    /// Create a strategy with the given delay
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Configured delay
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for FixedDelayRecovery {
    fn default() -> Self {
        Self::new(DEFAULT_RECOVERY_DELAY)
    }
}

#[async_trait]
impl RecoveryStrategy for FixedDelayRecovery {
    async fn recover(&self, _resource: &str) -> Result<()> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}

/// Completes immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRecovery;

#[async_trait]
impl RecoveryStrategy for NoopRecovery {
    async fn recover(&self, _resource: &str) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fixed_delay_waits_configured_duration() {
        let strategy = FixedDelayRecovery::default();
        let started = tokio::time::Instant::now();
        strategy.recover("ResourceA").await.expect("recovery succeeds");
        assert!(started.elapsed() >= DEFAULT_RECOVERY_DELAY);
    }

    #[tokio::test]
    async fn noop_completes() {
        assert!(NoopRecovery.recover("ResourceA").await.is_ok());
    }
}
