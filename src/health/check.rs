//! Declarative health checks.

use crate::health::AnomalyLevel;
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// A health probe. `Ok(true)` passes; `Ok(false)` or an error fails the check.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self) -> anyhow::Result<bool>;
}

#[async_trait]
impl<F, Fut> HealthProbe for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
{
    async fn probe(&self) -> anyhow::Result<bool> {
        (self)().await
    }
}

/// A named probe with its own schedule, deadline and thresholds
#[derive(Clone)]
pub struct HealthCheck {
    pub name: String,
    pub probe: Arc<dyn HealthProbe>,
    /// Time between scheduled runs; the first run happens one interval after registration
    pub interval: Duration,
    /// Deadline for a single probe run; overrunning counts as a failure
    pub timeout: Duration,
    /// Consecutive failures before the component is marked unhealthy
    pub failure_threshold: u32,
    /// Consecutive passes before the check's issue is cleared
    pub recovery_threshold: u32,
    pub severity: AnomalyLevel,
}

impl HealthCheck {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new<P>(name: impl Into<String>, probe: P) -> Self
    where
        P: HealthProbe + 'static,
    {
        Self {
            name: name.into(),
            probe: Arc::new(probe),
            interval: Self::DEFAULT_INTERVAL,
            timeout: Self::DEFAULT_TIMEOUT,
            failure_threshold: 3,
            recovery_threshold: 1,
            severity: AnomalyLevel::Warning,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    pub fn with_recovery_threshold(mut self, threshold: u32) -> Self {
        self.recovery_threshold = threshold.max(1);
        self
    }

    pub fn with_severity(mut self, severity: AnomalyLevel) -> Self {
        self.severity = severity;
        self
    }
}

impl fmt::Debug for HealthCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HealthCheck")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .field("timeout", &self.timeout)
            .field("failure_threshold", &self.failure_threshold)
            .field("recovery_threshold", &self.recovery_threshold)
            .field("severity", &self.severity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysUp;

    #[async_trait]
    impl HealthProbe for AlwaysUp {
        async fn probe(&self) -> anyhow::Result<bool> {
            Ok(true)
        }
    }

    #[tokio::test]
    async fn test_closures_are_probes() {
        let check = HealthCheck::new("ping", || async { Ok::<_, anyhow::Error>(false) });
        assert!(!check.probe.probe().await.unwrap());

        let check = HealthCheck::new("struct", AlwaysUp);
        assert!(check.probe.probe().await.unwrap());
    }

    #[test]
    fn test_builder_clamps_thresholds() {
        let check = HealthCheck::new("ping", AlwaysUp)
            .with_failure_threshold(0)
            .with_recovery_threshold(0)
            .with_interval(Duration::ZERO);
        assert_eq!(check.failure_threshold, 1);
        assert_eq!(check.recovery_threshold, 1);
        assert!(!check.interval.is_zero());
    }
}
