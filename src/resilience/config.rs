//! # Circuit Breaker Configuration
//!
//! Configuration for a single circuit breaker. For the file-backed, per-chain
//! configuration see `crate::config::CircuitBreakerComponentConfig`, which converts into
//! this type.

use crate::resilience::{CircuitState, FailureKind};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Callback invoked whenever a breaker transitions into the open state.
///
/// Receives the breaker name, the state it left and the state it entered.
#[derive(Clone)]
pub struct StateMonitor(Arc<dyn Fn(&str, CircuitState, CircuitState) + Send + Sync>);

impl StateMonitor {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&str, CircuitState, CircuitState) + Send + Sync + 'static,
    {
        Self(Arc::new(callback))
    }

    pub(crate) fn notify(&self, name: &str, from: CircuitState, to: CircuitState) {
        (self.0)(name, from, to)
    }
}

impl fmt::Debug for StateMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StateMonitor(<callback>)")
    }
}

/// Configuration for a single circuit breaker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before opening circuit
    pub failure_threshold: u32,

    /// Number of successful calls in half-open state to close circuit
    pub success_threshold: u32,

    /// Time to wait after the last failure before probing recovery
    pub timeout: Duration,

    /// Maximum concurrent probe calls while half-open
    pub half_open_requests: u32,

    /// Failure kinds that are re-raised without counting against the breaker
    pub excluded_failures: HashSet<FailureKind>,

    /// Optional callback fired on every transition into the open state
    #[serde(skip)]
    pub monitor: Option<StateMonitor>,
}

impl CircuitBreakerConfig {
    /// Configuration used for observer chains that were not configured explicitly
    pub fn for_observer_chain() -> Self {
        Self {
            failure_threshold: 3,
            success_threshold: 2,
            timeout: Duration::from_secs(30),
            half_open_requests: 1,
            ..Default::default()
        }
    }

    /// Builder-style helper for the timeout expressed in (fractional) seconds
    pub fn with_timeout_secs(mut self, seconds: f64) -> Self {
        self.timeout = Duration::from_secs_f64(seconds.max(0.0));
        self
    }

    /// Attach a transition monitor
    pub fn with_monitor(mut self, monitor: StateMonitor) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Whether a failure of this kind counts against the breaker
    pub fn counts_as_failure(&self, kind: FailureKind) -> bool {
        !self.excluded_failures.contains(&kind)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.failure_threshold == 0 {
            return Err("failure_threshold must be greater than 0".to_string());
        }

        if self.failure_threshold > 100 {
            return Err("failure_threshold should not exceed 100".to_string());
        }

        if self.timeout.is_zero() {
            return Err("timeout must be greater than 0".to_string());
        }

        if self.timeout > Duration::from_secs(3600) {
            return Err("timeout should not exceed 3600 seconds".to_string());
        }

        if self.success_threshold == 0 {
            return Err("success_threshold must be greater than 0".to_string());
        }

        if self.success_threshold > 50 {
            return Err("success_threshold should not exceed 50".to_string());
        }

        if self.half_open_requests == 0 {
            return Err("half_open_requests must be greater than 0".to_string());
        }

        Ok(())
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            timeout: Duration::from_secs(60),
            half_open_requests: 1,
            excluded_failures: FailureKind::control_flow(),
            monitor: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circuit_breaker_config_validation() {
        let valid_config = CircuitBreakerConfig::default();
        assert!(valid_config.validate().is_ok());

        let mut invalid_config = CircuitBreakerConfig {
            failure_threshold: 0,
            ..Default::default()
        };
        assert!(invalid_config.validate().is_err());

        invalid_config = CircuitBreakerConfig {
            timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(invalid_config.validate().is_err());

        invalid_config = CircuitBreakerConfig {
            half_open_requests: 0,
            ..Default::default()
        };
        assert!(invalid_config.validate().is_err());
    }

    #[test]
    fn test_observer_chain_preset() {
        let config = CircuitBreakerConfig::for_observer_chain();
        assert_eq!(config.failure_threshold, 3);
        assert_eq!(config.success_threshold, 2);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.half_open_requests, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_excluded_failures() {
        let config = CircuitBreakerConfig::default();
        assert!(!config.counts_as_failure(FailureKind::Interrupted));
        assert!(config.counts_as_failure(FailureKind::Io));
    }

    #[test]
    fn test_fractional_timeout() {
        let config = CircuitBreakerConfig::default().with_timeout_secs(0.25);
        assert_eq!(config.timeout, Duration::from_millis(250));
    }
}
