//! # Reliability Configuration System
//!
//! Typed configuration for every reliability subsystem, loaded in layers by
//! [`ConfigManager`]:
//!
//! 1. `reliability.{yaml,yml,toml,json}` in the configuration directory
//! 2. `reliability.{environment}.{yaml,yml,toml,json}` overrides
//! 3. `RELIABILITY__SECTION__FIELD` environment variables
//!
//! Every section falls back to built-in defaults, so an empty directory yields a usable
//! configuration. Invalid values are rejected by [`ReliabilityConfig::validate`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use reliability_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let telemetry_enabled = manager.config().telemetry.enabled;
//! let ui_chain = manager.config().circuit_breakers.config_for("ui_updates");
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use crate::health::{MetricThreshold, MetricType};
use crate::resilience::{CircuitBreakerConfig, FailureKind};
use crate::telemetry::ExportFormat;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Names of the chains the reliability manager pre-configures
pub const UI_UPDATES_CHAIN: &str = "ui_updates";
pub const CONFIG_CHANGES_CHAIN: &str = "config_changes";
pub const PARAMETER_SYNC_CHAIN: &str = "parameter_sync";

/// Root configuration structure mirroring reliability.yaml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReliabilityConfig {
    /// Circuit breaker settings for observer chains
    pub circuit_breakers: CircuitBreakersConfig,

    /// Observer isolation settings
    pub observer_chains: ObserverChainsConfig,

    /// Health monitoring configuration
    pub health: HealthConfig,

    /// Configuration telemetry settings
    pub telemetry: TelemetryConfig,

    /// Fault injection settings (disabled unless explicitly enabled)
    pub fault_injection: FaultInjectionConfig,
}

impl ReliabilityConfig {
    /// Validate every section, reporting the first offending field
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.circuit_breakers.validate()?;
        self.observer_chains.validate()?;
        self.health.validate()?;
        self.telemetry.validate()?;
        self.fault_injection.validate()?;
        Ok(())
    }
}

/// File-backed settings for one circuit breaker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerComponentConfig {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    /// Cooldown before probing recovery, in (fractional) seconds
    pub timeout_seconds: f64,
    pub half_open_requests: u32,
    /// Failure kinds re-raised without counting against the breaker
    pub excluded_failure_kinds: Vec<FailureKind>,
}

impl CircuitBreakerComponentConfig {
    pub fn new(
        failure_threshold: u32,
        success_threshold: u32,
        timeout_seconds: f64,
        half_open_requests: u32,
    ) -> Self {
        Self {
            failure_threshold,
            success_threshold,
            timeout_seconds,
            half_open_requests,
            ..Default::default()
        }
    }

    /// Convert to the runtime breaker configuration
    pub fn to_resilience_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            success_threshold: self.success_threshold,
            timeout: Duration::from_secs_f64(self.timeout_seconds.max(0.0)),
            half_open_requests: self.half_open_requests,
            excluded_failures: self.excluded_failure_kinds.iter().copied().collect(),
            monitor: None,
        }
    }

    fn validate(&self, field: &str) -> Result<(), ConfigurationError> {
        if !self.timeout_seconds.is_finite() || self.timeout_seconds <= 0.0 {
            return Err(ConfigurationError::invalid_value(
                format!("{field}.timeout_seconds"),
                self.timeout_seconds.to_string(),
                "timeout must be a positive number of seconds",
            ));
        }

        self.to_resilience_config()
            .validate()
            .map_err(|reason| ConfigurationError::invalid_value(field, format!("{self:?}"), reason))
    }
}

impl Default for CircuitBreakerComponentConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            success_threshold: 2,
            timeout_seconds: 30.0,
            half_open_requests: 1,
            excluded_failure_kinds: FailureKind::control_flow().into_iter().collect(),
        }
    }
}

/// Circuit breaker configuration for named observer chains
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakersConfig {
    /// Settings for chains without an explicit entry
    pub default_chain: CircuitBreakerComponentConfig,

    /// Per-chain settings
    pub chains: HashMap<String, CircuitBreakerComponentConfig>,
}

impl CircuitBreakersConfig {
    /// Settings for a chain, falling back to the default chain settings
    pub fn config_for(&self, chain_id: &str) -> &CircuitBreakerComponentConfig {
        self.chains.get(chain_id).unwrap_or(&self.default_chain)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.default_chain
            .validate("circuit_breakers.default_chain")?;
        for (name, chain) in &self.chains {
            chain.validate(&format!("circuit_breakers.chains.{name}"))?;
        }
        Ok(())
    }
}

impl Default for CircuitBreakersConfig {
    fn default() -> Self {
        let chains = [
            (UI_UPDATES_CHAIN, CircuitBreakerComponentConfig::new(5, 2, 10.0, 1)),
            (CONFIG_CHANGES_CHAIN, CircuitBreakerComponentConfig::new(3, 2, 30.0, 1)),
            (PARAMETER_SYNC_CHAIN, CircuitBreakerComponentConfig::new(3, 1, 15.0, 2)),
        ]
        .into_iter()
        .map(|(name, config)| (name.to_string(), config))
        .collect();

        Self {
            default_chain: CircuitBreakerComponentConfig::default(),
            chains,
        }
    }
}

/// Observer isolation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserverChainsConfig {
    /// Consecutive failures after which an observer is skipped
    pub max_observer_failures: u32,
}

impl ObserverChainsConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.max_observer_failures == 0 {
            return Err(ConfigurationError::invalid_value(
                "observer_chains.max_observer_failures",
                "0",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

impl Default for ObserverChainsConfig {
    fn default() -> Self {
        Self {
            max_observer_failures: 5,
        }
    }
}

/// Health monitoring configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Samples retained per metric type per component
    pub history_size: usize,

    /// Trailing window averaged when recomputing health
    pub evaluation_window_seconds: u64,

    /// Status transitions retained for SLA computation
    pub status_history_size: usize,

    pub default_check_interval_seconds: f64,
    pub default_check_timeout_seconds: f64,
    pub default_failure_threshold: u32,
    pub default_recovery_threshold: u32,

    /// Overrides applied on top of the built-in anomaly thresholds
    pub thresholds: BTreeMap<MetricType, MetricThreshold>,
}

impl HealthConfig {
    pub fn evaluation_window(&self) -> Duration {
        Duration::from_secs(self.evaluation_window_seconds)
    }

    pub fn default_check_interval(&self) -> Duration {
        Duration::from_secs_f64(self.default_check_interval_seconds.max(0.0))
    }

    pub fn default_check_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.default_check_timeout_seconds.max(0.0))
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.history_size == 0 {
            return Err(ConfigurationError::invalid_value(
                "health.history_size",
                "0",
                "history size must be greater than 0",
            ));
        }

        if self.evaluation_window_seconds == 0 {
            return Err(ConfigurationError::invalid_value(
                "health.evaluation_window_seconds",
                "0",
                "evaluation window must be greater than 0",
            ));
        }

        if self.status_history_size == 0 {
            return Err(ConfigurationError::invalid_value(
                "health.status_history_size",
                "0",
                "status history size must be greater than 0",
            ));
        }

        for (field, value) in [
            (
                "health.default_check_interval_seconds",
                self.default_check_interval_seconds,
            ),
            (
                "health.default_check_timeout_seconds",
                self.default_check_timeout_seconds,
            ),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigurationError::invalid_value(
                    field,
                    value.to_string(),
                    "must be a positive number of seconds",
                ));
            }
        }

        if self.default_failure_threshold == 0 || self.default_recovery_threshold == 0 {
            return Err(ConfigurationError::invalid_value(
                "health.default_failure_threshold",
                format!(
                    "{}/{}",
                    self.default_failure_threshold, self.default_recovery_threshold
                ),
                "failure and recovery thresholds must be greater than 0",
            ));
        }

        for (metric_type, threshold) in &self.thresholds {
            if threshold.warning > threshold.critical {
                return Err(ConfigurationError::invalid_value(
                    format!("health.thresholds.{metric_type}"),
                    format!("{}/{}", threshold.warning, threshold.critical),
                    "warning threshold must not exceed critical threshold",
                ));
            }
        }

        Ok(())
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            history_size: 1000,
            evaluation_window_seconds: 300,
            status_history_size: 1000,
            default_check_interval_seconds: 30.0,
            default_check_timeout_seconds: 5.0,
            default_failure_threshold: 3,
            default_recovery_threshold: 1,
            thresholds: BTreeMap::new(),
        }
    }
}

/// Configuration telemetry settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub enabled: bool,

    /// Capacity of the shared event ring buffer
    pub buffer_size: usize,

    pub access_history_per_path: usize,
    pub change_history_per_path: usize,
    pub performance_samples_per_operation: usize,

    /// Access rate (per minute, over 5 minutes) flagged as a spike
    pub spike_threshold_per_minute: f64,

    /// Errors over accesses flagged as a high error rate
    pub error_rate_threshold: f64,

    /// Changes to one path within the window that trigger a warning
    pub frequent_change_threshold: usize,
    pub frequent_change_window_seconds: u64,

    /// Where collected events are written on shutdown
    pub export_path: Option<PathBuf>,
    pub export_format: ExportFormat,
}

/// Upper bound for the frequent-change detection window (one day)
pub const MAX_FREQUENT_CHANGE_WINDOW_SECONDS: u64 = 86_400;

impl TelemetryConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (field, value) in [
            ("telemetry.buffer_size", self.buffer_size),
            ("telemetry.access_history_per_path", self.access_history_per_path),
            ("telemetry.change_history_per_path", self.change_history_per_path),
            (
                "telemetry.performance_samples_per_operation",
                self.performance_samples_per_operation,
            ),
        ] {
            if value == 0 {
                return Err(ConfigurationError::invalid_value(
                    field,
                    "0",
                    "capacity must be greater than 0",
                ));
            }
        }

        if !(0.0..=1.0).contains(&self.error_rate_threshold) {
            return Err(ConfigurationError::invalid_value(
                "telemetry.error_rate_threshold",
                self.error_rate_threshold.to_string(),
                "must be between 0.0 and 1.0",
            ));
        }

        if !self.spike_threshold_per_minute.is_finite() || self.spike_threshold_per_minute <= 0.0 {
            return Err(ConfigurationError::invalid_value(
                "telemetry.spike_threshold_per_minute",
                self.spike_threshold_per_minute.to_string(),
                "must be a positive rate",
            ));
        }

        if self.frequent_change_window_seconds == 0
            || self.frequent_change_window_seconds > MAX_FREQUENT_CHANGE_WINDOW_SECONDS
        {
            return Err(ConfigurationError::invalid_value(
                "telemetry.frequent_change_window_seconds",
                self.frequent_change_window_seconds.to_string(),
                format!("must be between 1 and {MAX_FREQUENT_CHANGE_WINDOW_SECONDS} seconds"),
            ));
        }

        Ok(())
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            buffer_size: 10_000,
            access_history_per_path: 1000,
            change_history_per_path: 100,
            performance_samples_per_operation: 1000,
            spike_threshold_per_minute: 100.0,
            error_rate_threshold: 0.10,
            frequent_change_threshold: 10,
            frequent_change_window_seconds: 60,
            export_path: None,
            export_format: ExportFormat::JsonLines,
        }
    }
}

/// Fault injection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaultInjectionConfig {
    pub enabled: bool,

    /// Scenario bundles loaded when fault injection is enabled
    pub scenarios: Vec<String>,

    /// Seed for reproducible chaos runs
    pub seed: Option<u64>,

    /// Fault events retained for statistics
    pub max_events: usize,
}

impl FaultInjectionConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.max_events == 0 {
            return Err(ConfigurationError::invalid_value(
                "fault_injection.max_events",
                "0",
                "must be greater than 0",
            ));
        }

        for scenario in &self.scenarios {
            if !crate::fault_injection::FaultScenarios::names().contains(&scenario.as_str()) {
                return Err(ConfigurationError::invalid_value(
                    "fault_injection.scenarios",
                    scenario.clone(),
                    "unknown fault scenario",
                ));
            }
        }

        Ok(())
    }
}

impl Default for FaultInjectionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            scenarios: crate::fault_injection::FaultScenarios::names()
                .iter()
                .map(|name| name.to_string())
                .collect(),
            seed: None,
            max_events: 10_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ReliabilityConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.telemetry.enabled);
        assert!(!config.fault_injection.enabled);
        assert_eq!(config.observer_chains.max_observer_failures, 5);
    }

    #[test]
    fn test_named_chain_defaults() {
        let breakers = CircuitBreakersConfig::default();

        let ui = breakers.config_for(UI_UPDATES_CHAIN);
        assert_eq!((ui.failure_threshold, ui.success_threshold), (5, 2));
        assert_eq!(ui.timeout_seconds, 10.0);

        let sync = breakers.config_for(PARAMETER_SYNC_CHAIN);
        assert_eq!(sync.half_open_requests, 2);

        let unknown = breakers.config_for("something_else");
        assert_eq!(unknown, &breakers.default_chain);
    }

    #[test]
    fn test_component_config_conversion() {
        let config = CircuitBreakerComponentConfig::new(3, 1, 15.5, 2).to_resilience_config();
        assert_eq!(config.timeout, Duration::from_millis(15_500));
        assert_eq!(config.half_open_requests, 2);
        assert!(!config.counts_as_failure(FailureKind::Shutdown));
    }

    #[test]
    fn test_invalid_values_name_the_field() {
        let mut config = ReliabilityConfig::default();
        config.telemetry.buffer_size = 0;
        match config.validate() {
            Err(ConfigurationError::InvalidValue { field, .. }) => {
                assert_eq!(field, "telemetry.buffer_size")
            }
            other => panic!("expected invalid value, got {other:?}"),
        }

        let mut config = ReliabilityConfig::default();
        config
            .circuit_breakers
            .chains
            .insert("broken".to_string(), CircuitBreakerComponentConfig::new(0, 1, 1.0, 1));
        assert!(config.validate().is_err());

        let mut config = ReliabilityConfig::default();
        config.fault_injection.scenarios = vec!["not_a_scenario".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_frequent_change_window_is_bounded() {
        for window in [0, MAX_FREQUENT_CHANGE_WINDOW_SECONDS + 1, u64::MAX] {
            let mut config = ReliabilityConfig::default();
            config.telemetry.frequent_change_window_seconds = window;
            match config.validate() {
                Err(ConfigurationError::InvalidValue { field, .. }) => {
                    assert_eq!(field, "telemetry.frequent_change_window_seconds")
                }
                other => panic!("expected invalid value for {window}, got {other:?}"),
            }
        }

        let mut config = ReliabilityConfig::default();
        config.telemetry.frequent_change_window_seconds = MAX_FREQUENT_CHANGE_WINDOW_SECONDS;
        assert!(config.validate().is_ok());
    }
}
