//! Fault policies and the records they leave behind.

use crate::error::ReliabilityError;
use crate::resilience::{ClassifyFailure, FailureKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Kinds of synthetic fault the injector can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultType {
    NetworkDelay,
    NetworkFailure,
    ResourceExhaustion,
    Exception,
    Timeout,
    DataCorruption,
    ConcurrencyIssue,
    StateInconsistency,
    ObserverFailure,
    ConfigDrift,
}

impl FaultType {
    pub const ALL: [FaultType; 10] = [
        FaultType::NetworkDelay,
        FaultType::NetworkFailure,
        FaultType::ResourceExhaustion,
        FaultType::Exception,
        FaultType::Timeout,
        FaultType::DataCorruption,
        FaultType::ConcurrencyIssue,
        FaultType::StateInconsistency,
        FaultType::ObserverFailure,
        FaultType::ConfigDrift,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FaultType::NetworkDelay => "network_delay",
            FaultType::NetworkFailure => "network_failure",
            FaultType::ResourceExhaustion => "resource_exhaustion",
            FaultType::Exception => "exception",
            FaultType::Timeout => "timeout",
            FaultType::DataCorruption => "data_corruption",
            FaultType::ConcurrencyIssue => "concurrency_issue",
            FaultType::StateInconsistency => "state_inconsistency",
            FaultType::ObserverFailure => "observer_failure",
            FaultType::ConfigDrift => "config_drift",
        }
    }
}

impl fmt::Display for FaultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource a resource-exhaustion fault pretends to run out of
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    #[default]
    Memory,
    Disk,
    /// Burns CPU for `cpu_burn_ms` instead of failing
    Cpu,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Memory => f.write_str("memory"),
            ResourceKind::Disk => f.write_str("disk"),
            ResourceKind::Cpu => f.write_str("cpu"),
        }
    }
}

/// Tunables for the built-in injectors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaultParameters {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub resource: ResourceKind,
    pub cpu_burn_ms: u64,
    pub timeout_ms: u64,
    pub message: Option<String>,
}

impl FaultParameters {
    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms.min(self.max_delay_ms))
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms.max(self.min_delay_ms))
    }

    pub fn cpu_burn(&self) -> Duration {
        Duration::from_millis(self.cpu_burn_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for FaultParameters {
    fn default() -> Self {
        Self {
            min_delay_ms: 100,
            max_delay_ms: 1000,
            resource: ResourceKind::Memory,
            cpu_burn_ms: 100,
            timeout_ms: 1000,
            message: None,
        }
    }
}

/// Context handed to custom fault callbacks
#[derive(Debug, Clone)]
pub struct FaultContext {
    pub component: String,
    pub method: String,
    pub fault_type: FaultType,
}

/// User-supplied fault, run in place of the built-in injector
pub type CustomFault = Arc<dyn Fn(&FaultContext) -> Result<(), FaultError> + Send + Sync>;

/// Injection policy for one `component.method` pair
#[derive(Clone, Serialize, Deserialize)]
pub struct FaultConfig {
    pub fault_type: FaultType,
    /// Per-call injection probability in `[0.0, 1.0]`
    pub probability: f64,
    #[serde(default)]
    pub parameters: FaultParameters,
    #[serde(skip)]
    pub custom: Option<CustomFault>,
}

impl FaultConfig {
    /// Probability is clamped into `[0.0, 1.0]`; NaN becomes 0.
    pub fn new(fault_type: FaultType, probability: f64) -> Self {
        Self {
            fault_type,
            probability: clamp_probability(probability),
            parameters: FaultParameters::default(),
            custom: None,
        }
    }

    pub fn with_parameters(mut self, parameters: FaultParameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_delay_range(mut self, min: Duration, max: Duration) -> Self {
        self.parameters.min_delay_ms = min.as_millis() as u64;
        self.parameters.max_delay_ms = max.as_millis() as u64;
        self
    }

    pub fn with_resource(mut self, resource: ResourceKind) -> Self {
        self.parameters.resource = resource;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.parameters.timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.parameters.message = Some(message.into());
        self
    }

    pub fn with_custom<F>(mut self, fault: F) -> Self
    where
        F: Fn(&FaultContext) -> Result<(), FaultError> + Send + Sync + 'static,
    {
        self.custom = Some(Arc::new(fault));
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.probability) {
            return Err(format!(
                "probability must be within [0.0, 1.0], got {}",
                self.probability
            ));
        }
        if self.parameters.min_delay_ms > self.parameters.max_delay_ms {
            return Err("min_delay_ms must not exceed max_delay_ms".to_string());
        }
        Ok(())
    }
}

impl fmt::Debug for FaultConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaultConfig")
            .field("fault_type", &self.fault_type)
            .field("probability", &self.probability)
            .field("parameters", &self.parameters)
            .field("custom", &self.custom.is_some())
            .finish()
    }
}

fn clamp_probability(probability: f64) -> f64 {
    if probability.is_nan() {
        0.0
    } else {
        probability.clamp(0.0, 1.0)
    }
}

/// Errors raised by injected faults
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FaultError {
    #[error("Injected network failure: {0}")]
    NetworkFailure(String),
    #[error("Injected {resource} exhaustion: {message}")]
    ResourceExhausted {
        resource: ResourceKind,
        message: String,
    },
    #[error("Injected timeout after {0:?}")]
    Timeout(Duration),
    #[error("Injected exception: {0}")]
    Exception(String),
    #[error("Injected state inconsistency: {0}")]
    StateInconsistency(String),
    #[error("Injected observer failure: {0}")]
    ObserverFailure(String),
    #[error("Injected configuration drift: {0}")]
    ConfigDrift(String),
    #[error("Custom fault: {0}")]
    Custom(String),
}

impl ClassifyFailure for FaultError {
    fn failure_kind(&self) -> FailureKind {
        FailureKind::Injected
    }
}

impl From<FaultError> for ReliabilityError {
    fn from(error: FaultError) -> Self {
        ReliabilityError::FaultInjected(error.to_string())
    }
}

/// Record of one fired injection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaultEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub component: String,
    pub method: String,
    pub fault_type: FaultType,
    /// Human-readable effect of the fault
    pub impact: String,
    /// Time from injection until the guarded work finished
    pub recovery_time_ms: f64,
    pub error: Option<String>,
}
