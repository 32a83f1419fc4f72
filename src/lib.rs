#![allow(clippy::doc_markdown)] // Allow technical terms in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Reliability Core
//!
//! Fault isolation and observability for applications built around callback chains.
//!
//! ## Overview
//!
//! The crate bundles five cooperating subsystems behind one application-lifetime
//! context, [`ReliabilityManager`]:
//!
//! - [`resilience`] - Circuit breaker state machine and the observer-chain isolator built on it
//! - [`health`] - Component health checks, metric anomaly detection, recovery actions and SLA figures
//! - [`telemetry`] - Bounded tracking of configuration access, changes, performance and errors
//! - [`fault_injection`] - Probabilistic synthetic faults for resilience testing
//! - [`manager`] - Wiring of all of the above with default chains and checks
//!
//! Supporting modules:
//!
//! - [`config`] - Layered configuration loading and validation
//! - [`events`] - Broadcast bus for reliability signals
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup and domain log helpers
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use reliability_core::{ReliabilityManager, Observer, ObserverError};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! reliability_core::logging::init_structured_logging();
//! let manager = ReliabilityManager::new().await?;
//!
//! let observers: Vec<Observer<String>> = vec![Arc::new(|value: &String| -> Result<(), ObserverError> {
//!     println!("updated: {value}");
//!     Ok(())
//! })];
//! let report = manager.notify_observers_safely("ui_updates", &observers, &"theme".to_string());
//! assert_eq!(report.successful, 1);
//!
//! println!("{:?}", manager.get_system_health().overall_status);
//! manager.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod fault_injection;
pub mod health;
pub mod logging;
pub mod manager;
pub mod resilience;
pub mod telemetry;

pub use config::{ConfigManager, ConfigurationError, ReliabilityConfig};
pub use error::{ReliabilityError, ReliabilityResult};
pub use events::{EventPublisher, PublishedEvent, ReliabilityEvent};
pub use fault_injection::{
    FaultConfig, FaultError, FaultEvent, FaultInjectionManager, FaultInjector, FaultScenarios,
    FaultScope, FaultType,
};
pub use health::{
    AnomalyLevel, HealthCheck, HealthMetric, HealthMonitor, HealthProbe, HealthStatus, MetricType,
};
pub use manager::{ReliabilityManager, SystemHealth, SystemMetrics};
pub use resilience::{
    AsyncObserver, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitState,
    NotificationReport, Observer, ObserverChainBreaker, ObserverError,
};
pub use telemetry::{ConfigurationTelemetry, ExportFormat, TelemetryEvent, TelemetryReport};
