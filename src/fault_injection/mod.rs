//! # Fault Injection
//!
//! Synthetic faults for resilience testing, keyed by `component.method`.
//!
//! ```rust
//! use reliability_core::events::EventPublisher;
//! use reliability_core::fault_injection::{FaultConfig, FaultInjectionManager, FaultType};
//!
//! let manager = FaultInjectionManager::new(EventPublisher::default());
//! manager.enable(true);
//! manager
//!     .configure_fault("rules", "evaluate", FaultConfig::new(FaultType::Exception, 1.0))
//!     .unwrap();
//!
//! let mut scope = manager.scope("rules", "evaluate");
//! if let Some(injector) = scope.injector_mut() {
//!     assert!(injector.exception().is_err());
//! }
//! drop(scope);
//! assert_eq!(manager.events().len(), 1);
//! ```

pub mod config;
pub mod injector;
pub mod manager;
pub mod scenarios;

pub use config::{
    CustomFault, FaultConfig, FaultContext, FaultError, FaultEvent, FaultParameters, FaultType,
    ResourceKind,
};
pub use injector::{FaultInjector, DUPLICATE_EXECUTION_PROBABILITY};
pub use manager::{FaultInjectionManager, FaultScope, FaultStatistics};
pub use scenarios::{FaultScenario, FaultScenarios, ScenarioFault};
