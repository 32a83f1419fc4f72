//! # Resilience Module
//!
//! Fault isolation primitives: a circuit breaker state machine and an observer-chain
//! isolator built on top of it.
//!
//! ## Architecture
//!
//! - **Circuit Breakers**: gate a unit of work, failing fast while a dependency is unhealthy
//! - **Failure Classification**: control-flow errors are re-raised without counting
//! - **Statistics**: per-breaker counters and a bounded transition log
//! - **Observer Chains**: one breaker per named notification chain, with per-observer
//!   failure tracking
//!
//! ## Usage
//!
//! ```rust
//! use reliability_core::resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
//! use std::time::Duration;
//!
//! let config = CircuitBreakerConfig {
//!     failure_threshold: 2,
//!     timeout: Duration::from_secs(30),
//!     ..Default::default()
//! };
//! let breaker = CircuitBreaker::new("settings_store", config);
//!
//! let value = breaker.call_with_fallback(|| Err::<u32, _>("unavailable"), || 0);
//! assert_eq!(value, Err("unavailable"));
//!
//! let _ = breaker.call(|| Err::<u32, _>("unavailable"));
//! assert_eq!(breaker.state(), CircuitState::Open);
//!
//! // Open circuits route to the fallback without running the work
//! let value = breaker.call_with_fallback(|| Ok::<_, &str>(1), || 0);
//! assert_eq!(value, Ok(0));
//! ```

pub mod circuit_breaker;
pub mod classification;
pub mod config;
pub mod metrics;
pub mod observer_chain;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerError, CircuitState};
pub use classification::{ClassifyFailure, FailureKind};
pub use config::{CircuitBreakerConfig, StateMonitor};
pub use metrics::{count_by_state, CircuitBreakerStats, StateChange, MAX_STATE_CHANGES};
pub use observer_chain::{
    AsyncObserver, NotificationReport, Observer, ObserverChainBreaker, ObserverError,
    DEFAULT_MAX_OBSERVER_FAILURES,
};
