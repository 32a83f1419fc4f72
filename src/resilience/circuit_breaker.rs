//! # Circuit Breaker Implementation
//!
//! Provides fault isolation for a single unit of work with three states:
//! Closed (normal operation), Open (failing fast), and Half-Open (probing recovery).
//!
//! Gating decisions and state transitions are serialized behind one mutex owned by the
//! breaker. The protected work always runs with the lock released, so concurrent
//! callers execute in parallel and a slow failure never blocks other callers.

use crate::logging::log_breaker_transition;
use crate::resilience::{CircuitBreakerConfig, CircuitBreakerStats, ClassifyFailure, FailureKind};
use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Circuit breaker states representing the current operational mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation - all calls are allowed through
    Closed,
    /// Failure mode - calls are rejected until the cooldown elapses
    Open,
    /// Testing recovery - a limited number of probe calls are allowed
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        };
        f.write_str(label)
    }
}

/// Errors that can occur during circuit breaker operation
#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    /// The gate rejected the call; the work was not executed
    #[error("Circuit breaker is {state} for {component}")]
    CircuitOpen {
        component: String,
        state: CircuitState,
    },

    /// The work executed and failed; the original error is preserved
    #[error("Operation failed: {0}")]
    OperationFailed(E),
}

impl<E> CircuitBreakerError<E> {
    /// Gate rejections are transient and should be retried later
    pub fn is_rejection(&self) -> bool {
        matches!(self, CircuitBreakerError::CircuitOpen { .. })
    }

    /// The underlying work error, if the work ran
    pub fn into_operation_error(self) -> Option<E> {
        match self {
            CircuitBreakerError::OperationFailed(err) => Some(err),
            CircuitBreakerError::CircuitOpen { .. } => None,
        }
    }
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    half_open_in_flight: u32,
    last_failure_at: Option<Instant>,
    stats: CircuitBreakerStats,
}

impl BreakerState {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            half_open_in_flight: 0,
            last_failure_at: None,
            stats: CircuitBreakerStats::new(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Transition {
    from: CircuitState,
    to: CircuitState,
    failure_count: u32,
}

/// Admission through the gate. Probe admissions release their half-open slot on drop,
/// which covers panicking work and cancelled futures.
struct Admission<'a> {
    breaker: &'a CircuitBreaker,
    probe: bool,
}

impl Drop for Admission<'_> {
    fn drop(&mut self) {
        if self.probe {
            let mut inner = self.breaker.inner.lock();
            inner.half_open_in_flight = inner.half_open_in_flight.saturating_sub(1);
        }
    }
}

/// Core circuit breaker
#[derive(Debug)]
pub struct CircuitBreaker {
    /// Component name for logging and statistics
    name: String,

    config: CircuitBreakerConfig,

    inner: Mutex<BreakerState>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given name and configuration
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let name = name.into();
        if let Err(reason) = config.validate() {
            warn!(component = %name, reason = %reason, "⚠️ Circuit breaker created with invalid config");
        }
        info!(
            component = %name,
            failure_threshold = config.failure_threshold,
            success_threshold = config.success_threshold,
            timeout_ms = config.timeout.as_millis() as u64,
            half_open_requests = config.half_open_requests,
            "🛡️ Circuit breaker initialized"
        );

        Self {
            name,
            config,
            inner: Mutex::new(BreakerState::new()),
        }
    }

    /// Get component name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Get current circuit state
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Consecutive failures counted while closed
    pub fn failure_count(&self) -> u32 {
        self.inner.lock().failure_count
    }

    /// Consecutive successes counted while half-open
    pub fn success_count(&self) -> u32 {
        self.inner.lock().success_count
    }

    /// Time left before an open circuit admits a probe
    pub fn retry_after(&self) -> Option<Duration> {
        let inner = self.inner.lock();
        if inner.state != CircuitState::Open {
            return None;
        }
        inner
            .last_failure_at
            .map(|at| self.config.timeout.saturating_sub(at.elapsed()))
    }

    /// Get current statistics snapshot
    pub fn stats(&self) -> CircuitBreakerStats {
        let inner = self.inner.lock();
        let mut snapshot = inner.stats.clone();
        snapshot.current_state = inner.state;
        snapshot.failure_count = inner.failure_count;
        snapshot.success_count = inner.success_count;
        snapshot
    }

    /// Check if circuit is healthy (closed state with low failure rate)
    pub fn is_healthy(&self) -> bool {
        self.stats().is_healthy()
    }

    /// Execute synchronous work with circuit breaker protection
    pub fn call<T, E, F>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Result<T, E>,
        E: ClassifyFailure,
    {
        let admission = self.admit().map_err(|state| self.rejection(state))?;
        let result = operation();
        self.settle(&result);
        drop(admission);
        result.map_err(CircuitBreakerError::OperationFailed)
    }

    /// Execute synchronous work, returning the fallback value when the gate rejects
    pub fn call_with_fallback<T, E, F, G>(&self, operation: F, fallback: G) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        G: FnOnce() -> T,
        E: ClassifyFailure,
    {
        match self.call(operation) {
            Ok(value) => Ok(value),
            Err(CircuitBreakerError::CircuitOpen { .. }) => Ok(fallback()),
            Err(CircuitBreakerError::OperationFailed(err)) => Err(err),
        }
    }

    /// Execute asynchronous work with circuit breaker protection
    pub async fn call_async<T, E, F, Fut>(
        &self,
        operation: F,
    ) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: ClassifyFailure,
    {
        let admission = self.admit().map_err(|state| self.rejection(state))?;
        let result = operation().await;
        self.settle(&result);
        drop(admission);
        result.map_err(CircuitBreakerError::OperationFailed)
    }

    /// Execute asynchronous work, returning the fallback value when the gate rejects
    pub async fn call_async_with_fallback<T, E, F, Fut, G>(
        &self,
        operation: F,
        fallback: G,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        G: FnOnce() -> T,
        E: ClassifyFailure,
    {
        match self.call_async(operation).await {
            Ok(value) => Ok(value),
            Err(CircuitBreakerError::CircuitOpen { .. }) => Ok(fallback()),
            Err(CircuitBreakerError::OperationFailed(err)) => Err(err),
        }
    }

    /// Force circuit to closed state and clear every counter
    pub fn reset(&self) {
        let previous = {
            let mut inner = self.inner.lock();
            let previous = inner.state;
            *inner = BreakerState::new();
            previous
        };
        info!(component = %self.name, previous_state = %previous, "🔄 Circuit breaker reset");
    }

    /// Force circuit to open state (for emergency situations)
    pub fn force_open(&self) {
        warn!(component = %self.name, "🚨 Circuit breaker forced open");
        let transition = {
            let mut inner = self.inner.lock();
            inner.last_failure_at = Some(Instant::now());
            if inner.state == CircuitState::Open {
                None
            } else {
                Some(self.transition(&mut inner, CircuitState::Open))
            }
        };
        if let Some(transition) = transition {
            self.after_transition(transition);
        }
    }

    /// Classify the gate for one call and reserve a probe slot when half-open
    fn admit(&self) -> Result<Admission<'_>, CircuitState> {
        let mut transition = None;
        let decision = {
            let mut inner = self.inner.lock();
            match inner.state {
                CircuitState::Closed => Ok(false),
                CircuitState::Open => {
                    let cooled_down = inner
                        .last_failure_at
                        .map_or(true, |at| at.elapsed() >= self.config.timeout);
                    if cooled_down {
                        transition = Some(self.transition(&mut inner, CircuitState::HalfOpen));
                        inner.half_open_in_flight += 1;
                        Ok(true)
                    } else {
                        inner.stats.rejected_calls += 1;
                        Err(CircuitState::Open)
                    }
                }
                CircuitState::HalfOpen => {
                    if inner.half_open_in_flight < self.config.half_open_requests {
                        inner.half_open_in_flight += 1;
                        Ok(true)
                    } else {
                        inner.stats.rejected_calls += 1;
                        Err(CircuitState::HalfOpen)
                    }
                }
            }
        };

        if let Some(transition) = transition {
            self.after_transition(transition);
        }

        decision.map(|probe| Admission {
            breaker: self,
            probe,
        })
    }

    fn rejection<E>(&self, state: CircuitState) -> CircuitBreakerError<E> {
        debug!(component = %self.name, state = %state, "⛔ Call rejected by circuit breaker");
        CircuitBreakerError::CircuitOpen {
            component: self.name.clone(),
            state,
        }
    }

    fn settle<T, E: ClassifyFailure>(&self, result: &Result<T, E>) {
        match result {
            Ok(_) => self.record_success(),
            Err(err) => self.record_failure(err.failure_kind()),
        }
    }

    /// Record a successful operation
    fn record_success(&self) {
        let transition = {
            let mut inner = self.inner.lock();
            inner.stats.total_calls += 1;
            inner.stats.successful_calls += 1;
            inner.stats.last_success_time = Some(Utc::now());

            match inner.state {
                CircuitState::Closed => {
                    inner.failure_count = 0;
                    None
                }
                CircuitState::HalfOpen => {
                    inner.success_count += 1;
                    if inner.success_count >= self.config.success_threshold {
                        Some(self.transition(&mut inner, CircuitState::Closed))
                    } else {
                        None
                    }
                }
                // A call admitted before another caller tripped the breaker
                CircuitState::Open => None,
            }
        };

        if let Some(transition) = transition {
            self.after_transition(transition);
        }
    }

    /// Record a failed operation
    fn record_failure(&self, kind: FailureKind) {
        if !self.config.counts_as_failure(kind) {
            debug!(
                component = %self.name,
                failure_kind = ?kind,
                "Excluded failure kind, not counted against breaker"
            );
            return;
        }

        let transition = {
            let mut inner = self.inner.lock();
            inner.stats.total_calls += 1;
            inner.stats.failed_calls += 1;
            inner.stats.last_failure_time = Some(Utc::now());
            inner.last_failure_at = Some(Instant::now());

            match inner.state {
                CircuitState::Closed => {
                    inner.failure_count += 1;
                    if inner.failure_count >= self.config.failure_threshold {
                        Some(self.transition(&mut inner, CircuitState::Open))
                    } else {
                        None
                    }
                }
                // Any failure while probing cancels recovery
                CircuitState::HalfOpen => Some(self.transition(&mut inner, CircuitState::Open)),
                CircuitState::Open => None,
            }
        };

        if let Some(transition) = transition {
            self.after_transition(transition);
        }
    }

    /// Apply a transition while holding the lock
    fn transition(&self, inner: &mut BreakerState, to: CircuitState) -> Transition {
        let from = inner.state;
        inner.state = to;
        match to {
            CircuitState::Closed => {
                inner.failure_count = 0;
                inner.success_count = 0;
            }
            CircuitState::Open | CircuitState::HalfOpen => {
                inner.success_count = 0;
            }
        }
        inner.stats.record_transition(to);

        Transition {
            from,
            to,
            failure_count: inner.failure_count,
        }
    }

    /// Side effects of a transition, run with the lock released
    fn after_transition(&self, transition: Transition) {
        log_breaker_transition(
            &self.name,
            transition.from,
            transition.to,
            transition.failure_count,
        );

        if transition.to == CircuitState::Open {
            if let Some(monitor) = &self.config.monitor {
                monitor.notify(&self.name, transition.from, transition.to);
            }
        }
    }
}
