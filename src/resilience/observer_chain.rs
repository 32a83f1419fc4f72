//! # Observer Chain Breaker
//!
//! Protects fan-out notification from a single misbehaving listener. Each named chain
//! owns one [`CircuitBreaker`] and a per-observer consecutive-failure counter. An
//! observer that keeps failing is skipped for the lifetime of the chain; the counters
//! are dropped when the chain is reconfigured or removed.

use crate::error::{panic_message, ReliabilityError, ReliabilityResult};
use crate::events::{EventPublisher, ReliabilityEvent};
use crate::resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitBreakerStats, CircuitState,
    ClassifyFailure, FailureKind,
};
use dashmap::DashMap;
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Consecutive failures after which an observer is skipped
pub const DEFAULT_MAX_OBSERVER_FAILURES: u32 = 5;

/// Synchronous listener invoked with a borrowed payload
pub type Observer<A> = Arc<dyn Fn(&A) -> Result<(), ObserverError> + Send + Sync>;

/// Asynchronous listener; each invocation runs as its own task
pub type AsyncObserver<A> =
    Arc<dyn Fn(A) -> BoxFuture<'static, Result<(), ObserverError>> + Send + Sync>;

/// Errors raised by observers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ObserverError {
    #[error("Observer failed: {0}")]
    Failed(String),
    #[error("Observer interrupted")]
    Interrupted,
    #[error("Observer stopped for shutdown")]
    Shutdown,
    #[error("Observer panicked: {0}")]
    Panicked(String),
}

impl ObserverError {
    pub fn failed(message: impl Into<String>) -> Self {
        ObserverError::Failed(message.into())
    }
}

impl ClassifyFailure for ObserverError {
    fn failure_kind(&self) -> FailureKind {
        match self {
            ObserverError::Interrupted => FailureKind::Interrupted,
            ObserverError::Shutdown => FailureKind::Shutdown,
            ObserverError::Failed(_) | ObserverError::Panicked(_) => FailureKind::Other,
        }
    }
}

/// Outcome of a single chain notification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationReport {
    /// Observers whose callback actually ran
    pub invoked: usize,
    pub successful: usize,
    /// Counted failures (control-flow errors excluded)
    pub failed: usize,
    /// Observers skipped after too many consecutive failures
    pub skipped: usize,
    /// Observers routed to the silent fallback by an open breaker
    pub rejected: usize,
}

#[derive(Debug)]
struct ChainEntry {
    breaker: Arc<CircuitBreaker>,
    observer_failures: HashMap<usize, u32>,
    broken: bool,
}

impl ChainEntry {
    fn new(chain_id: &str, config: CircuitBreakerConfig) -> Self {
        Self {
            breaker: Arc::new(CircuitBreaker::new(chain_id, config)),
            observer_failures: HashMap::new(),
            broken: false,
        }
    }
}

/// Circuit breaking for named observer chains
#[derive(Debug)]
pub struct ObserverChainBreaker {
    chains: DashMap<String, ChainEntry>,
    default_config: CircuitBreakerConfig,
    max_observer_failures: u32,
    events: EventPublisher,
}

impl ObserverChainBreaker {
    pub fn new(events: EventPublisher) -> Self {
        Self::with_settings(
            CircuitBreakerConfig::for_observer_chain(),
            DEFAULT_MAX_OBSERVER_FAILURES,
            events,
        )
    }

    pub fn with_settings(
        default_config: CircuitBreakerConfig,
        max_observer_failures: u32,
        events: EventPublisher,
    ) -> Self {
        Self {
            chains: DashMap::new(),
            default_config,
            max_observer_failures: max_observer_failures.max(1),
            events,
        }
    }

    /// Create or replace the breaker for a chain.
    ///
    /// Without an explicit config an existing chain is left untouched and a missing one
    /// is created with the default observer-chain settings. An explicit config always
    /// installs a fresh breaker and clears the chain's per-observer counters. An
    /// invalid config is rejected and leaves the existing chain in place.
    pub fn configure_chain(
        &self,
        chain_id: &str,
        config: Option<CircuitBreakerConfig>,
    ) -> ReliabilityResult<Arc<CircuitBreaker>> {
        match config {
            Some(config) => {
                config.validate().map_err(|reason| {
                    warn!(chain_id = %chain_id, reason = %reason, "Rejected observer chain config");
                    ReliabilityError::InvalidConfiguration(format!(
                        "observer chain {chain_id}: {reason}"
                    ))
                })?;
                info!(
                    chain_id = %chain_id,
                    failure_threshold = config.failure_threshold,
                    success_threshold = config.success_threshold,
                    timeout_ms = config.timeout.as_millis() as u64,
                    "⛓️ Observer chain configured"
                );
                let entry = ChainEntry::new(chain_id, config);
                let breaker = Arc::clone(&entry.breaker);
                self.chains.insert(chain_id.to_string(), entry);
                Ok(breaker)
            }
            None => Ok(self.breaker_for(chain_id)),
        }
    }

    /// Drop a chain along with its breaker and observer counters
    pub fn remove_chain(&self, chain_id: &str) -> bool {
        self.chains.remove(chain_id).is_some()
    }

    /// Reset a chain's breaker and forget its observer failures
    pub fn reset_chain(&self, chain_id: &str) -> bool {
        match self.chains.get_mut(chain_id) {
            Some(mut entry) => {
                entry.breaker.reset();
                entry.observer_failures.clear();
                entry.broken = false;
                true
            }
            None => false,
        }
    }

    pub fn chain_state(&self, chain_id: &str) -> Option<CircuitState> {
        self.chains.get(chain_id).map(|entry| entry.breaker.state())
    }

    pub fn chain_stats(&self, chain_id: &str) -> Option<CircuitBreakerStats> {
        self.chains.get(chain_id).map(|entry| entry.breaker.stats())
    }

    pub fn breaker(&self, chain_id: &str) -> Option<Arc<CircuitBreaker>> {
        self.chains
            .get(chain_id)
            .map(|entry| Arc::clone(&entry.breaker))
    }

    /// Configured chain ids, sorted
    pub fn chain_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.chains.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Consecutive failures recorded for one observer of a chain
    pub fn observer_failures(&self, chain_id: &str, index: usize) -> u32 {
        self.chains
            .get(chain_id)
            .and_then(|entry| entry.observer_failures.get(&index).copied())
            .unwrap_or(0)
    }

    pub fn max_observer_failures(&self) -> u32 {
        self.max_observer_failures
    }

    /// Notify observers sequentially, in order, through the chain's breaker
    pub fn notify_observers<A>(
        &self,
        chain_id: &str,
        observers: &[Observer<A>],
        args: &A,
    ) -> NotificationReport {
        let breaker = self.breaker_for(chain_id);
        let state_before = breaker.state();
        let mut report = NotificationReport::default();

        for (index, observer) in observers.iter().enumerate() {
            if self.is_skipped(chain_id, index) {
                debug!(chain_id = %chain_id, observer_index = index, "Skipping disabled observer");
                report.skipped += 1;
                continue;
            }

            let outcome = breaker.call(|| {
                catch_unwind(AssertUnwindSafe(|| observer(args)))
                    .unwrap_or_else(|payload| Err(ObserverError::Panicked(panic_message(payload))))
            });
            self.settle(chain_id, &breaker, index, outcome, &mut report);
        }

        self.finish(chain_id, &breaker, state_before, &report);
        report
    }

    /// Notify observers concurrently; one task per observer, all outcomes collected
    pub async fn notify_observers_async<A>(
        &self,
        chain_id: &str,
        observers: &[AsyncObserver<A>],
        args: A,
    ) -> NotificationReport
    where
        A: Clone + Send + 'static,
    {
        let breaker = self.breaker_for(chain_id);
        let state_before = breaker.state();
        let mut report = NotificationReport::default();

        let mut pending = Vec::with_capacity(observers.len());
        for (index, observer) in observers.iter().enumerate() {
            if self.is_skipped(chain_id, index) {
                debug!(chain_id = %chain_id, observer_index = index, "Skipping disabled observer");
                report.skipped += 1;
                continue;
            }

            let task_breaker = Arc::clone(&breaker);
            let observer = Arc::clone(observer);
            let args = args.clone();
            let handle = tokio::spawn(async move {
                task_breaker
                    .call_async(move || async move {
                        let future = catch_unwind(AssertUnwindSafe(|| observer(args)))
                            .map_err(|payload| ObserverError::Panicked(panic_message(payload)))?;
                        AssertUnwindSafe(future)
                            .catch_unwind()
                            .await
                            .unwrap_or_else(|payload| {
                                Err(ObserverError::Panicked(panic_message(payload)))
                            })
                    })
                    .await
            });
            pending.push(async move { (index, handle.await) });
        }

        for (index, joined) in join_all(pending).await {
            let outcome = joined.unwrap_or_else(|join_error| {
                Err(CircuitBreakerError::OperationFailed(ObserverError::Panicked(
                    join_error.to_string(),
                )))
            });
            self.settle(chain_id, &breaker, index, outcome, &mut report);
        }

        self.finish(chain_id, &breaker, state_before, &report);
        report
    }

    fn breaker_for(&self, chain_id: &str) -> Arc<CircuitBreaker> {
        let entry = self
            .chains
            .entry(chain_id.to_string())
            .or_insert_with(|| ChainEntry::new(chain_id, self.default_config.clone()));
        Arc::clone(&entry.breaker)
    }

    fn is_skipped(&self, chain_id: &str, index: usize) -> bool {
        self.observer_failures(chain_id, index) >= self.max_observer_failures
    }

    fn settle(
        &self,
        chain_id: &str,
        breaker: &CircuitBreaker,
        index: usize,
        outcome: Result<(), CircuitBreakerError<ObserverError>>,
        report: &mut NotificationReport,
    ) {
        match outcome {
            Ok(()) => {
                report.invoked += 1;
                report.successful += 1;
                if let Some(mut entry) = self.chains.get_mut(chain_id) {
                    entry.observer_failures.remove(&index);
                }
            }
            // Silent fallback: the observer is not called while the chain is open
            Err(CircuitBreakerError::CircuitOpen { .. }) => {
                report.rejected += 1;
            }
            Err(CircuitBreakerError::OperationFailed(error)) => {
                report.invoked += 1;
                if !breaker.config().counts_as_failure(error.failure_kind()) {
                    debug!(
                        chain_id = %chain_id,
                        observer_index = index,
                        error = %error,
                        "Observer stopped by control-flow signal"
                    );
                    return;
                }

                report.failed += 1;
                let failures = match self.chains.get_mut(chain_id) {
                    Some(mut entry) => {
                        let count = entry.observer_failures.entry(index).or_insert(0);
                        *count += 1;
                        *count
                    }
                    None => 0,
                };

                if failures >= self.max_observer_failures {
                    warn!(
                        chain_id = %chain_id,
                        observer_index = index,
                        failures = failures,
                        error = %error,
                        "🚫 Observer disabled after repeated failures"
                    );
                } else {
                    warn!(
                        chain_id = %chain_id,
                        observer_index = index,
                        failures = failures,
                        error = %error,
                        "⚠️ Observer failed"
                    );
                }
            }
        }
    }

    fn finish(
        &self,
        chain_id: &str,
        breaker: &CircuitBreaker,
        state_before: CircuitState,
        report: &NotificationReport,
    ) {
        let state_after = breaker.state();
        if state_after != state_before {
            self.events.publish(ReliabilityEvent::CircuitStateChanged {
                component: chain_id.to_string(),
                from: state_before,
                to: state_after,
            });
        }

        let signal = match self.chains.get_mut(chain_id) {
            Some(mut entry) => {
                if report.failed > 0 && state_after == CircuitState::Open && !entry.broken {
                    entry.broken = true;
                    Some(ReliabilityEvent::ChainBroken {
                        chain_id: chain_id.to_string(),
                        failed: report.failed,
                    })
                } else if report.successful > 0 && state_after == CircuitState::Closed && entry.broken
                {
                    entry.broken = false;
                    Some(ReliabilityEvent::ChainRecovered {
                        chain_id: chain_id.to_string(),
                    })
                } else {
                    None
                }
            }
            None => None,
        };

        if let Some(signal) = signal {
            match &signal {
                ReliabilityEvent::ChainBroken { failed, .. } => {
                    warn!(chain_id = %chain_id, failed = failed, "💔 Observer chain broken")
                }
                _ => info!(chain_id = %chain_id, "💚 Observer chain recovered"),
            }
            self.events.publish(signal);
        }
    }
}
