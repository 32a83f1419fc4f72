//! # Circuit Breaker Statistics
//!
//! Counters owned by a breaker. They are created with the breaker, reset only by an
//! explicit `reset()`, and never persisted.

use crate::resilience::CircuitState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Maximum number of state transitions retained per breaker
pub const MAX_STATE_CHANGES: usize = 256;

/// A single recorded state transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    pub timestamp: DateTime<Utc>,
    pub state: CircuitState,
}

/// Statistics for a single circuit breaker instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerStats {
    /// Calls that were admitted and executed
    pub total_calls: u64,

    /// Admitted calls that succeeded
    pub successful_calls: u64,

    /// Admitted calls that failed with a counted failure kind
    pub failed_calls: u64,

    /// Calls rejected by the gate without executing
    pub rejected_calls: u64,

    pub last_failure_time: Option<DateTime<Utc>>,

    pub last_success_time: Option<DateTime<Utc>>,

    /// Ordered transition log, oldest first
    pub state_changes: VecDeque<StateChange>,

    /// State at snapshot time
    pub current_state: CircuitState,

    /// Consecutive failures counted while closed
    pub failure_count: u32,

    /// Consecutive successes counted while half-open
    pub success_count: u32,
}

impl CircuitBreakerStats {
    pub fn new() -> Self {
        Self {
            total_calls: 0,
            successful_calls: 0,
            failed_calls: 0,
            rejected_calls: 0,
            last_failure_time: None,
            last_success_time: None,
            state_changes: VecDeque::new(),
            current_state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
        }
    }

    pub(crate) fn record_transition(&mut self, state: CircuitState) {
        if self.state_changes.len() >= MAX_STATE_CHANGES {
            self.state_changes.pop_front();
        }
        self.state_changes.push_back(StateChange {
            timestamp: Utc::now(),
            state,
        });
    }

    /// Failed calls over executed calls (0.0 to 1.0)
    pub fn failure_rate(&self) -> f64 {
        if self.total_calls == 0 {
            return 0.0;
        }
        self.failed_calls as f64 / self.total_calls as f64
    }

    /// Check if statistics indicate healthy operation
    pub fn is_healthy(&self) -> bool {
        match self.current_state {
            CircuitState::Closed => self.failure_rate() < 0.1 || self.total_calls < 10,
            CircuitState::Open => false,
            CircuitState::HalfOpen => true,
        }
    }

    /// Get human-readable state description
    pub fn state_description(&self) -> &'static str {
        match self.current_state {
            CircuitState::Closed => "Healthy - Normal operation",
            CircuitState::Open => "Failing - Rejecting all calls",
            CircuitState::HalfOpen => "Recovering - Testing system health",
        }
    }

    /// Format statistics for logging
    pub fn format_summary(&self) -> String {
        format!(
            "State: {} | Calls: {} | Failures: {} | Rejected: {} | Failure rate: {:.1}%",
            self.state_description(),
            self.total_calls,
            self.failed_calls,
            self.rejected_calls,
            self.failure_rate() * 100.0
        )
    }
}

impl Default for CircuitBreakerStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Count breakers by state across a set of statistics snapshots
pub fn count_by_state<'a, I>(stats: I) -> HashMap<CircuitState, usize>
where
    I: IntoIterator<Item = &'a CircuitBreakerStats>,
{
    let mut counts = HashMap::new();
    for snapshot in stats {
        *counts.entry(snapshot.current_state).or_insert(0) += 1;
    }
    counts
}
