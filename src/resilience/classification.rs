//! # Failure Classification
//!
//! Errors passing through a circuit breaker are classified into a closed set of
//! kinds. A breaker's exclusion list is a set of these kinds compared by value, so
//! control-flow signals (interrupts, shutdown requests, user cancellation) can be
//! re-raised to the caller without counting against the breaker.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Closed set of failure kinds understood by the breakers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The caller cancelled the operation
    Cancelled,
    /// An interrupt signal (e.g. ctrl-c) surfaced through the operation
    Interrupted,
    /// The process or a subsystem is shutting down
    Shutdown,
    /// The operation exceeded its deadline
    Timeout,
    /// I/O or transport failure
    Io,
    /// The operation rejected its input or produced invalid data
    InvalidData,
    /// A synthetic fault raised by the fault injection subsystem
    Injected,
    /// Anything else
    Other,
}

impl FailureKind {
    /// Kinds that never count as failures unless a config says otherwise
    pub fn control_flow() -> HashSet<FailureKind> {
        [FailureKind::Interrupted, FailureKind::Shutdown]
            .into_iter()
            .collect()
    }
}

/// Maps an error value onto a [`FailureKind`]
pub trait ClassifyFailure {
    fn failure_kind(&self) -> FailureKind {
        FailureKind::Other
    }
}

impl ClassifyFailure for String {}

impl ClassifyFailure for &str {}

impl ClassifyFailure for anyhow::Error {
    fn failure_kind(&self) -> FailureKind {
        if let Some(io) = self.downcast_ref::<std::io::Error>() {
            return io.failure_kind();
        }
        FailureKind::Other
    }
}

impl ClassifyFailure for std::io::Error {
    fn failure_kind(&self) -> FailureKind {
        match self.kind() {
            std::io::ErrorKind::Interrupted => FailureKind::Interrupted,
            std::io::ErrorKind::TimedOut => FailureKind::Timeout,
            std::io::ErrorKind::InvalidData | std::io::ErrorKind::InvalidInput => {
                FailureKind::InvalidData
            }
            _ => FailureKind::Io,
        }
    }
}

impl ClassifyFailure for tokio::time::error::Elapsed {
    fn failure_kind(&self) -> FailureKind {
        FailureKind::Timeout
    }
}
