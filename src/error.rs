//! Error types for the reliability core.

use crate::config::ConfigurationError;
use crate::resilience::{ClassifyFailure, FailureKind};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReliabilityError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Component not found: {0}")]
    ComponentNotFound(String),
    #[error("Health check not found: {check} on {component}")]
    HealthCheckNotFound { component: String, check: String },
    #[error("Circuit breaker open: {0}")]
    CircuitOpen(String),
    #[error("Timeout error: {0}")]
    Timeout(String),
    #[error("Health check failed: {0}")]
    HealthCheckFailed(String),
    #[error("Telemetry error: {0}")]
    TelemetryError(String),
    #[error("Export error: {0}")]
    ExportError(String),
    #[error("Fault injected: {0}")]
    FaultInjected(String),
    #[error("No async runtime available: {0}")]
    RuntimeUnavailable(String),
    #[error("Operation interrupted: {0}")]
    Interrupted(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for ReliabilityError {
    fn from(error: serde_json::Error) -> Self {
        ReliabilityError::ExportError(format!("JSON serialization error: {error}"))
    }
}

impl From<std::io::Error> for ReliabilityError {
    fn from(error: std::io::Error) -> Self {
        ReliabilityError::ExportError(format!("I/O error: {error}"))
    }
}

impl From<ConfigurationError> for ReliabilityError {
    fn from(error: ConfigurationError) -> Self {
        ReliabilityError::ConfigurationError(error.to_string())
    }
}

impl ClassifyFailure for ReliabilityError {
    fn failure_kind(&self) -> FailureKind {
        match self {
            ReliabilityError::Timeout(_) => FailureKind::Timeout,
            ReliabilityError::Interrupted(_) => FailureKind::Interrupted,
            ReliabilityError::FaultInjected(_) => FailureKind::Injected,
            ReliabilityError::ExportError(_) => FailureKind::Io,
            ReliabilityError::ConfigurationError(_) | ReliabilityError::InvalidConfiguration(_) => {
                FailureKind::InvalidData
            }
            _ => FailureKind::Other,
        }
    }
}

pub type ReliabilityResult<T> = std::result::Result<T, ReliabilityError>;

/// Best-effort text of a caught panic payload
pub(crate) fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ReliabilityError::ComponentNotFound("config_manager".to_string());
        assert_eq!(err.to_string(), "Component not found: config_manager");

        let err = ReliabilityError::HealthCheckNotFound {
            component: "x".to_string(),
            check: "ping".to_string(),
        };
        assert_eq!(err.to_string(), "Health check not found: ping on x");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ReliabilityError = io.into();
        assert!(matches!(err, ReliabilityError::ExportError(msg) if msg.contains("denied")));
    }

    #[test]
    fn test_panic_message_extraction() {
        let caught = std::panic::catch_unwind(|| panic!("listener bug")).unwrap_err();
        assert_eq!(panic_message(caught), "listener bug");

        let caught = std::panic::catch_unwind(|| panic!("{} failed", "probe")).unwrap_err();
        assert_eq!(panic_message(caught), "probe failed");
    }

    #[test]
    fn test_failure_classification() {
        assert_eq!(
            ReliabilityError::Interrupted("ctrl-c".into()).failure_kind(),
            FailureKind::Interrupted
        );
        assert_eq!(
            ReliabilityError::Timeout("slow".into()).failure_kind(),
            FailureKind::Timeout
        );
        assert_eq!(
            ReliabilityError::Internal("boom".into()).failure_kind(),
            FailureKind::Other
        );
    }
}
