//! # Structured Logging Module
//!
//! Environment-aware structured logging for the reliability core. Console output is
//! human readable by default; set `RELIABILITY_LOG_FORMAT=json` for JSON lines.

use crate::health::HealthStatus;
use crate::resilience::CircuitState;
use chrono::Utc;
use std::io::IsTerminal;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = get_log_level(&environment);
        let json = wants_json_output();

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));

        let console_layer = if json {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .json()
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(std::io::stdout().is_terminal())
                .boxed()
        };

        let subscriber = tracing_subscriber::registry().with(console_layer.with_filter(filter));

        // Use try_init to avoid panic if global subscriber already set
        if subscriber.try_init().is_err() {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        }

        tracing::info!(
            pid = std::process::id(),
            environment = %environment,
            json = json,
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Get current environment from environment variables
pub(crate) fn get_environment() -> String {
    std::env::var("RELIABILITY_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> String {
    match environment {
        "test" => "debug".to_string(),
        "development" => "debug".to_string(),
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

fn wants_json_output() -> bool {
    std::env::var("RELIABILITY_LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Log a circuit breaker state transition
pub fn log_breaker_transition(
    component: &str,
    from: CircuitState,
    to: CircuitState,
    failure_count: u32,
) {
    match to {
        CircuitState::Open => tracing::error!(
            component = %component,
            from = %from,
            to = %to,
            failure_count = failure_count,
            "🔴 Circuit breaker opened"
        ),
        CircuitState::HalfOpen => tracing::info!(
            component = %component,
            from = %from,
            to = %to,
            "🟡 Circuit breaker half-open (testing recovery)"
        ),
        CircuitState::Closed => tracing::info!(
            component = %component,
            from = %from,
            to = %to,
            "🟢 Circuit breaker closed (recovered)"
        ),
    }
}

/// Log a component health status transition
pub fn log_health_transition(component: &str, old: HealthStatus, new: HealthStatus) {
    if new.severity() > old.severity() {
        tracing::warn!(
            component = %component,
            old_status = %old,
            new_status = %new,
            timestamp = %Utc::now().to_rfc3339(),
            "🩺 HEALTH_TRANSITION"
        );
    } else {
        tracing::info!(
            component = %component,
            old_status = %old,
            new_status = %new,
            timestamp = %Utc::now().to_rfc3339(),
            "🩺 HEALTH_TRANSITION"
        );
    }
}

/// Log an injected fault
pub fn log_fault_event(
    component: &str,
    method: &str,
    fault_type: &str,
    recovery_time_ms: f64,
    error: Option<&str>,
) {
    tracing::warn!(
        component = %component,
        method = %method,
        fault_type = %fault_type,
        recovery_time_ms = recovery_time_ms,
        error = error,
        timestamp = %Utc::now().to_rfc3339(),
        "💥 FAULT_INJECTED"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "❌ ERROR"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_detection() {
        std::env::set_var("RELIABILITY_ENV", "test_override");
        let env = get_environment();
        assert_eq!(env, "test_override");
        std::env::remove_var("RELIABILITY_ENV");
    }

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(get_log_level("test"), "debug");
        assert_eq!(get_log_level("development"), "debug");
        assert_eq!(get_log_level("production"), "info");
        assert_eq!(get_log_level("unknown"), "debug");
    }

    #[test]
    fn test_init_is_idempotent() {
        init_structured_logging();
        init_structured_logging();
        log_breaker_transition("test", CircuitState::Closed, CircuitState::Open, 3);
        log_health_transition("test", HealthStatus::Unknown, HealthStatus::Healthy);
    }
}
