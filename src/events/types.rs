//! Typed signals emitted by the reliability subsystems.

use crate::fault_injection::FaultType;
use crate::health::{AnomalyLevel, HealthStatus, MetricType};
use crate::resilience::CircuitState;
use serde::{Deserialize, Serialize};

/// Every signal the reliability core can raise. Signals fire on transitions and on
/// qualifying samples, never on polling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReliabilityEvent {
    CircuitStateChanged {
        component: String,
        from: CircuitState,
        to: CircuitState,
    },
    ChainBroken {
        chain_id: String,
        failed: usize,
    },
    ChainRecovered {
        chain_id: String,
    },
    HealthChanged {
        component: String,
        old: HealthStatus,
        new: HealthStatus,
    },
    AnomalyDetected {
        component: String,
        metric_type: Option<MetricType>,
        value: Option<f64>,
        level: AnomalyLevel,
        description: String,
    },
    MetricRecorded {
        component: String,
        metric_type: MetricType,
        value: f64,
    },
    RecoveryTriggered {
        component: String,
        reason: String,
    },
    FaultInjected {
        component: String,
        method: String,
        fault_type: FaultType,
    },
}

impl ReliabilityEvent {
    /// Stable name used in logs and exports
    pub fn name(&self) -> &'static str {
        match self {
            ReliabilityEvent::CircuitStateChanged { .. } => "circuit_state_changed",
            ReliabilityEvent::ChainBroken { .. } => "chain_broken",
            ReliabilityEvent::ChainRecovered { .. } => "chain_recovered",
            ReliabilityEvent::HealthChanged { .. } => "health_changed",
            ReliabilityEvent::AnomalyDetected { .. } => "anomaly_detected",
            ReliabilityEvent::MetricRecorded { .. } => "metric_recorded",
            ReliabilityEvent::RecoveryTriggered { .. } => "recovery_triggered",
            ReliabilityEvent::FaultInjected { .. } => "fault_injected",
        }
    }

    /// Component (or chain) the signal concerns
    pub fn subject(&self) -> &str {
        match self {
            ReliabilityEvent::CircuitStateChanged { component, .. }
            | ReliabilityEvent::HealthChanged { component, .. }
            | ReliabilityEvent::AnomalyDetected { component, .. }
            | ReliabilityEvent::MetricRecorded { component, .. }
            | ReliabilityEvent::RecoveryTriggered { component, .. }
            | ReliabilityEvent::FaultInjected { component, .. } => component,
            ReliabilityEvent::ChainBroken { chain_id, .. }
            | ReliabilityEvent::ChainRecovered { chain_id } => chain_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = ReliabilityEvent::HealthChanged {
            component: "config_manager".to_string(),
            old: HealthStatus::Unknown,
            new: HealthStatus::Healthy,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "health_changed");
        assert_eq!(json["old"], "unknown");
        assert_eq!(json["new"], "healthy");
        assert_eq!(event.name(), "health_changed");
        assert_eq!(event.subject(), "config_manager");
    }
}
