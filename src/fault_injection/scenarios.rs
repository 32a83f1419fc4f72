//! Named fault bundles for seeding a chaos run in one call.

use super::config::{FaultConfig, FaultType, ResourceKind};
use std::time::Duration;

/// One fault bound to a component method
#[derive(Debug, Clone)]
pub struct ScenarioFault {
    pub component: String,
    pub method: String,
    pub config: FaultConfig,
}

impl ScenarioFault {
    fn new(component: &str, method: &str, config: FaultConfig) -> Self {
        Self {
            component: component.to_string(),
            method: method.to_string(),
            config,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FaultScenario {
    pub name: &'static str,
    pub description: &'static str,
    pub faults: Vec<ScenarioFault>,
}

/// Built-in scenario bundles
pub struct FaultScenarios;

impl FaultScenarios {
    const NAMES: [&'static str; 4] = [
        "parameter_extraction",
        "ui_sync",
        "observer_pattern",
        "config_management",
    ];

    pub fn names() -> &'static [&'static str] {
        &Self::NAMES
    }

    pub fn get(name: &str) -> Option<FaultScenario> {
        match name {
            "parameter_extraction" => Some(Self::parameter_extraction()),
            "ui_sync" => Some(Self::ui_sync()),
            "observer_pattern" => Some(Self::observer_pattern()),
            "config_management" => Some(Self::config_management()),
            _ => None,
        }
    }

    pub fn all() -> Vec<FaultScenario> {
        Self::NAMES.iter().filter_map(|name| Self::get(name)).collect()
    }

    /// Slow or corrupted parameter reads and a failing rules engine
    pub fn parameter_extraction() -> FaultScenario {
        FaultScenario {
            name: "parameter_extraction",
            description: "Slow file reads, corrupted parameter data and rule evaluation errors",
            faults: vec![
                ScenarioFault::new(
                    "parameter_extractor",
                    "extract_parameters",
                    FaultConfig::new(FaultType::NetworkDelay, 0.1)
                        .with_delay_range(Duration::from_millis(100), Duration::from_millis(500)),
                ),
                ScenarioFault::new(
                    "parameter_extractor",
                    "parse_file",
                    FaultConfig::new(FaultType::DataCorruption, 0.05),
                ),
                ScenarioFault::new(
                    "parameter_rules_engine",
                    "evaluate_rules",
                    FaultConfig::new(FaultType::Exception, 0.05)
                        .with_message("rule evaluation failed"),
                ),
            ],
        }
    }

    /// Racing widget updates and UI state drifting from the model
    pub fn ui_sync() -> FaultScenario {
        FaultScenario {
            name: "ui_sync",
            description: "Duplicate or reordered UI updates and inconsistent widget state",
            faults: vec![
                ScenarioFault::new(
                    "ui_sync",
                    "update_widget",
                    FaultConfig::new(FaultType::ConcurrencyIssue, 0.1)
                        .with_delay_range(Duration::ZERO, Duration::from_millis(200)),
                ),
                ScenarioFault::new(
                    "ui_sync",
                    "sync_state",
                    FaultConfig::new(FaultType::StateInconsistency, 0.05),
                ),
            ],
        }
    }

    /// Failing and hanging observers
    pub fn observer_pattern() -> FaultScenario {
        FaultScenario {
            name: "observer_pattern",
            description: "Observer callbacks that fail or hang",
            faults: vec![
                ScenarioFault::new(
                    "observer_chains",
                    "notify",
                    FaultConfig::new(FaultType::ObserverFailure, 0.1),
                ),
                ScenarioFault::new(
                    "observer_chains",
                    "notify_async",
                    FaultConfig::new(FaultType::Timeout, 0.05)
                        .with_timeout(Duration::from_secs(2)),
                ),
            ],
        }
    }

    /// Configuration storage failures and drift
    pub fn config_management() -> FaultScenario {
        FaultScenario {
            name: "config_management",
            description: "Disk exhaustion on save, load failures and configuration drift",
            faults: vec![
                ScenarioFault::new(
                    "configuration_manager",
                    "save",
                    FaultConfig::new(FaultType::ResourceExhaustion, 0.05)
                        .with_resource(ResourceKind::Disk),
                ),
                ScenarioFault::new(
                    "configuration_manager",
                    "load",
                    FaultConfig::new(FaultType::NetworkFailure, 0.05)
                        .with_message("configuration source unreachable"),
                ),
                ScenarioFault::new(
                    "configuration_manager",
                    "sync",
                    FaultConfig::new(FaultType::ConfigDrift, 0.1),
                ),
            ],
        }
    }
}
