//! # Reliability Manager
//!
//! Application-lifetime context that owns one instance of every reliability subsystem
//! and wires them together: the named observer chains, default health checks, telemetry
//! and optional fault-injection scenarios. Collaborators receive it (or the pieces they
//! need) by reference instead of reaching for process-wide globals.

use crate::config::{
    ConfigManager, ReliabilityConfig, CONFIG_CHANGES_CHAIN, PARAMETER_SYNC_CHAIN,
    UI_UPDATES_CHAIN,
};
use crate::error::{ReliabilityError, ReliabilityResult};
use crate::events::{EventPublisher, PublishedEvent};
use crate::fault_injection::{FaultConfig, FaultInjectionManager};
use crate::health::{HealthCheck, HealthMonitor, HealthStatus, MetricType};
use crate::resilience::{
    AsyncObserver, CircuitState, NotificationReport, Observer, ObserverChainBreaker,
};
use crate::telemetry::{ConfigurationTelemetry, TelemetryAnomaly};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

/// Component names for the built-in health checks
pub const CONFIGURATION_MANAGER_COMPONENT: &str = "configuration_manager";
pub const PARAMETER_RULES_ENGINE_COMPONENT: &str = "parameter_rules_engine";
pub const OBSERVER_CHAINS_COMPONENT: &str = "observer_chains";

/// Recent outcomes kept per component for the error-rate metric
const OUTCOME_WINDOW: usize = 100;

/// Outcomes required before an error-rate sample is recorded
const MIN_ERROR_RATE_SAMPLES: usize = 10;

/// Point-in-time view across every subsystem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemHealth {
    pub overall_status: HealthStatus,
    pub components: BTreeMap<String, HealthStatus>,
    pub metrics: SystemMetrics,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemMetrics {
    pub circuit_breakers: BTreeMap<String, CircuitState>,
    pub open_circuits: usize,
    pub telemetry_enabled: bool,
    pub telemetry_events: usize,
    pub telemetry_anomalies: usize,
    pub fault_injection_enabled: bool,
    pub injected_faults: usize,
}

/// Shared reliability dependencies
///
/// This serves as the dependency injection container providing access to:
/// - Configuration manager
/// - Event publisher for reliability signals
/// - Observer chain breaker with the named application chains
/// - Health monitor with the default component checks
/// - Configuration telemetry
/// - Fault injection manager
pub struct ReliabilityManager {
    /// Instance ID, for telling managers apart in logs
    pub system_id: Uuid,

    pub config_manager: Arc<ConfigManager>,

    pub event_publisher: EventPublisher,

    pub observer_chains: Arc<ObserverChainBreaker>,

    pub health_monitor: HealthMonitor,

    pub telemetry: Arc<ConfigurationTelemetry>,

    pub fault_injection: FaultInjectionManager,

    outcomes: DashMap<String, VecDeque<bool>>,
    shut_down: AtomicBool,
}

impl std::fmt::Debug for ReliabilityManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReliabilityManager")
            .field("system_id", &self.system_id)
            .field("environment", &self.config_manager.environment())
            .field("observer_chains", &self.observer_chains.chain_ids())
            .field("health_monitor", &self.health_monitor)
            .field("telemetry_enabled", &self.telemetry.is_enabled())
            .field("fault_injection_enabled", &self.fault_injection.is_enabled())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

impl ReliabilityManager {
    /// Create a manager with environment-aware configuration loading
    pub async fn new() -> ReliabilityResult<Self> {
        info!("🔧 Initializing ReliabilityManager with auto-detected environment configuration");
        let config_manager = ConfigManager::load()?;
        Self::from_config(config_manager).await
    }

    /// Create a manager from built-in defaults, without reading any files
    pub async fn with_defaults() -> ReliabilityResult<Self> {
        let config_manager =
            ConfigManager::from_config(ReliabilityConfig::default(), ConfigManager::detect_environment())?;
        Self::from_config(Arc::new(config_manager)).await
    }

    /// Create a manager from a loaded configuration.
    ///
    /// Must run inside a Tokio runtime: the default health checks are scheduled here.
    pub async fn from_config(config_manager: Arc<ConfigManager>) -> ReliabilityResult<Self> {
        let config = config_manager.config().clone();
        config.validate()?;

        let event_publisher = EventPublisher::default();

        let observer_chains = Arc::new(ObserverChainBreaker::with_settings(
            config.circuit_breakers.default_chain.to_resilience_config(),
            config.observer_chains.max_observer_failures,
            event_publisher.clone(),
        ));
        for chain_id in [UI_UPDATES_CHAIN, CONFIG_CHANGES_CHAIN, PARAMETER_SYNC_CHAIN] {
            observer_chains.configure_chain(
                chain_id,
                Some(config.circuit_breakers.config_for(chain_id).to_resilience_config()),
            )?;
        }
        for (chain_id, chain_config) in &config.circuit_breakers.chains {
            if observer_chains.breaker(chain_id).is_none() {
                observer_chains.configure_chain(chain_id, Some(chain_config.to_resilience_config()))?;
            }
        }

        let health_monitor =
            HealthMonitor::with_config(config.health.clone(), event_publisher.clone());

        let telemetry = Arc::new(ConfigurationTelemetry::new(config.telemetry.clone()));

        let fault_injection =
            FaultInjectionManager::with_config(&config.fault_injection, event_publisher.clone());
        if config.fault_injection.enabled {
            for scenario in &config.fault_injection.scenarios {
                fault_injection.load_scenario(scenario)?;
            }
            warn!(
                scenarios = ?config.fault_injection.scenarios,
                "🧪 Fault injection enabled"
            );
        }

        let manager = Self {
            system_id: Uuid::new_v4(),
            config_manager,
            event_publisher,
            observer_chains,
            health_monitor,
            telemetry,
            fault_injection,
            outcomes: DashMap::new(),
            shut_down: AtomicBool::new(false),
        };
        manager.register_default_checks()?;

        info!(
            system_id = %manager.system_id,
            environment = %manager.config_manager.environment(),
            chains = ?manager.observer_chains.chain_ids(),
            components = ?manager.health_monitor.component_names(),
            "✅ ReliabilityManager initialized"
        );
        Ok(manager)
    }

    pub fn config(&self) -> &ReliabilityConfig {
        self.config_manager.config()
    }

    /// Subscribe to every reliability signal
    pub fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.event_publisher.subscribe()
    }

    /// Register (or replace) a component with its health checks
    pub fn register_component(&self, name: &str, checks: Vec<HealthCheck>) -> ReliabilityResult<()> {
        self.health_monitor.register_component(name, checks)
    }

    pub fn configure_fault(
        &self,
        component: &str,
        method: &str,
        config: FaultConfig,
    ) -> ReliabilityResult<()> {
        self.fault_injection.configure_fault(component, method, config)
    }

    /// Notify observers through the chain's breaker, recording the notification latency
    pub fn notify_observers_safely<A>(
        &self,
        chain_id: &str,
        observers: &[Observer<A>],
        args: &A,
    ) -> NotificationReport {
        let started = Instant::now();
        let report = self.observer_chains.notify_observers(chain_id, observers, args);
        self.record_notification(chain_id, started.elapsed(), &report);
        report
    }

    pub async fn notify_observers_safely_async<A>(
        &self,
        chain_id: &str,
        observers: &[AsyncObserver<A>],
        args: A,
    ) -> NotificationReport
    where
        A: Clone + Send + 'static,
    {
        let started = Instant::now();
        let report = self
            .observer_chains
            .notify_observers_async(chain_id, observers, args)
            .await;
        self.record_notification(chain_id, started.elapsed(), &report);
        report
    }

    /// Feed one completed operation into telemetry and the component's health metrics
    pub fn record_operation(&self, component: &str, operation: &str, duration: Duration, success: bool) {
        self.telemetry
            .track_component_performance(component, operation, duration, None);
        if !success {
            self.telemetry.track_component_error(
                component,
                "operation_failed",
                &format!("{operation} failed"),
                None,
            );
        }

        self.health_monitor.record_metric(
            component,
            MetricType::Latency,
            duration.as_secs_f64() * 1000.0,
            None,
        );

        if let Some(error_rate) = self.record_outcome(component, success) {
            self.health_monitor
                .record_metric(component, MetricType::ErrorRate, error_rate, None);
        }
    }

    /// Worst-of health across all components plus a summary of every subsystem
    pub fn get_system_health(&self) -> SystemHealth {
        let components: BTreeMap<String, HealthStatus> =
            self.health_monitor.component_statuses().into_iter().collect();
        let overall_status = HealthStatus::worst_of(components.values().copied());

        let circuit_breakers: BTreeMap<String, CircuitState> = self
            .observer_chains
            .chain_ids()
            .into_iter()
            .filter_map(|id| self.observer_chains.chain_state(&id).map(|state| (id, state)))
            .collect();
        let open_circuits = circuit_breakers
            .values()
            .filter(|state| **state == CircuitState::Open)
            .count();

        SystemHealth {
            overall_status,
            components,
            metrics: SystemMetrics {
                circuit_breakers,
                open_circuits,
                telemetry_enabled: self.telemetry.is_enabled(),
                telemetry_events: self.telemetry.event_count(),
                telemetry_anomalies: self.telemetry.detect_anomalies().len(),
                fault_injection_enabled: self.fault_injection.is_enabled(),
                injected_faults: self.fault_injection.events().len(),
            },
            timestamp: Utc::now(),
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// Stop health monitoring, disable telemetry and export what it collected.
    ///
    /// Export failures are logged, never returned. Only the first call does any work.
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }

        info!(system_id = %self.system_id, "🛑 Shutting down ReliabilityManager");
        self.health_monitor.shutdown();
        self.telemetry.enable(false);
        self.fault_injection.enable(false);

        let telemetry_config = &self.config().telemetry;
        if let Some(path) = telemetry_config.export_path.clone() {
            let telemetry = Arc::clone(&self.telemetry);
            let format = telemetry_config.export_format;
            let export_path = path.clone();
            let result =
                tokio::task::spawn_blocking(move || telemetry.export_events(&export_path, format))
                    .await
                    .map_err(|e| ReliabilityError::Internal(format!("export task failed: {e}")))
                    .and_then(|result| result);

            match result {
                Ok(count) => info!(
                    path = %path.display(),
                    events = count,
                    "📤 Telemetry exported on shutdown"
                ),
                Err(e) => crate::logging::log_error(
                    "reliability_manager",
                    "shutdown_export",
                    &e.to_string(),
                    Some(&path.display().to_string()),
                ),
            }
        }

        info!(system_id = %self.system_id, "✅ ReliabilityManager shut down");
    }

    fn register_default_checks(&self) -> ReliabilityResult<()> {
        let health = &self.config().health;
        let with_defaults = |check: HealthCheck| {
            check
                .with_interval(health.default_check_interval())
                .with_timeout(health.default_check_timeout())
                .with_failure_threshold(health.default_failure_threshold)
                .with_recovery_threshold(health.default_recovery_threshold)
        };

        let config_manager = Arc::clone(&self.config_manager);
        self.health_monitor.register_component(
            CONFIGURATION_MANAGER_COMPONENT,
            vec![with_defaults(HealthCheck::new("configuration_valid", move || {
                let config_manager = Arc::clone(&config_manager);
                async move { Ok::<_, anyhow::Error>(config_manager.config().validate().is_ok()) }
            }))],
        )?;

        let telemetry = Arc::clone(&self.telemetry);
        self.health_monitor.register_component(
            PARAMETER_RULES_ENGINE_COMPONENT,
            vec![with_defaults(HealthCheck::new("error_rate", move || {
                let telemetry = Arc::clone(&telemetry);
                async move {
                    let high_error_rate = telemetry
                        .detect_anomalies()
                        .iter()
                        .any(|a| matches!(a, TelemetryAnomaly::HighErrorRate { .. }));
                    Ok::<_, anyhow::Error>(!high_error_rate)
                }
            }))],
        )?;

        let observer_chains = Arc::clone(&self.observer_chains);
        self.health_monitor.register_component(
            OBSERVER_CHAINS_COMPONENT,
            vec![with_defaults(HealthCheck::new("circuits_closed", move || {
                let observer_chains = Arc::clone(&observer_chains);
                async move {
                    let any_open = observer_chains
                        .chain_ids()
                        .iter()
                        .any(|id| observer_chains.chain_state(id) == Some(CircuitState::Open));
                    Ok::<_, anyhow::Error>(!any_open)
                }
            }))],
        )?;

        Ok(())
    }

    fn record_notification(&self, chain_id: &str, elapsed: Duration, report: &NotificationReport) {
        self.telemetry.track_component_performance(
            OBSERVER_CHAINS_COMPONENT,
            &format!("notify:{chain_id}"),
            elapsed,
            None,
        );
        if report.failed > 0 {
            self.telemetry.track_component_error(
                OBSERVER_CHAINS_COMPONENT,
                "observer_failed",
                &format!("{} observer(s) failed on chain {chain_id}", report.failed),
                None,
            );
        }
    }

    /// Push one outcome and return the windowed error rate once enough samples exist
    fn record_outcome(&self, component: &str, success: bool) -> Option<f64> {
        let mut outcomes = self.outcomes.entry(component.to_string()).or_default();
        if outcomes.len() >= OUTCOME_WINDOW {
            outcomes.pop_front();
        }
        outcomes.push_back(success);

        (outcomes.len() >= MIN_ERROR_RATE_SAMPLES).then(|| {
            let failures = outcomes.iter().filter(|ok| !**ok).count();
            failures as f64 / outcomes.len() as f64
        })
    }
}
