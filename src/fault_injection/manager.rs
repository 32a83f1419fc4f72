//! # Fault Injection Manager
//!
//! Registry of fault policies keyed by `component.method`, the per-call injection draw, and
//! the bounded log of fired faults. Disabled until [`FaultInjectionManager::enable`] is
//! called, so production wiring costs one atomic load per guarded call.

use super::config::{FaultConfig, FaultContext, FaultError, FaultEvent, FaultType};
use super::injector::FaultInjector;
use super::scenarios::{FaultScenario, FaultScenarios};
use crate::config::FaultInjectionConfig;
use crate::error::{ReliabilityError, ReliabilityResult};
use crate::events::{EventPublisher, ReliabilityEvent};
use crate::logging::log_fault_event;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

/// Aggregates over the retained fault events
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaultStatistics {
    pub total_events: usize,
    pub by_fault_type: BTreeMap<FaultType, u64>,
    pub by_component: BTreeMap<String, u64>,
    pub average_recovery_ms: BTreeMap<FaultType, f64>,
}

#[derive(Debug)]
struct FaultState {
    enabled: AtomicBool,
    faults: DashMap<String, FaultConfig>,
    rng: Mutex<StdRng>,
    events: Mutex<VecDeque<FaultEvent>>,
    max_events: usize,
    publisher: EventPublisher,
}

impl FaultState {
    fn record(&self, event: FaultEvent) {
        log_fault_event(
            &event.component,
            &event.method,
            event.fault_type.as_str(),
            event.recovery_time_ms,
            event.error.as_deref(),
        );
        self.publisher.publish(ReliabilityEvent::FaultInjected {
            component: event.component.clone(),
            method: event.method.clone(),
            fault_type: event.fault_type,
        });

        let mut events = self.events.lock();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event);
    }
}

fn fault_key(component: &str, method: &str) -> String {
    format!("{component}.{method}")
}

/// Fault injection engine. Cheap to clone; clones share policies and events.
#[derive(Debug, Clone)]
pub struct FaultInjectionManager {
    inner: Arc<FaultState>,
}

impl FaultInjectionManager {
    /// Disabled manager with an entropy-seeded RNG
    pub fn new(events: EventPublisher) -> Self {
        Self::with_config(&FaultInjectionConfig::default(), events)
    }

    /// Seed and event bound from configuration. Scenarios are not loaded here;
    /// see [`FaultInjectionManager::load_scenario`].
    pub fn with_config(settings: &FaultInjectionConfig, events: EventPublisher) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            inner: Arc::new(FaultState {
                enabled: AtomicBool::new(settings.enabled),
                faults: DashMap::new(),
                rng: Mutex::new(rng),
                events: Mutex::new(VecDeque::new()),
                max_events: settings.max_events.max(1),
                publisher: events,
            }),
        }
    }

    pub fn enable(&self, enabled: bool) {
        let previous = self.inner.enabled.swap(enabled, Ordering::Relaxed);
        if previous != enabled {
            info!(enabled = enabled, "🧪 Fault injection toggled");
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::Relaxed)
    }

    /// Register the fault policy for `component.method`. Last write wins.
    pub fn configure_fault(
        &self,
        component: &str,
        method: &str,
        config: FaultConfig,
    ) -> ReliabilityResult<()> {
        config.validate().map_err(|reason| {
            ReliabilityError::InvalidConfiguration(format!(
                "fault for {}: {reason}",
                fault_key(component, method)
            ))
        })?;

        debug!(
            component = %component,
            method = %method,
            fault_type = %config.fault_type,
            probability = config.probability,
            "Fault configured"
        );
        self.inner.faults.insert(fault_key(component, method), config);
        Ok(())
    }

    pub fn remove_fault(&self, component: &str, method: &str) -> Option<FaultConfig> {
        self.inner
            .faults
            .remove(&fault_key(component, method))
            .map(|(_, config)| config)
    }

    pub fn fault_config(&self, component: &str, method: &str) -> Option<FaultConfig> {
        self.inner
            .faults
            .get(&fault_key(component, method))
            .map(|config| config.value().clone())
    }

    /// Configured `component.method` keys, sorted
    pub fn configured_faults(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.inner.faults.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn clear_faults(&self) {
        self.inner.faults.clear();
    }

    /// The policy for `component.method` if injection is enabled and this call's draw
    /// falls below its probability. Each call draws independently.
    pub fn should_inject(&self, component: &str, method: &str) -> Option<FaultConfig> {
        if !self.is_enabled() {
            return None;
        }

        let config = self.fault_config(component, method)?;
        let draw: f64 = self.inner.rng.lock().gen();
        (draw < config.probability).then_some(config)
    }

    /// Resolve injection for one guarded call. When a fault fires the scope carries an
    /// injector, and a [`FaultEvent`] is recorded when the scope drops.
    pub fn scope(&self, component: &str, method: &str) -> FaultScope {
        let injector = self.should_inject(component, method).map(|config| {
            let rng = StdRng::seed_from_u64(self.inner.rng.lock().gen());
            let context = FaultContext {
                component: component.to_string(),
                method: method.to_string(),
                fault_type: config.fault_type,
            };
            FaultInjector::new(context, config, rng)
        });

        FaultScope {
            state: Arc::clone(&self.inner),
            injector,
            started: Instant::now(),
            error: None,
        }
    }

    /// Run `work` under the configured fault for `component.method`. Failing faults
    /// short-circuit with the fault's error; concurrency faults may run `work` twice.
    pub async fn run_with_faults<F, Fut, T, E>(
        &self,
        component: &str,
        method: &str,
        work: F,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<FaultError> + std::fmt::Display,
    {
        let mut scope = self.scope(component, method);
        let mut work = work;

        let Some(injector) = scope.injector_mut() else {
            return work().await;
        };

        let result = if injector.fault_type() == FaultType::ConcurrencyIssue
            && injector.config().custom.is_none()
        {
            injector.concurrency_issue(&mut work).await
        } else {
            match injector.inject().await {
                Ok(()) => work().await,
                Err(fault) => {
                    scope.record_error(&fault);
                    return Err(fault.into());
                }
            }
        };

        if let Err(error) = &result {
            scope.record_error(error);
        }
        result
    }

    /// Load a named scenario bundle
    pub fn load_scenario(&self, name: &str) -> ReliabilityResult<usize> {
        let scenario = FaultScenarios::get(name).ok_or_else(|| {
            ReliabilityError::InvalidConfiguration(format!("unknown fault scenario: {name}"))
        })?;
        self.apply_scenario(&scenario)
    }

    /// Configure every fault in `scenario`, returning how many were registered
    pub fn apply_scenario(&self, scenario: &FaultScenario) -> ReliabilityResult<usize> {
        for fault in &scenario.faults {
            self.configure_fault(&fault.component, &fault.method, fault.config.clone())?;
        }
        info!(
            scenario = %scenario.name,
            faults = scenario.faults.len(),
            "🧪 Fault scenario loaded"
        );
        Ok(scenario.faults.len())
    }

    /// Fired faults, oldest first
    pub fn events(&self) -> Vec<FaultEvent> {
        self.inner.events.lock().iter().cloned().collect()
    }

    pub fn clear_events(&self) {
        self.inner.events.lock().clear();
    }

    pub fn get_statistics(&self) -> FaultStatistics {
        let events = self.inner.events.lock();
        let mut stats = FaultStatistics {
            total_events: events.len(),
            ..Default::default()
        };
        let mut recovery_totals: BTreeMap<FaultType, f64> = BTreeMap::new();

        for event in events.iter() {
            *stats.by_fault_type.entry(event.fault_type).or_insert(0) += 1;
            *stats
                .by_component
                .entry(event.component.clone())
                .or_insert(0) += 1;
            *recovery_totals.entry(event.fault_type).or_insert(0.0) += event.recovery_time_ms;
        }

        stats.average_recovery_ms = recovery_totals
            .into_iter()
            .map(|(fault_type, total)| {
                let count = stats.by_fault_type.get(&fault_type).copied().unwrap_or(1);
                (fault_type, total / count as f64)
            })
            .collect();
        stats
    }
}

/// One guarded call. Holds the injector when a fault fired and records the
/// [`FaultEvent`] on drop, however the call ended.
#[derive(Debug)]
pub struct FaultScope {
    state: Arc<FaultState>,
    injector: Option<FaultInjector>,
    started: Instant,
    error: Option<String>,
}

impl FaultScope {
    pub fn is_injecting(&self) -> bool {
        self.injector.is_some()
    }

    pub fn injector(&self) -> Option<&FaultInjector> {
        self.injector.as_ref()
    }

    pub fn injector_mut(&mut self) -> Option<&mut FaultInjector> {
        self.injector.as_mut()
    }

    /// Attach the error the guarded call ended with. The first error wins.
    pub fn record_error(&mut self, error: &dyn std::fmt::Display) {
        if self.injector.is_some() && self.error.is_none() {
            self.error = Some(error.to_string());
        }
    }
}

impl Drop for FaultScope {
    fn drop(&mut self) {
        let Some(injector) = self.injector.take() else {
            return;
        };

        let context = injector.context();
        let event = FaultEvent {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            component: context.component.clone(),
            method: context.method.clone(),
            fault_type: injector.fault_type(),
            impact: injector
                .impact()
                .unwrap_or("fault armed without effect")
                .to_string(),
            recovery_time_ms: self.started.elapsed().as_secs_f64() * 1000.0,
            error: self.error.take(),
        };
        self.state.record(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault_injection::ResourceKind;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn seeded_manager() -> FaultInjectionManager {
        let settings = FaultInjectionConfig {
            enabled: true,
            seed: Some(42),
            max_events: 5,
            ..Default::default()
        };
        FaultInjectionManager::with_config(&settings, EventPublisher::default())
    }

    #[test]
    fn test_disabled_by_default() {
        let manager = FaultInjectionManager::new(EventPublisher::default());
        manager
            .configure_fault("a", "b", FaultConfig::new(FaultType::Exception, 1.0))
            .unwrap();

        assert!(!manager.is_enabled());
        assert!(manager.should_inject("a", "b").is_none());
        assert!(!manager.scope("a", "b").is_injecting());
    }

    #[test]
    fn test_configure_fault_last_write_wins() {
        let manager = seeded_manager();
        manager
            .configure_fault("ui", "render", FaultConfig::new(FaultType::Exception, 1.0))
            .unwrap();
        manager
            .configure_fault("ui", "render", FaultConfig::new(FaultType::NetworkDelay, 0.5))
            .unwrap();

        let config = manager.fault_config("ui", "render").unwrap();
        assert_eq!(config.fault_type, FaultType::NetworkDelay);
        assert_eq!(manager.configured_faults(), vec!["ui.render".to_string()]);

        assert!(manager.remove_fault("ui", "render").is_some());
        assert!(manager.should_inject("ui", "render").is_none());
    }

    #[test]
    fn test_invalid_fault_is_rejected() {
        let manager = seeded_manager();
        let mut config = FaultConfig::new(FaultType::NetworkDelay, 0.5);
        config.parameters.min_delay_ms = 10;
        config.parameters.max_delay_ms = 1;

        assert!(matches!(
            manager.configure_fault("a", "b", config),
            Err(ReliabilityError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_scope_records_event_on_drop() {
        let manager = seeded_manager();
        manager
            .configure_fault("rules", "evaluate", FaultConfig::new(FaultType::Exception, 1.0))
            .unwrap();

        {
            let mut scope = manager.scope("rules", "evaluate");
            let injector = scope.injector_mut().unwrap();
            let error = injector.exception().unwrap_err();
            scope.record_error(&error);
        }

        let events = manager.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].fault_type, FaultType::Exception);
        assert_eq!(events[0].impact, "raised exception");
        assert!(events[0].error.as_deref().unwrap().contains("simulated exception"));
    }

    #[test]
    fn test_event_log_is_bounded() {
        let manager = seeded_manager();
        manager
            .configure_fault("a", "b", FaultConfig::new(FaultType::Exception, 1.0))
            .unwrap();

        for _ in 0..8 {
            drop(manager.scope("a", "b"));
        }
        assert_eq!(manager.events().len(), 5);

        manager.clear_events();
        assert!(manager.events().is_empty());
    }

    #[tokio::test]
    async fn test_run_with_faults_short_circuits() {
        let manager = seeded_manager();
        manager
            .configure_fault(
                "storage",
                "write",
                FaultConfig::new(FaultType::ResourceExhaustion, 1.0).with_resource(ResourceKind::Disk),
            )
            .unwrap();
        let calls = AtomicUsize::new(0);

        let result: Result<(), ReliabilityError> = manager
            .run_with_faults("storage", "write", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(ReliabilityError::FaultInjected(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(manager.events()[0].error.is_some());
    }

    #[tokio::test]
    async fn test_run_with_faults_delay_proceeds() {
        let manager = seeded_manager();
        manager
            .configure_fault(
                "net",
                "fetch",
                FaultConfig::new(FaultType::NetworkDelay, 1.0)
                    .with_delay_range(Duration::from_millis(1), Duration::from_millis(5)),
            )
            .unwrap();

        let result: Result<u32, ReliabilityError> = manager
            .run_with_faults("net", "fetch", || async { Ok(7) })
            .await;

        assert_eq!(result, Ok(7));
        let stats = manager.get_statistics();
        assert_eq!(stats.total_events, 1);
        assert_eq!(stats.by_fault_type[&FaultType::NetworkDelay], 1);
        assert_eq!(stats.by_component["net"], 1);
        assert!(stats.average_recovery_ms[&FaultType::NetworkDelay] >= 1.0);
    }

    #[test]
    fn test_seeded_managers_draw_identically() {
        let draws = |manager: &FaultInjectionManager| -> Vec<bool> {
            manager
                .configure_fault("a", "b", FaultConfig::new(FaultType::Exception, 0.5))
                .unwrap();
            (0..64).map(|_| manager.should_inject("a", "b").is_some()).collect()
        };

        assert_eq!(draws(&seeded_manager()), draws(&seeded_manager()));
    }

    #[test]
    fn test_load_scenario() {
        let manager = seeded_manager();
        let loaded = manager.load_scenario("observer_pattern").unwrap();
        assert!(loaded > 0);
        assert_eq!(manager.configured_faults().len(), loaded);

        assert!(manager.load_scenario("missing").is_err());
    }
}
