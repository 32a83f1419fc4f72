//! # Health Monitor
//!
//! Continuous health assessment per registered component. Each health check runs on
//! its own timer task with a hard deadline; metric samples are kept in bounded
//! per-type histories and evaluated against anomaly thresholds. Status changes are
//! published as [`ReliabilityEvent::HealthChanged`] so collaborators never need to poll.

use crate::config::HealthConfig;
use crate::error::{panic_message, ReliabilityError, ReliabilityResult};
use crate::events::{EventPublisher, ReliabilityEvent};
use crate::health::sla::{time_weighted_uptime, SlaMetrics, StatusChange};
use crate::health::{
    AnomalyLevel, AnomalyThresholds, ComponentHealth, HealthCheck, HealthIssue, HealthMetric,
    HealthStatus, IssueSource, MetricThreshold, MetricType,
};
use crate::logging::{log_error, log_health_transition};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Recovery callback: receives the component name and the trigger reason
pub type RecoveryAction = Arc<dyn Fn(&str, &str) -> anyhow::Result<()> + Send + Sync>;

type Transition = (HealthStatus, HealthStatus);

#[derive(Debug)]
struct ComponentState {
    health: ComponentHealth,
    check_failures: HashMap<String, u32>,
    check_successes: HashMap<String, u32>,
    status_history: VecDeque<StatusChange>,
}

impl ComponentState {
    fn new(name: &str) -> Self {
        let health = ComponentHealth::new(name);
        let mut status_history = VecDeque::new();
        status_history.push_back(StatusChange {
            timestamp: health.registered_at,
            status: health.status,
        });

        Self {
            health,
            check_failures: HashMap::new(),
            check_successes: HashMap::new(),
            status_history,
        }
    }

    fn snapshot(&self) -> ComponentHealth {
        let mut health = self.health.clone();
        health.consecutive_failures = self.check_failures.values().copied().max().unwrap_or(0);
        health
    }

    fn set_status(
        &mut self,
        status: HealthStatus,
        now: DateTime<Utc>,
        history_size: usize,
    ) -> Option<Transition> {
        let old = self.health.status;
        if old == status {
            return None;
        }

        self.health.status = status;
        while self.status_history.len() >= history_size.max(1) {
            self.status_history.pop_front();
        }
        self.status_history.push_back(StatusChange {
            timestamp: now,
            status,
        });
        Some((old, status))
    }
}

/// Overall status from a component's active issues
fn derive_status(issues: &[HealthIssue]) -> HealthStatus {
    let metric_critical = issues
        .iter()
        .any(|issue| issue.source == IssueSource::Metric && issue.level == AnomalyLevel::Critical);
    if metric_critical {
        return HealthStatus::Critical;
    }

    if issues.iter().any(|issue| issue.source == IssueSource::Check) {
        return HealthStatus::Unhealthy;
    }

    let warnings = issues
        .iter()
        .filter(|issue| issue.level == AnomalyLevel::Warning)
        .count();
    match warnings {
        0 => HealthStatus::Healthy,
        1 | 2 => HealthStatus::Degraded,
        _ => HealthStatus::Unhealthy,
    }
}

struct MonitorState {
    components: DashMap<String, ComponentState>,
    tasks: Mutex<HashMap<String, Vec<JoinHandle<()>>>>,
    recovery_actions: DashMap<String, Vec<RecoveryAction>>,
    thresholds: RwLock<AnomalyThresholds>,
    settings: HealthConfig,
    events: EventPublisher,
}

impl Drop for MonitorState {
    fn drop(&mut self) {
        for handle in self.tasks.get_mut().values().flatten() {
            handle.abort();
        }
    }
}

/// Health monitoring engine. Cloning is cheap and shares state.
#[derive(Clone)]
pub struct HealthMonitor {
    inner: Arc<MonitorState>,
}

impl fmt::Debug for HealthMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HealthMonitor")
            .field("components", &self.inner.components.len())
            .field("settings", &self.inner.settings)
            .finish()
    }
}

impl HealthMonitor {
    pub fn new(events: EventPublisher) -> Self {
        Self::with_config(HealthConfig::default(), events)
    }

    pub fn with_config(settings: HealthConfig, events: EventPublisher) -> Self {
        let thresholds = AnomalyThresholds::defaults().with_overrides(&settings.thresholds);
        Self {
            inner: Arc::new(MonitorState {
                components: DashMap::new(),
                tasks: Mutex::new(HashMap::new()),
                recovery_actions: DashMap::new(),
                thresholds: RwLock::new(thresholds),
                settings,
                events,
            }),
        }
    }

    pub fn settings(&self) -> &HealthConfig {
        &self.inner.settings
    }

    /// Register a component and start one timer per check.
    ///
    /// Re-registering a name replaces its state and restarts its checks. Starting
    /// checks requires a Tokio runtime; a component without checks does not.
    pub fn register_component(&self, name: &str, checks: Vec<HealthCheck>) -> ReliabilityResult<()> {
        let runtime = if checks.is_empty() {
            None
        } else {
            Some(tokio::runtime::Handle::try_current().map_err(|e| {
                ReliabilityError::RuntimeUnavailable(format!(
                    "cannot schedule health checks for {name}: {e}"
                ))
            })?)
        };

        self.stop_checks(name);
        self.inner
            .components
            .insert(name.to_string(), ComponentState::new(name));

        let check_names: Vec<String> = checks.iter().map(|check| check.name.clone()).collect();
        if let Some(runtime) = runtime {
            let handles = checks
                .into_iter()
                .map(|check| {
                    runtime.spawn(Self::check_loop(
                        Arc::downgrade(&self.inner),
                        name.to_string(),
                        check,
                    ))
                })
                .collect();
            self.inner.tasks.lock().insert(name.to_string(), handles);
        }

        info!(
            component = %name,
            checks = ?check_names,
            "🩺 Component registered for health monitoring"
        );
        Ok(())
    }

    /// Stop a component's checks and forget its state
    pub fn unregister_component(&self, name: &str) -> bool {
        self.stop_checks(name);
        self.inner.recovery_actions.remove(name);
        self.inner.components.remove(name).is_some()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.inner.components.contains_key(name)
    }

    /// Registered component names, sorted
    pub fn component_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .components
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    pub fn component_health(&self, name: &str) -> Option<ComponentHealth> {
        self.inner
            .components
            .get(name)
            .map(|state| state.snapshot())
    }

    pub fn component_statuses(&self) -> HashMap<String, HealthStatus> {
        self.inner
            .components
            .iter()
            .map(|entry| (entry.key().clone(), entry.health.status))
            .collect()
    }

    /// Worst status across all components; `Unknown` when none are registered
    pub fn overall_status(&self) -> HealthStatus {
        HealthStatus::worst_of(
            self.inner
                .components
                .iter()
                .map(|entry| entry.health.status),
        )
    }

    pub fn thresholds(&self) -> AnomalyThresholds {
        self.inner.thresholds.read().clone()
    }

    pub fn set_threshold(&self, metric_type: MetricType, threshold: MetricThreshold) {
        self.inner.thresholds.write().set(metric_type, threshold);
    }

    /// Register a recovery action; every action registered for a component runs on
    /// each recovery trigger
    pub fn register_recovery_action<F>(&self, component: &str, action: F)
    where
        F: Fn(&str, &str) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.inner
            .recovery_actions
            .entry(component.to_string())
            .or_default()
            .push(Arc::new(action));
    }

    /// Record a metric sample. Unknown components are registered on the fly.
    pub fn record_metric(
        &self,
        component: &str,
        metric_type: MetricType,
        value: f64,
        metadata: Option<HashMap<String, Value>>,
    ) {
        let now = Utc::now();
        let metric = HealthMetric {
            timestamp: now,
            metric_type,
            value,
            component: component.to_string(),
            metadata: metadata.unwrap_or_default(),
        };

        let (level, cutoff) = {
            let thresholds = self.inner.thresholds.read();
            let threshold = thresholds.get(metric_type).copied();
            let level = threshold.and_then(|t| t.classify(value));
            let cutoff = match (level, threshold) {
                (Some(AnomalyLevel::Critical), Some(t)) => Some(t.critical),
                (Some(AnomalyLevel::Warning), Some(t)) => Some(t.warning),
                _ => None,
            };
            (level, cutoff)
        };

        let transition = {
            let mut state = self
                .inner
                .components
                .entry(component.to_string())
                .or_insert_with(|| {
                    debug!(component = %component, "Auto-registering component from metric");
                    ComponentState::new(component)
                });
            state
                .health
                .push_metric(metric, self.inner.settings.history_size);
            self.reevaluate(&mut state, now)
        };

        self.inner.events.publish(ReliabilityEvent::MetricRecorded {
            component: component.to_string(),
            metric_type,
            value,
        });

        if let (Some(level), Some(cutoff)) = (level, cutoff) {
            let description =
                format!("{metric_type} value {value} exceeded {level} threshold {cutoff}");
            match level {
                AnomalyLevel::Critical => error!(component = %component, %description, "🚨 Anomaly detected"),
                AnomalyLevel::Warning => warn!(component = %component, %description, "⚠️ Anomaly detected"),
            }
            self.inner.events.publish(ReliabilityEvent::AnomalyDetected {
                component: component.to_string(),
                metric_type: Some(metric_type),
                value: Some(value),
                level,
                description: description.clone(),
            });

            self.publish_transition(component, transition);
            if level == AnomalyLevel::Critical {
                self.trigger_recovery(component, &description);
            }
        } else {
            self.publish_transition(component, transition);
        }
    }

    /// Run one check against a registered component and apply the outcome.
    ///
    /// Returns whether the check passed.
    pub async fn run_check(&self, component: &str, check: &HealthCheck) -> ReliabilityResult<bool> {
        if !self.is_registered(component) {
            return Err(ReliabilityError::ComponentNotFound(component.to_string()));
        }

        let probe = Arc::clone(&check.probe);
        let outcome = tokio::time::timeout(
            check.timeout,
            AssertUnwindSafe(async move { probe.probe().await }).catch_unwind(),
        )
        .await;

        let failure = match outcome {
            Ok(Ok(Ok(true))) => None,
            Ok(Ok(Ok(false))) => Some(format!("health check '{}' reported failure", check.name)),
            Ok(Ok(Err(e))) => Some(format!("health check '{}' errored: {e}", check.name)),
            Ok(Err(payload)) => Some(format!(
                "health check '{}' panicked: {}",
                check.name,
                panic_message(payload)
            )),
            Err(_) => Some(format!(
                "health check '{}' timed out after {}ms",
                check.name,
                check.timeout.as_millis()
            )),
        };

        match failure {
            None => {
                self.record_check_success(component, check);
                Ok(true)
            }
            Some(reason) => {
                self.record_check_failure(component, check, &reason);
                Ok(false)
            }
        }
    }

    /// Publish a recovery trigger and run every registered action, best effort
    pub fn trigger_recovery(&self, component: &str, reason: &str) {
        self.inner.events.publish(ReliabilityEvent::RecoveryTriggered {
            component: component.to_string(),
            reason: reason.to_string(),
        });

        let actions: Vec<RecoveryAction> = self
            .inner
            .recovery_actions
            .get(component)
            .map(|actions| actions.value().clone())
            .unwrap_or_default();

        if actions.is_empty() {
            debug!(component = %component, "No recovery actions registered");
            return;
        }

        info!(component = %component, reason = %reason, actions = actions.len(), "🔧 Triggering recovery");
        for action in actions {
            match catch_unwind(AssertUnwindSafe(|| action(component, reason))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => log_error(component, "recovery_action", &e.to_string(), Some(reason)),
                Err(payload) => log_error(
                    component,
                    "recovery_action",
                    &format!("recovery action panicked: {}", panic_message(payload)),
                    Some(reason),
                ),
            }
        }
    }

    /// SLA figures over the trailing `hours`
    pub fn calculate_sla_metrics(&self, component: &str, hours: f64) -> ReliabilityResult<SlaMetrics> {
        let state = self
            .inner
            .components
            .get(component)
            .ok_or_else(|| ReliabilityError::ComponentNotFound(component.to_string()))?;

        if !hours.is_finite() {
            return Err(ReliabilityError::InvalidConfiguration(format!(
                "SLA window must be a finite number of hours, got {hours}"
            )));
        }

        let now = Utc::now();
        let window = Duration::try_from_secs_f64(hours.max(0.0) * 3600.0).map_err(|e| {
            ReliabilityError::InvalidConfiguration(format!("invalid SLA window of {hours} hours: {e}"))
        })?;
        // Windows reaching past the representable range cover the whole history
        let window_start = chrono::Duration::from_std(window)
            .ok()
            .and_then(|span| now.checked_sub_signed(span))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        Ok(SlaMetrics {
            component: component.to_string(),
            window_hours: hours,
            uptime_percentage: time_weighted_uptime(&state.status_history, window_start, now),
            average_latency_ms: state.health.average_since(MetricType::Latency, window, now),
            average_error_rate: state.health.average_since(MetricType::ErrorRate, window, now),
            current_status: state.health.status,
            calculated_at: now,
        })
    }

    /// Stop every scheduled check and clear all component state. Idempotent.
    pub fn shutdown(&self) {
        let handles: Vec<JoinHandle<()>> = self
            .inner
            .tasks
            .lock()
            .drain()
            .flat_map(|(_, handles)| handles)
            .collect();
        let stopped = handles.len();
        for handle in handles {
            handle.abort();
        }

        let components = self.inner.components.len();
        self.inner.components.clear();
        self.inner.recovery_actions.clear();

        if stopped > 0 || components > 0 {
            info!(
                stopped_checks = stopped,
                components = components,
                "🛑 Health monitor shut down"
            );
        }
    }

    async fn check_loop(state: Weak<MonitorState>, component: String, check: HealthCheck) {
        let period = check.interval.max(Duration::from_millis(1));
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let Some(inner) = state.upgrade() else {
                break;
            };
            let monitor = HealthMonitor { inner };
            if monitor.run_check(&component, &check).await.is_err() {
                debug!(component = %component, check = %check.name, "Component gone, stopping check");
                break;
            }
        }
    }

    fn stop_checks(&self, name: &str) {
        if let Some(handles) = self.inner.tasks.lock().remove(name) {
            for handle in handles {
                handle.abort();
            }
        }
    }

    fn record_check_success(&self, component: &str, check: &HealthCheck) {
        let now = Utc::now();
        let (recovered, transition) = {
            let Some(mut state) = self.inner.components.get_mut(component) else {
                return;
            };
            state.health.last_check = Some(now);
            state.check_failures.remove(&check.name);
            let successes = {
                let count = state.check_successes.entry(check.name.clone()).or_insert(0);
                *count += 1;
                *count
            };

            let had_issue = state
                .health
                .issues
                .iter()
                .any(|issue| issue.source == IssueSource::Check && issue.key == check.name);
            let recovered = had_issue && successes >= check.recovery_threshold;
            if recovered {
                state
                    .health
                    .issues
                    .retain(|issue| !(issue.source == IssueSource::Check && issue.key == check.name));
            }
            (recovered, self.reevaluate(&mut state, now))
        };

        if recovered {
            info!(component = %component, check = %check.name, "✅ Health check recovered");
        }
        self.publish_transition(component, transition);
    }

    fn record_check_failure(&self, component: &str, check: &HealthCheck, reason: &str) {
        let now = Utc::now();
        let (failures, transition) = {
            let Some(mut state) = self.inner.components.get_mut(component) else {
                return;
            };
            state.health.last_check = Some(now);
            state.check_successes.remove(&check.name);
            let failures = {
                let count = state.check_failures.entry(check.name.clone()).or_insert(0);
                *count += 1;
                *count
            };

            if failures < check.failure_threshold {
                (failures, None)
            } else {
                let since = state
                    .health
                    .issues
                    .iter()
                    .find(|issue| issue.source == IssueSource::Check && issue.key == check.name)
                    .map(|issue| issue.since)
                    .unwrap_or(now);
                state
                    .health
                    .issues
                    .retain(|issue| !(issue.source == IssueSource::Check && issue.key == check.name));
                state.health.issues.push(HealthIssue {
                    source: IssueSource::Check,
                    key: check.name.clone(),
                    level: check.severity,
                    description: reason.to_string(),
                    since,
                });
                (failures, self.reevaluate(&mut state, now))
            }
        };

        if failures < check.failure_threshold {
            warn!(
                component = %component,
                check = %check.name,
                failures = failures,
                threshold = check.failure_threshold,
                reason = %reason,
                "⚠️ Health check failed"
            );
            return;
        }

        error!(
            component = %component,
            check = %check.name,
            failures = failures,
            threshold = check.failure_threshold,
            reason = %reason,
            "🚨 Health check failure threshold reached"
        );
        self.publish_transition(component, transition);
        self.inner.events.publish(ReliabilityEvent::AnomalyDetected {
            component: component.to_string(),
            metric_type: None,
            value: None,
            level: check.severity,
            description: reason.to_string(),
        });
        self.trigger_recovery(component, reason);
    }

    /// Rebuild metric issues from windowed averages and derive the status
    fn reevaluate(&self, state: &mut ComponentState, now: DateTime<Utc>) -> Option<Transition> {
        let window = self.inner.settings.evaluation_window();
        let metric_issues: Vec<HealthIssue> = {
            let thresholds = self.inner.thresholds.read();
            MetricType::ALL
                .iter()
                .filter_map(|metric_type| {
                    let average = state.health.average_since(*metric_type, window, now)?;
                    let level = thresholds.classify(*metric_type, average)?;
                    let since = state
                        .health
                        .issues
                        .iter()
                        .find(|issue| {
                            issue.source == IssueSource::Metric
                                && issue.key == metric_type.as_str()
                                && issue.level == level
                        })
                        .map(|issue| issue.since)
                        .unwrap_or(now);
                    Some(HealthIssue {
                        source: IssueSource::Metric,
                        key: metric_type.as_str().to_string(),
                        level,
                        description: format!(
                            "{metric_type} average {average:.3} above {level} threshold"
                        ),
                        since,
                    })
                })
                .collect()
        };

        state
            .health
            .issues
            .retain(|issue| issue.source == IssueSource::Check);
        state.health.issues.extend(metric_issues);

        let status = derive_status(&state.health.issues);
        state.set_status(status, now, self.inner.settings.status_history_size)
    }

    fn publish_transition(&self, component: &str, transition: Option<Transition>) {
        if let Some((old, new)) = transition {
            log_health_transition(component, old, new);
            self.inner.events.publish(ReliabilityEvent::HealthChanged {
                component: component.to_string(),
                old,
                new,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn collect_events(rx: &mut tokio::sync::broadcast::Receiver<crate::events::PublishedEvent>) -> Vec<ReliabilityEvent> {
        let mut events = Vec::new();
        while let Ok(published) = rx.try_recv() {
            events.push(published.event);
        }
        events
    }

    fn issue(source: IssueSource, level: AnomalyLevel) -> HealthIssue {
        HealthIssue {
            source,
            key: "k".to_string(),
            level,
            description: String::new(),
            since: Utc::now(),
        }
    }

    #[test]
    fn test_derive_status_rules() {
        assert_eq!(derive_status(&[]), HealthStatus::Healthy);

        let warning = issue(IssueSource::Metric, AnomalyLevel::Warning);
        assert_eq!(derive_status(&[warning.clone()]), HealthStatus::Degraded);
        assert_eq!(
            derive_status(&[warning.clone(), warning.clone()]),
            HealthStatus::Degraded
        );
        assert_eq!(
            derive_status(&[warning.clone(), warning.clone(), warning.clone()]),
            HealthStatus::Unhealthy
        );

        let check = issue(IssueSource::Check, AnomalyLevel::Critical);
        assert_eq!(derive_status(&[check.clone()]), HealthStatus::Unhealthy);

        let critical = issue(IssueSource::Metric, AnomalyLevel::Critical);
        assert_eq!(derive_status(&[check, critical]), HealthStatus::Critical);
    }

    #[tokio::test]
    async fn test_critical_latency_emits_single_anomaly_and_recovery() {
        let events = EventPublisher::new(64);
        let mut rx = events.subscribe();
        let monitor = HealthMonitor::new(events);
        let recoveries = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&recoveries);
        monitor.register_recovery_action("renderer", move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        monitor.record_metric("renderer", MetricType::Latency, 6000.0, None);

        let events = collect_events(&mut rx);
        let anomalies: Vec<_> = events
            .iter()
            .filter_map(|event| match event {
                ReliabilityEvent::AnomalyDetected { level, .. } => Some(*level),
                _ => None,
            })
            .collect();
        assert_eq!(anomalies, vec![AnomalyLevel::Critical]);
        assert_eq!(recoveries.load(Ordering::SeqCst), 1);
        assert_eq!(
            monitor.component_health("renderer").map(|h| h.status),
            Some(HealthStatus::Critical)
        );
    }

    #[tokio::test]
    async fn test_warning_latency_does_not_trigger_recovery() {
        let events = EventPublisher::new(64);
        let mut rx = events.subscribe();
        let monitor = HealthMonitor::new(events);

        monitor.record_metric("renderer", MetricType::Latency, 1500.0, None);

        let events = collect_events(&mut rx);
        assert!(events.iter().any(|event| matches!(
            event,
            ReliabilityEvent::AnomalyDetected {
                level: AnomalyLevel::Warning,
                ..
            }
        )));
        assert!(!events
            .iter()
            .any(|event| matches!(event, ReliabilityEvent::RecoveryTriggered { .. })));
        assert_eq!(monitor.overall_status(), HealthStatus::Degraded);
    }

    #[tokio::test]
    async fn test_check_failures_escalate_at_threshold() {
        let monitor = HealthMonitor::new(EventPublisher::default());
        monitor.register_component("store", Vec::new()).unwrap();
        let check = HealthCheck::new("ping", || async { Ok::<_, anyhow::Error>(false) })
            .with_failure_threshold(3);

        for _ in 0..2 {
            assert!(!monitor.run_check("store", &check).await.unwrap());
        }
        let health = monitor.component_health("store").unwrap();
        assert_eq!(health.status, HealthStatus::Unknown);
        assert_eq!(health.consecutive_failures, 2);

        monitor.run_check("store", &check).await.unwrap();
        let health = monitor.component_health("store").unwrap();
        assert_eq!(health.status, HealthStatus::Unhealthy);
        assert_eq!(health.issues.len(), 1);
    }

    #[tokio::test]
    async fn test_check_timeout_counts_as_failure() {
        let monitor = HealthMonitor::new(EventPublisher::default());
        monitor.register_component("slow", Vec::new()).unwrap();
        let check = HealthCheck::new("sleepy", || async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, anyhow::Error>(true)
        })
        .with_timeout(Duration::from_millis(20))
        .with_failure_threshold(1);

        assert!(!monitor.run_check("slow", &check).await.unwrap());
        assert_eq!(
            monitor.component_health("slow").map(|h| h.status),
            Some(HealthStatus::Unhealthy)
        );
    }

    #[tokio::test]
    async fn test_run_check_on_unknown_component() {
        let monitor = HealthMonitor::new(EventPublisher::default());
        let check = HealthCheck::new("ping", || async { Ok::<_, anyhow::Error>(true) });
        assert!(matches!(
            monitor.run_check("missing", &check).await,
            Err(ReliabilityError::ComponentNotFound(_))
        ));
    }

    #[test]
    fn test_register_checks_without_runtime() {
        let monitor = HealthMonitor::new(EventPublisher::default());
        let check = HealthCheck::new("ping", || async { Ok::<_, anyhow::Error>(true) });
        let result = monitor.register_component("store", vec![check]);
        assert!(matches!(result, Err(ReliabilityError::RuntimeUnavailable(_))));
        assert!(!monitor.is_registered("store"));

        // Components without checks need no runtime
        monitor.register_component("passive", Vec::new()).unwrap();
        assert!(monitor.is_registered("passive"));
    }

    #[test]
    fn test_recovery_actions_are_isolated() {
        let monitor = HealthMonitor::new(EventPublisher::default());
        let ran = Arc::new(AtomicUsize::new(0));

        monitor.register_recovery_action("store", |_, _| Err(anyhow::anyhow!("restart failed")));
        monitor.register_recovery_action("store", |_, _| -> anyhow::Result<()> {
            panic!("recovery bug")
        });
        let counter = Arc::clone(&ran);
        monitor.register_recovery_action("store", move |component, reason| {
            assert_eq!(component, "store");
            assert_eq!(reason, "manual");
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        monitor.trigger_recovery("store", "manual");
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let monitor = HealthMonitor::new(EventPublisher::default());
        monitor.record_metric("store", MetricType::QueueDepth, 3.0, None);
        assert_eq!(monitor.component_names(), vec!["store".to_string()]);

        monitor.shutdown();
        monitor.shutdown();
        assert!(monitor.component_names().is_empty());
        assert_eq!(monitor.overall_status(), HealthStatus::Unknown);
    }

    #[test]
    fn test_sla_metrics() {
        let monitor = HealthMonitor::new(EventPublisher::default());
        monitor.record_metric("store", MetricType::Latency, 100.0, None);
        monitor.record_metric("store", MetricType::Latency, 300.0, None);
        monitor.record_metric("store", MetricType::ErrorRate, 0.01, None);

        let sla = monitor.calculate_sla_metrics("store", 24.0).unwrap();
        assert_eq!(sla.current_status, HealthStatus::Healthy);
        assert_eq!(sla.average_latency_ms, Some(200.0));
        assert_eq!(sla.average_error_rate, Some(0.01));
        assert!((0.0..=100.0).contains(&sla.uptime_percentage));

        assert!(monitor.calculate_sla_metrics("missing", 1.0).is_err());
    }

    #[test]
    fn test_sla_window_bounds() {
        let monitor = HealthMonitor::new(EventPublisher::default());
        monitor.record_metric("store", MetricType::Latency, 100.0, None);

        for hours in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            assert!(matches!(
                monitor.calculate_sla_metrics("store", hours),
                Err(ReliabilityError::InvalidConfiguration(_))
            ));
        }

        // Windows past the representable date range cover the whole history
        let sla = monitor.calculate_sla_metrics("store", 1e10).unwrap();
        assert_eq!(sla.average_latency_ms, Some(100.0));
        assert!((0.0..=100.0).contains(&sla.uptime_percentage));

        let sla = monitor.calculate_sla_metrics("store", -5.0).unwrap();
        assert!((0.0..=100.0).contains(&sla.uptime_percentage));
    }
}
