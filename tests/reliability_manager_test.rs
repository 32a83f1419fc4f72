//! Integration tests for the ReliabilityManager facade

mod common;

use common::*;
use reliability_core::config::{ConfigManager, CircuitBreakerComponentConfig, UI_UPDATES_CHAIN};
use reliability_core::health::{HealthStatus, MetricType};
use reliability_core::{CircuitState, ReliabilityManager, ReliabilityEvent};
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test]
async fn test_manager_from_config_directory() {
    init_test_logging();
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("reliability.yaml"),
        r#"
circuit_breakers:
  chains:
    ui_updates:
      failure_threshold: 2
      success_threshold: 1
      timeout_seconds: 60
    search_results:
      failure_threshold: 4
fault_injection:
  enabled: true
  seed: 9
  scenarios: [observer_pattern]
"#,
    )
    .unwrap();
    let config_manager =
        ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test").unwrap();

    let manager = ReliabilityManager::from_config(config_manager).await.unwrap();

    assert_eq!(
        manager
            .observer_chains
            .breaker(UI_UPDATES_CHAIN)
            .unwrap()
            .config()
            .failure_threshold,
        2
    );
    assert!(manager.observer_chains.breaker("search_results").is_some());
    assert!(manager.fault_injection.is_enabled());
    assert_eq!(
        manager.fault_injection.configured_faults(),
        vec![
            "observer_chains.notify".to_string(),
            "observer_chains.notify_async".to_string()
        ]
    );

    manager.shutdown().await;
    assert!(!manager.fault_injection.is_enabled());
}

#[tokio::test]
async fn test_broken_chain_is_visible_in_system_health() {
    let manager = ReliabilityManager::with_defaults().await.unwrap();
    let mut rx = manager.subscribe();
    manager.observer_chains.configure_chain(
        "fragile",
        Some(CircuitBreakerComponentConfig::new(1, 1, 60.0, 1).to_resilience_config()),
    )
    .unwrap();

    let failures = Arc::new(AtomicUsize::new(0));
    let report = manager.notify_observers_safely("fragile", &[failing_observer(&failures)], &1);
    assert_eq!(report.failed, 1);

    let health = manager.get_system_health();
    assert_eq!(health.metrics.circuit_breakers["fragile"], CircuitState::Open);
    assert_eq!(health.metrics.open_circuits, 1);
    assert!(drain_events(&mut rx)
        .iter()
        .any(|e| matches!(e, ReliabilityEvent::ChainBroken { .. })));

    manager.shutdown().await;
}

#[tokio::test]
async fn test_async_notification_through_manager() {
    let manager = ReliabilityManager::with_defaults().await.unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let observers = vec![counting_async_observer(&calls), counting_async_observer(&calls)];

    let report = manager
        .notify_observers_safely_async(UI_UPDATES_CHAIN, &observers, 3)
        .await;

    assert_eq!(report.successful, 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    manager.shutdown().await;
}

#[tokio::test]
async fn test_record_operation_feeds_health_and_telemetry() {
    let manager = ReliabilityManager::with_defaults().await.unwrap();

    for _ in 0..10 {
        manager.record_operation("exporter", "write", Duration::from_millis(1500), true);
    }

    let health = manager.get_system_health();
    assert_eq!(health.components["exporter"], HealthStatus::Degraded);
    assert_eq!(health.overall_status, HealthStatus::Degraded);

    let summary = manager.telemetry.get_performance_summary();
    assert_eq!(summary.operations["write"].count, 10);
    let component = manager.health_monitor.component_health("exporter").unwrap();
    assert_eq!(component.latest(MetricType::ErrorRate).map(|m| m.value), Some(0.0));

    manager.shutdown().await;
}

#[tokio::test]
async fn test_register_component_pass_through() {
    let manager = ReliabilityManager::with_defaults().await.unwrap();
    manager.register_component("viewer", Vec::new()).unwrap();

    assert!(manager.health_monitor.is_registered("viewer"));
    assert_eq!(
        manager.get_system_health().components["viewer"],
        HealthStatus::Unknown
    );
    manager.shutdown().await;
}
