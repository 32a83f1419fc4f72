//! Integration tests for observer-chain fault isolation

mod common;

use common::*;
use futures::FutureExt;
use parking_lot::Mutex;
use reliability_core::events::EventPublisher;
use reliability_core::resilience::{
    AsyncObserver, CircuitState, Observer, ObserverChainBreaker, ObserverError,
};
use reliability_core::ReliabilityEvent;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn recording_observer(log: &Arc<Mutex<Vec<usize>>>, id: usize, fails: bool) -> Observer<u32> {
    let log = Arc::clone(log);
    Arc::new(move |_: &u32| -> Result<(), ObserverError> {
        log.lock().push(id);
        if fails {
            Err(ObserverError::failed(format!("observer {id} failed")))
        } else {
            Ok(())
        }
    })
}

#[test]
fn test_failing_observer_is_isolated_then_skipped() {
    init_test_logging();
    let breaker = ObserverChainBreaker::new(EventPublisher::default());
    let log = Arc::new(Mutex::new(Vec::new()));
    let observers: Vec<Observer<u32>> = (1..=5)
        .map(|id| recording_observer(&log, id, id == 2))
        .collect();

    for round in 0..5 {
        log.lock().clear();
        let report = breaker.notify_observers("ui_updates", &observers, &round);
        assert_eq!(*log.lock(), vec![1, 2, 3, 4, 5], "round {round}");
        assert_eq!(report.successful, 4);
        assert_eq!(report.failed, 1);
    }
    assert_eq!(breaker.observer_failures("ui_updates", 1), 5);
    assert_eq!(breaker.chain_state("ui_updates"), Some(CircuitState::Closed));

    log.lock().clear();
    let report = breaker.notify_observers("ui_updates", &observers, &99);
    assert_eq!(*log.lock(), vec![1, 3, 4, 5]);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.successful, 4);
    assert_eq!(report.failed, 0);
}

#[test]
fn test_chain_opens_and_recovers_on_schedule() {
    let events = EventPublisher::default();
    let mut rx = events.subscribe();
    let breaker = ObserverChainBreaker::new(events);
    breaker.configure_chain("config_changes", Some(fast_breaker_config(2, 1, 1000))).unwrap();

    let failures = Arc::new(AtomicUsize::new(0));
    let failing = vec![failing_observer(&failures)];
    breaker.notify_observers("config_changes", &failing, &1);
    breaker.notify_observers("config_changes", &failing, &2);
    assert_eq!(breaker.chain_state("config_changes"), Some(CircuitState::Open));

    let calls = Arc::new(AtomicUsize::new(0));
    let healthy = vec![counting_observer(&calls)];

    std::thread::sleep(Duration::from_millis(500));
    let early = breaker.notify_observers("config_changes", &healthy, &3);
    assert_eq!(early.rejected, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    std::thread::sleep(Duration::from_millis(600));
    let late = breaker.notify_observers("config_changes", &healthy, &4);
    assert_eq!(late.successful, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(breaker.chain_state("config_changes"), Some(CircuitState::Closed));

    let signals: Vec<ReliabilityEvent> = drain_events(&mut rx);
    let broken = signals
        .iter()
        .filter(|e| matches!(e, ReliabilityEvent::ChainBroken { .. }))
        .count();
    let recovered = signals
        .iter()
        .filter(|e| matches!(e, ReliabilityEvent::ChainRecovered { .. }))
        .count();
    assert_eq!(broken, 1);
    assert_eq!(recovered, 1);
    assert!(signals.iter().any(|e| matches!(
        e,
        ReliabilityEvent::CircuitStateChanged {
            from: CircuitState::Closed,
            to: CircuitState::Open,
            ..
        }
    )));
}

#[test]
fn test_chains_are_independent() {
    let breaker = ObserverChainBreaker::new(EventPublisher::default());
    breaker.configure_chain("a", Some(fast_breaker_config(1, 1, 60_000))).unwrap();
    breaker.configure_chain("b", Some(fast_breaker_config(1, 1, 60_000))).unwrap();

    let failures = Arc::new(AtomicUsize::new(0));
    breaker.notify_observers("a", &[failing_observer(&failures)], &1);

    let calls = Arc::new(AtomicUsize::new(0));
    let report = breaker.notify_observers("b", &[counting_observer(&calls)], &1);

    assert_eq!(breaker.chain_state("a"), Some(CircuitState::Open));
    assert_eq!(breaker.chain_state("b"), Some(CircuitState::Closed));
    assert_eq!(report.successful, 1);
}

#[tokio::test]
async fn test_async_notification_collects_every_outcome() {
    let breaker = ObserverChainBreaker::new(EventPublisher::default());
    let calls = Arc::new(AtomicUsize::new(0));
    let failures = Arc::new(AtomicUsize::new(0));
    let observers: Vec<AsyncObserver<u32>> = vec![
        counting_async_observer(&calls),
        failing_async_observer(&failures),
        counting_async_observer(&calls),
    ];

    let report = breaker
        .notify_observers_async("parameter_sync", &observers, 7)
        .await;

    assert_eq!(report.invoked, 3);
    assert_eq!(report.successful, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(failures.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_async_observers_run_concurrently() {
    let breaker = ObserverChainBreaker::new(EventPublisher::default());
    let slow: AsyncObserver<u32> = Arc::new(|_: u32| {
        async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<(), ObserverError>(())
        }
        .boxed()
    });
    let observers = vec![Arc::clone(&slow), Arc::clone(&slow), slow];

    let started = std::time::Instant::now();
    let report = breaker.notify_observers_async("ui_updates", &observers, 1).await;

    assert_eq!(report.successful, 3);
    assert!(started.elapsed() < Duration::from_millis(550));
}
