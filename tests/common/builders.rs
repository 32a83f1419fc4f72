use futures::FutureExt;
use reliability_core::resilience::{
    AsyncObserver, CircuitBreakerConfig, Observer, ObserverError,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Breaker config with a millisecond recovery timeout for fast tests
pub fn fast_breaker_config(
    failure_threshold: u32,
    success_threshold: u32,
    timeout_ms: u64,
) -> CircuitBreakerConfig {
    CircuitBreakerConfig {
        failure_threshold,
        success_threshold,
        timeout: Duration::from_millis(timeout_ms),
        ..Default::default()
    }
}

/// Observer that counts how often it ran
pub fn counting_observer(calls: &Arc<AtomicUsize>) -> Observer<u32> {
    let calls = Arc::clone(calls);
    Arc::new(move |_: &u32| -> Result<(), ObserverError> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
}

/// Observer that counts its runs and always fails
pub fn failing_observer(calls: &Arc<AtomicUsize>) -> Observer<u32> {
    let calls = Arc::clone(calls);
    Arc::new(move |value: &u32| -> Result<(), ObserverError> {
        calls.fetch_add(1, Ordering::SeqCst);
        Err(ObserverError::failed(format!("rejected {value}")))
    })
}

pub fn counting_async_observer(calls: &Arc<AtomicUsize>) -> AsyncObserver<u32> {
    let calls = Arc::clone(calls);
    Arc::new(move |_: u32| {
        let calls = Arc::clone(&calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<(), ObserverError>(())
        }
        .boxed()
    })
}

pub fn failing_async_observer(calls: &Arc<AtomicUsize>) -> AsyncObserver<u32> {
    let calls = Arc::clone(calls);
    Arc::new(move |value: u32| {
        let calls = Arc::clone(&calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(ObserverError::failed(format!("rejected {value}")))
        }
        .boxed()
    })
}
