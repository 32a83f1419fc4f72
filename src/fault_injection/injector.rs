//! Built-in fault simulators handed to callers when an injection fires.

use super::config::{FaultConfig, FaultContext, FaultError, FaultType, ResourceKind};
use rand::rngs::StdRng;
use rand::Rng;
use serde_json::Value;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::debug;

/// Chance that a concurrency fault runs the wrapped work twice
pub const DUPLICATE_EXECUTION_PROBABILITY: f64 = 0.3;

/// Marker written over corrupted values
const CORRUPTION_MARKER: &str = "__corrupted__";

/// Applies one configured fault. Each injector owns an RNG split off the manager's, so a
/// seeded manager yields reproducible faults.
#[derive(Debug)]
pub struct FaultInjector {
    context: FaultContext,
    config: FaultConfig,
    rng: StdRng,
    impact: Option<String>,
}

impl FaultInjector {
    pub(crate) fn new(context: FaultContext, config: FaultConfig, rng: StdRng) -> Self {
        Self {
            context,
            config,
            rng,
            impact: None,
        }
    }

    pub fn fault_type(&self) -> FaultType {
        self.config.fault_type
    }

    pub fn config(&self) -> &FaultConfig {
        &self.config
    }

    pub fn context(&self) -> &FaultContext {
        &self.context
    }

    /// What the last simulator did, if anything
    pub fn impact(&self) -> Option<&str> {
        self.impact.as_deref()
    }

    /// Sleep for a random duration within the configured range, then proceed
    pub async fn network_delay(&mut self) -> Duration {
        let delay = self.random_delay(
            self.config.parameters.min_delay(),
            self.config.parameters.max_delay(),
        );
        debug!(
            component = %self.context.component,
            method = %self.context.method,
            delay_ms = delay.as_millis() as u64,
            "🐌 Injecting network delay"
        );
        tokio::time::sleep(delay).await;
        self.impact = Some(format!("delayed {}ms", delay.as_millis()));
        delay
    }

    pub fn network_failure(&mut self) -> Result<(), FaultError> {
        let message = self.message_or("simulated network failure");
        self.impact = Some("network request failed".to_string());
        Err(FaultError::NetworkFailure(message))
    }

    /// Memory and disk exhaustion fail immediately; CPU pressure busy-loops and proceeds.
    pub fn resource_exhaustion(&mut self) -> Result<(), FaultError> {
        match self.config.parameters.resource {
            ResourceKind::Cpu => {
                let burn = self.config.parameters.cpu_burn();
                let started = Instant::now();
                while started.elapsed() < burn {
                    std::hint::spin_loop();
                }
                self.impact = Some(format!("burned cpu for {}ms", burn.as_millis()));
                Ok(())
            }
            resource => {
                let message = self.message_or(&format!("simulated {resource} exhaustion"));
                self.impact = Some(format!("{resource} exhausted"));
                Err(FaultError::ResourceExhausted { resource, message })
            }
        }
    }

    /// Mutate one element of a map, sequence or string. Returns whether anything changed.
    pub fn corrupt_data(&mut self, data: &mut Value) -> bool {
        let corrupted = match data {
            Value::Object(map) if !map.is_empty() => {
                let index = self.rng.gen_range(0..map.len());
                match map.values_mut().nth(index) {
                    Some(value) => {
                        *value = Value::String(CORRUPTION_MARKER.to_string());
                        true
                    }
                    None => false,
                }
            }
            Value::Array(items) if !items.is_empty() => {
                let index = self.rng.gen_range(0..items.len());
                items[index] = Value::String(CORRUPTION_MARKER.to_string());
                true
            }
            Value::String(text) if !text.is_empty() => {
                let mut chars: Vec<char> = text.chars().collect();
                let index = self.rng.gen_range(0..chars.len());
                chars[index] = if chars[index] == '\u{FFFD}' { '?' } else { '\u{FFFD}' };
                *text = chars.into_iter().collect();
                true
            }
            Value::Number(number) => {
                let flipped = number.as_f64().map(|n| -n - 1.0).unwrap_or(-1.0);
                match serde_json::Number::from_f64(flipped) {
                    Some(n) => {
                        *number = n;
                        true
                    }
                    None => false,
                }
            }
            Value::Bool(flag) => {
                *flag = !*flag;
                true
            }
            _ => false,
        };

        if corrupted {
            self.impact = Some("data corrupted".to_string());
        }
        corrupted
    }

    /// Delay randomly, then run `work`, sometimes twice to simulate duplicate execution.
    /// The result of the final run is returned.
    pub async fn concurrency_issue<F, Fut, T>(&mut self, mut work: F) -> T
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = T>,
    {
        let delay = self.random_delay(Duration::ZERO, self.config.parameters.max_delay());
        tokio::time::sleep(delay).await;

        let duplicate = self.rng.gen_bool(DUPLICATE_EXECUTION_PROBABILITY);
        if duplicate {
            debug!(
                component = %self.context.component,
                method = %self.context.method,
                "👯 Injecting duplicate execution"
            );
            let _ = work().await;
            self.impact = Some(format!(
                "delayed {}ms and executed twice",
                delay.as_millis()
            ));
        } else {
            self.impact = Some(format!("delayed {}ms", delay.as_millis()));
        }
        work().await
    }

    /// Wait out the configured timeout, then fail
    pub async fn timeout(&mut self) -> Result<(), FaultError> {
        let timeout = self.config.parameters.timeout();
        tokio::time::sleep(timeout).await;
        self.impact = Some(format!("timed out after {}ms", timeout.as_millis()));
        Err(FaultError::Timeout(timeout))
    }

    pub fn exception(&mut self) -> Result<(), FaultError> {
        let message = self.message_or("simulated exception");
        self.impact = Some("raised exception".to_string());
        Err(FaultError::Exception(message))
    }

    /// Run the configured custom callback, if any
    pub fn custom(&mut self) -> Result<(), FaultError> {
        match self.config.custom.clone() {
            Some(fault) => {
                self.impact = Some("custom fault".to_string());
                fault(&self.context)
            }
            None => Ok(()),
        }
    }

    /// Apply the configured fault without access to the caller's data or work.
    /// Data corruption is a no-op here; concurrency issues only delay.
    pub async fn inject(&mut self) -> Result<(), FaultError> {
        if self.config.custom.is_some() {
            return self.custom();
        }

        match self.config.fault_type {
            FaultType::NetworkDelay => {
                self.network_delay().await;
                Ok(())
            }
            FaultType::NetworkFailure => self.network_failure(),
            FaultType::ResourceExhaustion => self.resource_exhaustion(),
            FaultType::Exception => self.exception(),
            FaultType::Timeout => self.timeout().await,
            FaultType::DataCorruption => Ok(()),
            FaultType::ConcurrencyIssue => {
                let delay = self.random_delay(Duration::ZERO, self.config.parameters.max_delay());
                tokio::time::sleep(delay).await;
                self.impact = Some(format!("delayed {}ms", delay.as_millis()));
                Ok(())
            }
            FaultType::StateInconsistency => {
                self.impact = Some("state diverged".to_string());
                Err(FaultError::StateInconsistency(
                    self.message_or("simulated state inconsistency"),
                ))
            }
            FaultType::ObserverFailure => {
                self.impact = Some("observer failed".to_string());
                Err(FaultError::ObserverFailure(
                    self.message_or("simulated observer failure"),
                ))
            }
            FaultType::ConfigDrift => {
                self.impact = Some("configuration drifted".to_string());
                Err(FaultError::ConfigDrift(
                    self.message_or("simulated configuration drift"),
                ))
            }
        }
    }

    fn random_delay(&mut self, min: Duration, max: Duration) -> Duration {
        if max <= min {
            return min;
        }
        let millis = self
            .rng
            .gen_range(min.as_millis() as u64..=max.as_millis() as u64);
        Duration::from_millis(millis)
    }

    fn message_or(&self, default: &str) -> String {
        self.config
            .parameters
            .message
            .clone()
            .unwrap_or_else(|| default.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn injector(config: FaultConfig) -> FaultInjector {
        let context = FaultContext {
            component: "parameter_extractor".to_string(),
            method: "extract".to_string(),
            fault_type: config.fault_type,
        };
        FaultInjector::new(context, config, StdRng::seed_from_u64(7))
    }

    #[tokio::test]
    async fn test_network_delay_within_range() {
        let config = FaultConfig::new(FaultType::NetworkDelay, 1.0)
            .with_delay_range(Duration::from_millis(5), Duration::from_millis(20));
        let mut injector = injector(config);

        let delay = injector.network_delay().await;
        assert!(delay >= Duration::from_millis(5));
        assert!(delay <= Duration::from_millis(20));
        assert!(injector.impact().is_some());
    }

    #[test]
    fn test_network_failure_uses_message() {
        let config =
            FaultConfig::new(FaultType::NetworkFailure, 1.0).with_message("upstream unreachable");
        let mut injector = injector(config);

        assert_eq!(
            injector.network_failure(),
            Err(FaultError::NetworkFailure("upstream unreachable".to_string()))
        );
    }

    #[test]
    fn test_resource_exhaustion_kinds() {
        let mut memory = injector(FaultConfig::new(FaultType::ResourceExhaustion, 1.0));
        assert!(matches!(
            memory.resource_exhaustion(),
            Err(FaultError::ResourceExhausted {
                resource: ResourceKind::Memory,
                ..
            })
        ));

        let mut config =
            FaultConfig::new(FaultType::ResourceExhaustion, 1.0).with_resource(ResourceKind::Cpu);
        config.parameters.cpu_burn_ms = 5;
        let mut cpu = injector(config);
        assert!(cpu.resource_exhaustion().is_ok());
    }

    #[test]
    fn test_corrupt_data_changes_one_element() {
        let mut injector = injector(FaultConfig::new(FaultType::DataCorruption, 1.0));

        let mut map = json!({"a": 1, "b": 2, "c": 3});
        assert!(injector.corrupt_data(&mut map));
        let corrupted = map
            .as_object()
            .unwrap()
            .values()
            .filter(|v| v.as_str() == Some(CORRUPTION_MARKER))
            .count();
        assert_eq!(corrupted, 1);

        let mut text = json!("hello");
        assert!(injector.corrupt_data(&mut text));
        assert_ne!(text, json!("hello"));
        assert_eq!(text.as_str().unwrap().chars().count(), 5);

        let mut empty = json!([]);
        assert!(!injector.corrupt_data(&mut empty));
        let mut null = Value::Null;
        assert!(!injector.corrupt_data(&mut null));
    }

    #[tokio::test]
    async fn test_concurrency_issue_runs_work_once_or_twice() {
        let config = FaultConfig::new(FaultType::ConcurrencyIssue, 1.0)
            .with_delay_range(Duration::ZERO, Duration::from_millis(2));
        let mut injector = injector(config);
        let runs = Arc::new(AtomicUsize::new(0));

        let mut total_runs = 0;
        for _ in 0..50 {
            runs.store(0, Ordering::SeqCst);
            let counter = Arc::clone(&runs);
            let result = injector
                .concurrency_issue(|| {
                    let counter = Arc::clone(&counter);
                    async move { counter.fetch_add(1, Ordering::SeqCst) + 1 }
                })
                .await;
            let executed = runs.load(Ordering::SeqCst);
            assert!(executed == 1 || executed == 2);
            assert_eq!(result, executed);
            total_runs += executed;
        }
        // Some duplicates, but not always
        assert!(total_runs > 50 && total_runs < 100);
    }

    #[test]
    fn test_custom_fault_receives_context() {
        let config = FaultConfig::new(FaultType::Exception, 1.0).with_custom(|ctx| {
            Err(FaultError::Custom(format!("{}.{}", ctx.component, ctx.method)))
        });
        let mut injector = injector(config);

        assert_eq!(
            injector.custom(),
            Err(FaultError::Custom("parameter_extractor.extract".to_string()))
        );
    }

    #[tokio::test]
    async fn test_inject_dispatches_on_fault_type() {
        let mut drift = injector(FaultConfig::new(FaultType::ConfigDrift, 1.0));
        assert!(matches!(drift.inject().await, Err(FaultError::ConfigDrift(_))));

        let mut corruption = injector(FaultConfig::new(FaultType::DataCorruption, 1.0));
        assert!(corruption.inject().await.is_ok());
    }
}
