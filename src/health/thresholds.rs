//! Warning and critical cutoffs per metric type.

use crate::health::{AnomalyLevel, MetricType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Warning and critical cutoffs for one metric type. Values strictly above a cutoff
/// cross it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricThreshold {
    pub warning: f64,
    pub critical: f64,
}

impl MetricThreshold {
    pub fn new(warning: f64, critical: f64) -> Self {
        Self { warning, critical }
    }

    pub fn classify(&self, value: f64) -> Option<AnomalyLevel> {
        if value > self.critical {
            Some(AnomalyLevel::Critical)
        } else if value > self.warning {
            Some(AnomalyLevel::Warning)
        } else {
            None
        }
    }
}

/// Thresholds for every metric type that has them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyThresholds {
    thresholds: BTreeMap<MetricType, MetricThreshold>,
}

impl AnomalyThresholds {
    /// Latency 1000/5000 ms, error rate 5%/20%, memory 500/1000 MB, queue depth 100/500
    pub fn defaults() -> Self {
        let thresholds = [
            (MetricType::Latency, MetricThreshold::new(1000.0, 5000.0)),
            (MetricType::ErrorRate, MetricThreshold::new(0.05, 0.20)),
            (MetricType::MemoryUsage, MetricThreshold::new(500.0, 1000.0)),
            (MetricType::QueueDepth, MetricThreshold::new(100.0, 500.0)),
        ]
        .into_iter()
        .collect();
        Self { thresholds }
    }

    pub fn with_overrides(mut self, overrides: &BTreeMap<MetricType, MetricThreshold>) -> Self {
        for (metric_type, threshold) in overrides {
            self.thresholds.insert(*metric_type, *threshold);
        }
        self
    }

    pub fn get(&self, metric_type: MetricType) -> Option<&MetricThreshold> {
        self.thresholds.get(&metric_type)
    }

    pub fn set(&mut self, metric_type: MetricType, threshold: MetricThreshold) {
        self.thresholds.insert(metric_type, threshold);
    }

    /// Level crossed by a value, if any. Metric types without thresholds never cross.
    pub fn classify(&self, metric_type: MetricType, value: f64) -> Option<AnomalyLevel> {
        self.get(metric_type)
            .and_then(|threshold| threshold.classify(value))
    }
}

impl Default for AnomalyThresholds {
    fn default() -> Self {
        Self::defaults()
    }
}
