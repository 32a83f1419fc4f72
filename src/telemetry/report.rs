//! Aggregated views over collected telemetry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A configuration path and its cumulative access count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotPath {
    pub path: String,
    pub access_count: u64,
}

/// Accesses to one path over a trailing window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessPattern {
    pub path: String,
    pub window_minutes: u32,
    pub access_count: usize,
    pub accesses_per_minute: f64,
    /// Start of the busiest minute in the window
    pub peak_minute: Option<DateTime<Utc>>,
    pub peak_minute_count: usize,
}

/// Latency figures for one operation, in milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationStats {
    /// Total samples recorded; the remaining figures cover retained samples
    pub count: u64,
    pub avg_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub p95_ms: f64,
}

impl OperationStats {
    /// Figures over a set of samples; `None` when there are none
    pub fn from_samples(count: u64, samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let p95_index = ((sorted.len() as f64) * 0.95) as usize;
        let p95_ms = sorted[p95_index.min(sorted.len() - 1)];
        let sum: f64 = sorted.iter().sum();

        Some(Self {
            count,
            avg_ms: sum / sorted.len() as f64,
            min_ms: sorted[0],
            max_ms: sorted[sorted.len() - 1],
            p95_ms,
        })
    }
}

/// Per-operation latency plus cache effectiveness
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub operations: BTreeMap<String, OperationStats>,
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Hits over lookups; `None` before the first lookup
    pub cache_hit_rate: Option<f64>,
}

/// Something unusual in the collected telemetry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "anomaly_type", rename_all = "snake_case")]
pub enum TelemetryAnomaly {
    AccessSpike {
        path: String,
        rate_per_minute: f64,
        threshold: f64,
    },
    HighErrorRate {
        error_rate: f64,
        threshold: f64,
    },
}

/// Full telemetry snapshot for offline analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryReport {
    pub generated_at: DateTime<Utc>,
    pub collecting_since: DateTime<Utc>,
    pub enabled: bool,
    pub buffered_events: usize,
    pub buffer_capacity: usize,
    pub total_accesses: u64,
    pub total_changes: u64,
    pub total_errors: u64,
    pub hot_paths: Vec<HotPath>,
    pub performance: PerformanceSummary,
    pub error_counts: BTreeMap<String, u64>,
    pub anomalies: Vec<TelemetryAnomaly>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_stats() {
        let samples: Vec<f64> = (1..=100).map(f64::from).collect();
        let stats = OperationStats::from_samples(100, &samples).unwrap();
        assert_eq!(stats.count, 100);
        assert_eq!(stats.min_ms, 1.0);
        assert_eq!(stats.max_ms, 100.0);
        assert!((stats.avg_ms - 50.5).abs() < f64::EPSILON);
        assert_eq!(stats.p95_ms, 96.0);

        assert!(OperationStats::from_samples(0, &[]).is_none());
    }

    #[test]
    fn test_single_sample_percentile() {
        let stats = OperationStats::from_samples(1, &[12.5]).unwrap();
        assert_eq!(stats.p95_ms, 12.5);
    }

    #[test]
    fn test_anomaly_serialization() {
        let anomaly = TelemetryAnomaly::HighErrorRate {
            error_rate: 0.5,
            threshold: 0.1,
        };
        let json = serde_json::to_value(&anomaly).unwrap();
        assert_eq!(json["anomaly_type"], "high_error_rate");
    }
}
