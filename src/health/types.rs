//! Health status, metric samples and per-component health snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::time::Duration;

/// Health of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
    Critical,
    /// Registered but not evaluated yet
    Unknown,
}

impl HealthStatus {
    /// Ordering used for worst-of aggregation (0 = healthy)
    pub fn severity(&self) -> u8 {
        match self {
            HealthStatus::Healthy => 0,
            HealthStatus::Unknown => 1,
            HealthStatus::Degraded => 2,
            HealthStatus::Unhealthy => 3,
            HealthStatus::Critical => 4,
        }
    }

    /// Check if the status still allows normal operation
    pub fn is_operational(&self) -> bool {
        matches!(self, HealthStatus::Healthy | HealthStatus::Degraded)
    }

    /// Worst status of a set; `Unknown` when the set is empty
    pub fn worst_of<I>(statuses: I) -> HealthStatus
    where
        I: IntoIterator<Item = HealthStatus>,
    {
        statuses
            .into_iter()
            .max_by_key(HealthStatus::severity)
            .unwrap_or(HealthStatus::Unknown)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Unhealthy => "unhealthy",
            HealthStatus::Critical => "critical",
            HealthStatus::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// Kinds of metric tracked per component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    /// Milliseconds
    Latency,
    /// Fraction of failed operations (0.0 - 1.0)
    ErrorRate,
    Throughput,
    /// Megabytes
    MemoryUsage,
    QueueDepth,
    /// 1.0 connected, 0.0 disconnected
    ConnectionStatus,
}

impl MetricType {
    pub const ALL: [MetricType; 6] = [
        MetricType::Latency,
        MetricType::ErrorRate,
        MetricType::Throughput,
        MetricType::MemoryUsage,
        MetricType::QueueDepth,
        MetricType::ConnectionStatus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Latency => "latency",
            MetricType::ErrorRate => "error_rate",
            MetricType::Throughput => "throughput",
            MetricType::MemoryUsage => "memory_usage",
            MetricType::QueueDepth => "queue_depth",
            MetricType::ConnectionStatus => "connection_status",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of an anomaly or active issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyLevel {
    Warning,
    Critical,
}

impl fmt::Display for AnomalyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnomalyLevel::Warning => f.write_str("warning"),
            AnomalyLevel::Critical => f.write_str("critical"),
        }
    }
}

/// A single metric sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthMetric {
    pub timestamp: DateTime<Utc>,
    pub metric_type: MetricType,
    pub value: f64,
    pub component: String,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

/// Where an active issue came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSource {
    /// A health check at or beyond its failure threshold
    Check,
    /// A metric average beyond its threshold
    Metric,
}

/// An active problem on a component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthIssue {
    pub source: IssueSource,
    /// Check name or metric type name
    pub key: String,
    pub level: AnomalyLevel,
    pub description: String,
    pub since: DateTime<Utc>,
}

/// Health snapshot of one registered component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    pub registered_at: DateTime<Utc>,
    pub last_check: Option<DateTime<Utc>>,
    /// Highest consecutive-failure count across the component's checks
    pub consecutive_failures: u32,
    /// Bounded sample history per metric type, oldest first
    pub metrics: HashMap<MetricType, VecDeque<HealthMetric>>,
    pub issues: Vec<HealthIssue>,
}

impl ComponentHealth {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Unknown,
            registered_at: Utc::now(),
            last_check: None,
            consecutive_failures: 0,
            metrics: HashMap::new(),
            issues: Vec::new(),
        }
    }

    /// Append a sample, evicting the oldest once `capacity` is reached
    pub fn push_metric(&mut self, metric: HealthMetric, capacity: usize) {
        let history = self.metrics.entry(metric.metric_type).or_default();
        while history.len() >= capacity.max(1) {
            history.pop_front();
        }
        history.push_back(metric);
    }

    /// Most recent sample of a metric type
    pub fn latest(&self, metric_type: MetricType) -> Option<&HealthMetric> {
        self.metrics.get(&metric_type).and_then(|history| history.back())
    }

    /// Average of the samples recorded within `window` of `now`
    pub fn average_since(
        &self,
        metric_type: MetricType,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Option<f64> {
        let cutoff = chrono::Duration::from_std(window)
            .ok()
            .and_then(|span| now.checked_sub_signed(span))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let history = self.metrics.get(&metric_type)?;
        let (sum, count) = history
            .iter()
            .filter(|sample| sample.timestamp >= cutoff)
            .fold((0.0, 0usize), |(sum, count), sample| (sum + sample.value, count + 1));

        if count == 0 {
            None
        } else {
            Some(sum / count as f64)
        }
    }

    pub fn has_check_issue(&self) -> bool {
        self.issues
            .iter()
            .any(|issue| issue.source == IssueSource::Check)
    }

    pub fn issue_descriptions(&self) -> Vec<String> {
        self.issues
            .iter()
            .map(|issue| issue.description.clone())
            .collect()
    }
}
