//! # Health Monitoring
//!
//! Per-component health assessment: scheduled health checks with deadlines, bounded
//! metric histories, anomaly thresholds, recovery actions and SLA figures.

pub mod check;
pub mod monitor;
pub mod sla;
pub mod thresholds;
pub mod types;

pub use check::{HealthCheck, HealthProbe};
pub use monitor::{HealthMonitor, RecoveryAction};
pub use sla::{time_weighted_uptime, SlaMetrics, StatusChange};
pub use thresholds::{AnomalyThresholds, MetricThreshold};
pub use types::{
    AnomalyLevel, ComponentHealth, HealthIssue, HealthMetric, HealthStatus, IssueSource, MetricType,
};
