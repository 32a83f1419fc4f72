//! Time-weighted SLA figures from a component's status history.

use crate::health::HealthStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A status the component entered at `timestamp`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub timestamp: DateTime<Utc>,
    pub status: HealthStatus,
}

/// SLA figures for one component over a trailing window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlaMetrics {
    pub component: String,
    pub window_hours: f64,
    /// Percentage of the window spent operational, healthy or degraded (0.0 - 100.0)
    pub uptime_percentage: f64,
    pub average_latency_ms: Option<f64>,
    pub average_error_rate: Option<f64>,
    pub current_status: HealthStatus,
    pub calculated_at: DateTime<Utc>,
}

/// Percentage of `[window_start, now]` spent in an operational status
/// (`Healthy` or `Degraded`).
///
/// `history` is ordered oldest first. Time before the oldest retained entry is not
/// counted, so the effective window starts at the later of the two.
pub fn time_weighted_uptime(
    history: &VecDeque<StatusChange>,
    window_start: DateTime<Utc>,
    now: DateTime<Utc>,
) -> f64 {
    let Some(first) = history.front() else {
        return 0.0;
    };

    let start = window_start.max(first.timestamp);
    if now <= start {
        let operational = history.back().is_some_and(|change| change.status.is_operational());
        return if operational {
            100.0
        } else {
            0.0
        };
    }

    let mut up_ms: i64 = 0;
    for (index, change) in history.iter().enumerate() {
        let segment_end = history
            .get(index + 1)
            .map(|next| next.timestamp)
            .unwrap_or(now)
            .min(now);
        let segment_start = change.timestamp.max(start);
        if segment_end <= segment_start || !change.status.is_operational() {
            continue;
        }
        up_ms += (segment_end - segment_start).num_milliseconds();
    }

    let total_ms = (now - start).num_milliseconds().max(1);
    (up_ms as f64 / total_ms as f64 * 100.0).clamp(0.0, 100.0)
}
