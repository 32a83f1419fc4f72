//! # Configuration Telemetry
//!
//! Structured observability over configuration reads and writes. Every buffer is a
//! fixed-capacity ring, so memory stays bounded however long the process runs.
//! Telemetry is advisory: nothing here returns an error into application code except
//! the explicit export.

use crate::config::TelemetryConfig;
use crate::error::ReliabilityResult;
use crate::telemetry::{
    value_hash, AccessPattern, EventDetail, ExportFormat, HotPath, OperationStats,
    PerformanceSummary, RingBuffer, TelemetryAnomaly, TelemetryEvent, TelemetryReport,
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Component name stamped on configuration events
pub const CONFIGURATION_COMPONENT: &str = "configuration";

/// Trailing window used for access-spike detection
const SPIKE_WINDOW_MINUTES: i64 = 5;

/// Hot paths included in generated reports
const REPORT_HOT_PATHS: usize = 10;

#[derive(Debug, Clone)]
struct ChangeRecord {
    timestamp: DateTime<Utc>,
}

#[derive(Debug)]
struct TelemetryState {
    events: RingBuffer<TelemetryEvent>,
    access_counts: HashMap<String, u64>,
    access_times: HashMap<String, RingBuffer<DateTime<Utc>>>,
    change_log: HashMap<String, RingBuffer<ChangeRecord>>,
    performance: HashMap<String, RingBuffer<f64>>,
    performance_counts: HashMap<String, u64>,
    error_counts: HashMap<String, u64>,
    total_accesses: u64,
    total_changes: u64,
    total_errors: u64,
    cache_hits: u64,
    cache_misses: u64,
    collecting_since: DateTime<Utc>,
}

impl TelemetryState {
    fn new(buffer_size: usize) -> Self {
        Self {
            events: RingBuffer::new(buffer_size),
            access_counts: HashMap::new(),
            access_times: HashMap::new(),
            change_log: HashMap::new(),
            performance: HashMap::new(),
            performance_counts: HashMap::new(),
            error_counts: HashMap::new(),
            total_accesses: 0,
            total_changes: 0,
            total_errors: 0,
            cache_hits: 0,
            cache_misses: 0,
            collecting_since: Utc::now(),
        }
    }
}

/// Telemetry collector for configuration access, changes, performance and errors
#[derive(Debug)]
pub struct ConfigurationTelemetry {
    enabled: AtomicBool,
    settings: TelemetryConfig,
    state: Mutex<TelemetryState>,
}

impl ConfigurationTelemetry {
    pub fn new(settings: TelemetryConfig) -> Self {
        Self {
            enabled: AtomicBool::new(settings.enabled),
            state: Mutex::new(TelemetryState::new(settings.buffer_size)),
            settings,
        }
    }

    pub fn settings(&self) -> &TelemetryConfig {
        &self.settings
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Enable or disable collection. Collected state is kept either way.
    pub fn enable(&self, enabled: bool) {
        let previous = self.enabled.swap(enabled, Ordering::Relaxed);
        if previous != enabled {
            info!(enabled = enabled, "📡 Configuration telemetry toggled");
        }
    }

    /// Record a configuration read
    pub fn track_access(&self, path: &str, layer: &str, success: bool, duration: Option<Duration>) {
        if !self.is_enabled() {
            return;
        }

        let now = Utc::now();
        let mut state = self.state.lock();
        state.total_accesses += 1;
        *state.access_counts.entry(path.to_string()).or_insert(0) += 1;
        let per_path = self.settings.access_history_per_path;
        state
            .access_times
            .entry(path.to_string())
            .or_insert_with(|| RingBuffer::new(per_path))
            .push(now);

        state.events.push(TelemetryEvent {
            timestamp: now,
            component: CONFIGURATION_COMPONENT.to_string(),
            duration_ms: duration.map(|d| d.as_secs_f64() * 1000.0),
            metadata: HashMap::new(),
            detail: EventDetail::ConfigAccess {
                path: path.to_string(),
                layer: layer.to_string(),
                success,
            },
        });
    }

    /// Record a configuration write. Only content hashes of the values are kept.
    pub fn track_change(&self, path: &str, layer: &str, old_value: Option<&Value>, new_value: &Value) {
        if !self.is_enabled() {
            return;
        }

        let now = Utc::now();
        let recent_changes = {
            let mut state = self.state.lock();
            state.total_changes += 1;
            let per_path = self.settings.change_history_per_path;
            let log = state
                .change_log
                .entry(path.to_string())
                .or_insert_with(|| RingBuffer::new(per_path));
            log.push(ChangeRecord { timestamp: now });

            // Out-of-range windows count every retained change
            let window_start = i64::try_from(self.settings.frequent_change_window_seconds)
                .ok()
                .and_then(chrono::Duration::try_seconds)
                .and_then(|span| now.checked_sub_signed(span))
                .unwrap_or(DateTime::<Utc>::MIN_UTC);
            let recent = log
                .iter()
                .filter(|record| record.timestamp >= window_start)
                .count();

            state.events.push(TelemetryEvent {
                timestamp: now,
                component: CONFIGURATION_COMPONENT.to_string(),
                duration_ms: None,
                metadata: HashMap::new(),
                detail: EventDetail::ConfigChange {
                    path: path.to_string(),
                    layer: layer.to_string(),
                    old_value_hash: old_value.map(value_hash),
                    new_value_hash: value_hash(new_value),
                },
            });
            recent
        };

        if recent_changes > self.settings.frequent_change_threshold {
            warn!(
                path = %path,
                changes = recent_changes,
                window_seconds = self.settings.frequent_change_window_seconds,
                "🔁 Configuration path changing frequently"
            );
        }
    }

    /// Record the duration of a configuration operation
    pub fn track_performance(
        &self,
        operation: &str,
        duration: Duration,
        metadata: Option<HashMap<String, Value>>,
    ) {
        self.track_component_performance(CONFIGURATION_COMPONENT, operation, duration, metadata);
    }

    /// Record the duration of an operation on any component
    pub fn track_component_performance(
        &self,
        component: &str,
        operation: &str,
        duration: Duration,
        metadata: Option<HashMap<String, Value>>,
    ) {
        if !self.is_enabled() {
            return;
        }

        let duration_ms = duration.as_secs_f64() * 1000.0;
        let mut state = self.state.lock();
        let samples = self.settings.performance_samples_per_operation;
        state
            .performance
            .entry(operation.to_string())
            .or_insert_with(|| RingBuffer::new(samples))
            .push(duration_ms);
        *state
            .performance_counts
            .entry(operation.to_string())
            .or_insert(0) += 1;

        state.events.push(TelemetryEvent {
            timestamp: Utc::now(),
            component: component.to_string(),
            duration_ms: Some(duration_ms),
            metadata: metadata.unwrap_or_default(),
            detail: EventDetail::Performance {
                operation: operation.to_string(),
            },
        });
    }

    /// Record an error
    pub fn track_error(&self, error_type: &str, message: &str, context: Option<HashMap<String, Value>>) {
        self.track_component_error(CONFIGURATION_COMPONENT, error_type, message, context);
    }

    /// Record an error on any component
    pub fn track_component_error(
        &self,
        component: &str,
        error_type: &str,
        message: &str,
        context: Option<HashMap<String, Value>>,
    ) {
        if !self.is_enabled() {
            return;
        }

        let mut state = self.state.lock();
        state.total_errors += 1;
        *state.error_counts.entry(error_type.to_string()).or_insert(0) += 1;
        state.events.push(TelemetryEvent {
            timestamp: Utc::now(),
            component: component.to_string(),
            duration_ms: None,
            metadata: context.unwrap_or_default(),
            detail: EventDetail::Error {
                error_type: error_type.to_string(),
                message: message.to_string(),
            },
        });
    }

    /// Record a configuration cache lookup
    pub fn track_cache_lookup(&self, hit: bool) {
        if !self.is_enabled() {
            return;
        }

        let mut state = self.state.lock();
        if hit {
            state.cache_hits += 1;
        } else {
            state.cache_misses += 1;
        }
    }

    /// The `top_n` most accessed paths, most accessed first
    pub fn get_hot_paths(&self, top_n: usize) -> Vec<HotPath> {
        let state = self.state.lock();
        Self::hot_paths(&state, top_n)
    }

    /// Accesses to `path` over the trailing `window_minutes`
    pub fn get_access_pattern(&self, path: &str, window_minutes: u32) -> AccessPattern {
        let now = Utc::now();
        let window_start = now - chrono::Duration::minutes(i64::from(window_minutes));

        let state = self.state.lock();
        let mut per_minute: BTreeMap<i64, usize> = BTreeMap::new();
        if let Some(times) = state.access_times.get(path) {
            for timestamp in times.iter().filter(|t| **t >= window_start) {
                *per_minute.entry(timestamp.timestamp().div_euclid(60)).or_insert(0) += 1;
            }
        }
        drop(state);

        let access_count: usize = per_minute.values().sum();
        // Earliest minute wins ties
        let peak = per_minute
            .iter()
            .fold(None, |best: Option<(i64, usize)>, (minute, count)| match best {
                Some((_, best_count)) if best_count >= *count => best,
                _ => Some((*minute, *count)),
            });

        AccessPattern {
            path: path.to_string(),
            window_minutes,
            access_count,
            accesses_per_minute: if window_minutes == 0 {
                0.0
            } else {
                access_count as f64 / f64::from(window_minutes)
            },
            peak_minute: peak.and_then(|(minute, _)| DateTime::<Utc>::from_timestamp(minute * 60, 0)),
            peak_minute_count: peak.map(|(_, count)| count).unwrap_or(0),
        }
    }

    /// Per-operation latency figures plus cache hit rate
    pub fn get_performance_summary(&self) -> PerformanceSummary {
        let state = self.state.lock();
        Self::performance_summary(&state)
    }

    /// Access spikes over the last five minutes and a high global error rate
    pub fn detect_anomalies(&self) -> Vec<TelemetryAnomaly> {
        let state = self.state.lock();
        self.anomalies(&state, Utc::now())
    }

    /// Full snapshot for offline analysis
    pub fn generate_report(&self) -> TelemetryReport {
        let now = Utc::now();
        let state = self.state.lock();
        TelemetryReport {
            generated_at: now,
            collecting_since: state.collecting_since,
            enabled: self.is_enabled(),
            buffered_events: state.events.len(),
            buffer_capacity: state.events.capacity(),
            total_accesses: state.total_accesses,
            total_changes: state.total_changes,
            total_errors: state.total_errors,
            hot_paths: Self::hot_paths(&state, REPORT_HOT_PATHS),
            performance: Self::performance_summary(&state),
            error_counts: state
                .error_counts
                .iter()
                .map(|(error_type, count)| (error_type.clone(), *count))
                .collect(),
            anomalies: self.anomalies(&state, now),
        }
    }

    /// The `n` most recent events, oldest first
    pub fn recent_events(&self, n: usize) -> Vec<TelemetryEvent> {
        self.state.lock().events.latest(n)
    }

    pub fn event_count(&self) -> usize {
        self.state.lock().events.len()
    }

    /// Write buffered events to `path`, returning how many were written
    pub fn export_events(&self, path: &Path, format: ExportFormat) -> ReliabilityResult<usize> {
        let events = self.state.lock().events.to_vec();

        let mut writer = BufWriter::new(File::create(path)?);
        match format {
            ExportFormat::JsonLines => {
                for event in &events {
                    serde_json::to_writer(&mut writer, event)?;
                    writer.write_all(b"\n")?;
                }
            }
            ExportFormat::JsonArray => {
                serde_json::to_writer_pretty(&mut writer, &events)?;
            }
        }
        writer.flush()?;

        info!(
            path = %path.display(),
            format = ?format,
            events = events.len(),
            "📤 Telemetry events exported"
        );
        Ok(events.len())
    }

    /// Clear all collected state
    pub fn reset(&self) {
        *self.state.lock() = TelemetryState::new(self.settings.buffer_size);
        debug!("Configuration telemetry reset");
    }

    fn hot_paths(state: &TelemetryState, top_n: usize) -> Vec<HotPath> {
        let mut paths: Vec<HotPath> = state
            .access_counts
            .iter()
            .map(|(path, count)| HotPath {
                path: path.clone(),
                access_count: *count,
            })
            .collect();
        paths.sort_by(|a, b| {
            b.access_count
                .cmp(&a.access_count)
                .then_with(|| a.path.cmp(&b.path))
        });
        paths.truncate(top_n);
        paths
    }

    fn performance_summary(state: &TelemetryState) -> PerformanceSummary {
        let operations = state
            .performance
            .iter()
            .filter_map(|(operation, samples)| {
                let count = state.performance_counts.get(operation).copied().unwrap_or(0);
                let samples: Vec<f64> = samples.iter().copied().collect();
                OperationStats::from_samples(count, &samples).map(|stats| (operation.clone(), stats))
            })
            .collect();

        let lookups = state.cache_hits + state.cache_misses;
        PerformanceSummary {
            operations,
            cache_hits: state.cache_hits,
            cache_misses: state.cache_misses,
            cache_hit_rate: (lookups > 0).then(|| state.cache_hits as f64 / lookups as f64),
        }
    }

    fn anomalies(&self, state: &TelemetryState, now: DateTime<Utc>) -> Vec<TelemetryAnomaly> {
        let threshold = self.settings.spike_threshold_per_minute;
        let window_start = now - chrono::Duration::minutes(SPIKE_WINDOW_MINUTES);

        let mut anomalies: Vec<TelemetryAnomaly> = state
            .access_times
            .iter()
            .filter_map(|(path, times)| {
                let recent = times.iter().filter(|t| **t >= window_start).count();
                let rate = recent as f64 / SPIKE_WINDOW_MINUTES as f64;
                (rate > threshold).then(|| TelemetryAnomaly::AccessSpike {
                    path: path.clone(),
                    rate_per_minute: rate,
                    threshold,
                })
            })
            .collect();
        anomalies.sort_by(|a, b| match (a, b) {
            (
                TelemetryAnomaly::AccessSpike { path: left, .. },
                TelemetryAnomaly::AccessSpike { path: right, .. },
            ) => left.cmp(right),
            _ => std::cmp::Ordering::Equal,
        });

        if state.total_accesses > 0 {
            let error_rate = state.total_errors as f64 / state.total_accesses as f64;
            if error_rate > self.settings.error_rate_threshold {
                anomalies.push(TelemetryAnomaly::HighErrorRate {
                    error_rate,
                    threshold: self.settings.error_rate_threshold,
                });
            }
        }

        anomalies
    }
}

impl Default for ConfigurationTelemetry {
    fn default() -> Self {
        Self::new(TelemetryConfig::default())
    }
}
