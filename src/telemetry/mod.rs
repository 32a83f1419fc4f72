//! # Telemetry
//!
//! Bounded, privacy-preserving telemetry for configuration operations.
//!
//! - [`ConfigurationTelemetry`]: the collector; access, change, performance, error and
//!   cache tracking with hot-path, pattern, anomaly and report queries
//! - [`RingBuffer`]: fixed-capacity FIFO used for every retained history
//! - [`TelemetryEvent`]: the exported event shape; changed values appear only as hashes

pub mod collector;
pub mod events;
pub mod report;
pub mod ring_buffer;

pub use collector::{ConfigurationTelemetry, CONFIGURATION_COMPONENT};
pub use events::{value_hash, EventDetail, ExportFormat, TelemetryEvent};
pub use report::{
    AccessPattern, HotPath, OperationStats, PerformanceSummary, TelemetryAnomaly, TelemetryReport,
};
pub use ring_buffer::RingBuffer;
