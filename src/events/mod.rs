//! # Reliability Signals
//!
//! Health changes, anomalies, chain breaks and recoveries are delivered as typed
//! [`ReliabilityEvent`]s over a broadcast channel. Collaborators subscribe instead of
//! polling.

pub mod publisher;
pub mod types;

pub use publisher::{EventPublisher, PublishedEvent};
pub use types::ReliabilityEvent;
