#![allow(dead_code)]

pub mod builders;
pub mod strategies;

pub use builders::*;
pub use strategies::*;

use reliability_core::events::PublishedEvent;
use reliability_core::ReliabilityEvent;
use tokio::sync::broadcast;

/// Install a test subscriber once; later calls are no-ops
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("reliability_core=debug")
        .with_test_writer()
        .try_init();
}

/// Drain every event currently buffered on `rx`
pub fn drain_events(rx: &mut broadcast::Receiver<PublishedEvent>) -> Vec<ReliabilityEvent> {
    let mut events = Vec::new();
    while let Ok(published) = rx.try_recv() {
        events.push(published.event);
    }
    events
}
