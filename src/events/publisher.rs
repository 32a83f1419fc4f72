use crate::events::ReliabilityEvent;
use tokio::sync::broadcast;

/// Fan-out publisher for reliability signals
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<PublishedEvent>,
}

/// Event that has been published
#[derive(Debug, Clone)]
pub struct PublishedEvent {
    pub event: ReliabilityEvent,
    pub published_at: chrono::DateTime<chrono::Utc>,
}

impl EventPublisher {
    /// Create a new event publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event. Callable from synchronous code.
    pub fn publish(&self, event: ReliabilityEvent) {
        let published = PublishedEvent {
            event,
            published_at: chrono::Utc::now(),
        };

        // send() only fails when nobody is subscribed, which is fine for signals
        if let Err(broadcast::error::SendError(unsent)) = self.sender.send(published) {
            tracing::trace!(event = unsent.event.name(), "No subscribers for reliability event");
        }
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(1000) // Default capacity of 1000 events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_without_subscribers_is_not_an_error() {
        let publisher = EventPublisher::new(8);
        publisher.publish(ReliabilityEvent::ChainRecovered {
            chain_id: "ui_updates".to_string(),
        });
        assert_eq!(publisher.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_subscriber_receives_events() {
        let publisher = EventPublisher::new(8);
        let mut rx = publisher.subscribe();

        publisher.publish(ReliabilityEvent::ChainBroken {
            chain_id: "ui_updates".to_string(),
            failed: 2,
        });

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event.name(), "chain_broken");
        assert_eq!(publisher.subscriber_count(), 1);
    }
}
