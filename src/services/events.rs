//! Event system for learnplace operations
//!
//! Services emit an event after every successful write. Listeners use them
//! for audit logging and cache invalidation on the host side.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, trace};

use crate::model::{BlockKind, Container};

/// Events emitted by services
#[derive(Debug, Clone, PartialEq)]
pub enum LearnplaceEvent {
    LearnplaceCreated {
        id: i64,
        object_id: i64,
    },
    LearnplaceDeleted {
        id: i64,
    },

    BlockCreated {
        id: i64,
        kind: BlockKind,
    },
    BlockUpdated {
        id: i64,
    },
    BlockDeleted {
        id: i64,
        container: Option<Container>,
    },

    /// The block order of a container was written
    SequenceRegenerated {
        container: Container,
        block_count: usize,
        detached: usize,
    },

    ConfigurationStored {
        object_id: i64,
    },
}

/// Trait for event listeners
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &LearnplaceEvent);
}

/// Event bus for broadcasting learnplace events
pub struct EventBus {
    sender: broadcast::Sender<LearnplaceEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all subscribers
    pub fn emit(&self, event: LearnplaceEvent) {
        trace!(event = ?event, "Emitting learnplace event");
        // No subscribers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LearnplaceEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Logging event listener for audit trails
pub struct LoggingEventListener;

impl EventListener for LoggingEventListener {
    fn on_event(&self, event: &LearnplaceEvent) {
        match event {
            LearnplaceEvent::LearnplaceCreated { id, object_id } => {
                info!(id, object_id, "Learnplace created");
            }
            LearnplaceEvent::LearnplaceDeleted { id } => {
                info!(id, "Learnplace deleted");
            }
            LearnplaceEvent::BlockCreated { id, kind } => {
                debug!(id, kind = %kind, "Block created");
            }
            LearnplaceEvent::BlockDeleted { id, container } => {
                debug!(id, container = ?container, "Block deleted");
            }
            LearnplaceEvent::SequenceRegenerated { container, block_count, detached } => {
                debug!(container = %container, block_count, detached, "Sequence regenerated");
            }
            _ => {
                trace!(event = ?event, "Learnplace event");
            }
        }
    }
}

/// Spawn a background task that logs all events
pub fn spawn_logging_listener(event_bus: Arc<EventBus>) -> tokio::task::JoinHandle<()> {
    let mut receiver = event_bus.subscribe();
    let listener = LoggingEventListener;

    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => listener.on_event(&event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    debug!(skipped = n, "Event listener lagged, skipped events");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed, stopping listener");
                    break;
                }
            }
        }
    })
}

/// Drain everything already queued for `receiver`
pub fn drain(receiver: &mut broadcast::Receiver<LearnplaceEvent>) -> Vec<LearnplaceEvent> {
    let mut events = Vec::new();
    loop {
        match receiver.try_recv() {
            Ok(event) => events.push(event),
            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_event_bus_emit_receive() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();

        bus.emit(LearnplaceEvent::BlockCreated { id: 4, kind: BlockKind::Video });

        let event = timeout(Duration::from_millis(100), receiver.recv())
            .await
            .expect("timeout")
            .expect("receive error");
        assert_eq!(event, LearnplaceEvent::BlockCreated { id: 4, kind: BlockKind::Video });
    }

    #[test]
    fn test_event_bus_no_subscribers() {
        let bus = EventBus::new();
        bus.emit(LearnplaceEvent::LearnplaceDeleted { id: 1 });
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_drain_collects_in_order() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();
        bus.emit(LearnplaceEvent::BlockUpdated { id: 1 });
        bus.emit(LearnplaceEvent::BlockUpdated { id: 2 });

        assert_eq!(
            drain(&mut receiver),
            vec![
                LearnplaceEvent::BlockUpdated { id: 1 },
                LearnplaceEvent::BlockUpdated { id: 2 },
            ]
        );
        assert!(drain(&mut receiver).is_empty());
    }

    #[tokio::test]
    async fn test_listener_finishes_queue_after_bus_dropped() {
        let bus = Arc::new(EventBus::new());
        let mut witness = bus.subscribe();
        let listener = spawn_logging_listener(bus.clone());

        bus.emit(LearnplaceEvent::BlockUpdated { id: 1 });
        bus.emit(LearnplaceEvent::LearnplaceDeleted { id: 2 });
        drop(bus);

        timeout(Duration::from_millis(500), listener)
            .await
            .expect("listener did not stop")
            .expect("listener panicked");
        assert_eq!(witness.recv().await.unwrap(), LearnplaceEvent::BlockUpdated { id: 1 });
        assert_eq!(witness.recv().await.unwrap(), LearnplaceEvent::LearnplaceDeleted { id: 2 });
        assert!(matches!(witness.recv().await, Err(broadcast::error::RecvError::Closed)));
    }
}
