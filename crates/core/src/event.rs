//! Domain event system — decoupled communication between bounded contexts.
//!
//! Events are published when something interesting happens in a turn.
//! The interaction recorder subscribes off the critical path; publishing
//! never blocks turn completion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::metrics::MetricsSnapshot;
use crate::route::{ResponseType, Route};
use crate::state::CognitiveFlag;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A session task was started
    SessionStarted {
        session_id: String,
        timestamp: DateTime<Utc>,
    },

    /// A turn was committed
    TurnCompleted {
        session_id: String,
        turn: u32,
        route: Route,
        response_type: ResponseType,
        agents_used: Vec<String>,
        cognitive_flags: Vec<CognitiveFlag>,
        metrics: MetricsSnapshot,
        latency_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A capability call failed or timed out
    CapabilityFailed {
        session_id: String,
        capability: String,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// The synthesized response broke its contract and was repaired
    ContractRepaired {
        session_id: String,
        response_type: ResponseType,
        violations: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// A turn fell back to the scripted recovery reply; state was left untouched
    TurnRecovered {
        session_id: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A session's state was reset
    SessionReset {
        session_id: String,
        timestamp: DateTime<Utc>,
    },

    /// A session task ended
    SessionEnded {
        session_id: String,
        turns: u32,
        timestamp: DateTime<Utc>,
    },
}

impl DomainEvent {
    pub fn session_id(&self) -> &str {
        match self {
            DomainEvent::SessionStarted { session_id, .. }
            | DomainEvent::TurnCompleted { session_id, .. }
            | DomainEvent::CapabilityFailed { session_id, .. }
            | DomainEvent::ContractRepaired { session_id, .. }
            | DomainEvent::TurnRecovered { session_id, .. }
            | DomainEvent::SessionReset { session_id, .. }
            | DomainEvent::SessionEnded { session_id, .. } => session_id,
        }
    }
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
/// Slow subscribers lag and drop events rather than block publishers.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn event_bus_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(DomainEvent::CapabilityFailed {
            session_id: "s-1".into(),
            capability: "domain_knowledge".into(),
            error: "timed out".into(),
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            DomainEvent::CapabilityFailed { capability, .. } => {
                assert_eq!(capability, "domain_knowledge");
            }
            _ => panic!("Expected CapabilityFailed event"),
        }
        assert_eq!(event.session_id(), "s-1");
    }

    #[test]
    fn event_bus_no_subscribers_doesnt_panic() {
        let bus = EventBus::new(16);
        bus.publish(DomainEvent::SessionReset {
            session_id: "s".into(),
            timestamp: Utc::now(),
        });
    }
}
