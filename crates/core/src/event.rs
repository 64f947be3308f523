//! Engine event system — lets the owning process observe the loop.
//!
//! Events are published when a cycle completes, an action times out or
//! fails, a reflex runs, or the loop stops. Subscribers filter for what
//! they care about.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All engine events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EngineEvent {
    /// A deliberation cycle finished without degradation.
    /// `production` is `None` when nothing matched.
    CycleCompleted {
        cycle: u64,
        production: Option<String>,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A production's action exceeded its timeout and was abandoned.
    ActionTimedOut {
        cycle: u64,
        production: String,
        timeout_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A production's action returned an error.
    ActionFailed {
        cycle: u64,
        production: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },

    /// A reflex predicate held and its action ran.
    ReflexFired {
        reflex: String,
        forced: bool,
        timestamp: DateTime<Utc>,
    },

    /// A reflex action returned an error.
    ReflexFailed {
        reflex: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },

    /// The deliberation loop ended.
    LoopStopped {
        reason: StopReason,
        cycles: u64,
        timestamp: DateTime<Utc>,
    },
}

/// Why the deliberation loop ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StopReason {
    /// Cooperative cancellation by the owning process.
    Cancelled,
    /// A coordination failure.
    Fatal { message: String },
}

/// A broadcast-based event bus for engine events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub. Slow
/// subscribers lag rather than block the loop.
pub struct EventBus {
    sender: broadcast::Sender<Arc<EngineEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: EngineEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<EngineEvent>> {
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

        bus.publish(EngineEvent::ActionTimedOut {
            cycle: 3,
            production: "slow".into(),
            timeout_ms: 50,
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            EngineEvent::ActionTimedOut {
                production,
                timeout_ms,
                ..
            } => {
                assert_eq!(production, "slow");
                assert_eq!(*timeout_ms, 50);
            }
            _ => panic!("Expected ActionTimedOut event"),
        }
    }

    #[test]
    fn event_bus_no_subscribers_doesnt_panic() {
        let bus = EventBus::new(16);
        bus.publish(EngineEvent::LoopStopped {
            reason: StopReason::Cancelled,
            cycles: 0,
            timestamp: Utc::now(),
        });
    }

    #[test]
    fn stop_reason_serialization() {
        let json = serde_json::to_string(&StopReason::Fatal {
            message: "desync".into(),
        })
        .unwrap();
        assert!(json.contains("fatal"));
        assert!(json.contains("desync"));
    }
}
