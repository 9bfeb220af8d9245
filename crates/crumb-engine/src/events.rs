//! Engine event bus: typed events from every loop.
//!
//! The EventBus is a `tokio::sync::broadcast` channel that carries
//! [`EngineEvent`] values. Loops emit into it; the binary, tests, or any other
//! observer subscribe independently. When no subscribers exist, events are
//! silently dropped.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Default channel capacity.
pub const DEFAULT_CAPACITY: usize = 256;

/// Every event the engine emits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EngineEvent {
    /// A loop task was spawned.
    LoopStarted { loop_name: String },
    /// A loop task ended, either on cancellation or because the session died.
    LoopStopped { loop_name: String, reason: String },
    /// The golden cookie was clicked. Rate limited, so not every click produces one.
    GoldenCookieClicked { timestamp: String },
    /// A purchase loop could not enumerate its collection this cycle.
    EnumerationFailed {
        loop_name: String,
        selector: String,
        error: String,
    },
    /// A cadence parameter drifted upward.
    CadenceRaised { parameter: String, value: f64 },
    /// The long-lived click target went stale and was found again.
    TargetReacquired { selector: String },
    /// The supervisor began tearing the session down.
    ShutdownStarted { reason: String },
}

/// The central event bus.
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all subscribers. Silently ignores if no subscribers.
    pub fn emit(&self, event: EngineEvent) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to receive all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Seconds since the Unix epoch, as text.
pub fn now_timestamp() -> String {
    let dur = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}", dur.as_secs())
}
