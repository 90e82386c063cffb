//! Event types for the widget event system
//!
//! Provides the shared event definition and EventBus used by widget
//! instances to notify external observers (renderers, analytics).

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Widget lifecycle events
///
/// Events are broadcast via EventBus and can be serialized for transmission
/// to observers outside the process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WidgetEvent {
    /// A new identification submission began
    ///
    /// Fire-and-forget notification; observers never respond.
    IdentificationStarted {
        /// Widget instance that submitted
        instance_id: Uuid,
        /// Number of images in the submission
        image_count: usize,
        /// Backend wire format name (`pn`, `c4c`, `carp`)
        backend: String,
        /// When submission started
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The in-flight identification produced a result batch
    IdentificationCompleted {
        instance_id: Uuid,
        /// Number of candidates in the batch
        result_count: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The in-flight identification failed
    IdentificationFailed {
        instance_id: Uuid,
        /// Human-readable error message shown to the user
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Widget returned to its initial state
    WidgetReset {
        instance_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl WidgetEvent {
    /// Instance that emitted this event
    pub fn instance_id(&self) -> Uuid {
        match self {
            WidgetEvent::IdentificationStarted { instance_id, .. }
            | WidgetEvent::IdentificationCompleted { instance_id, .. }
            | WidgetEvent::IdentificationFailed { instance_id, .. }
            | WidgetEvent::WidgetReset { instance_id, .. } => *instance_id,
        }
    }
}

/// Central event distribution bus
///
/// Thin wrapper around `tokio::sync::broadcast`. Cloning the bus shares the
/// underlying channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<WidgetEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    ///
    /// # Examples
    ///
    /// ```
    /// use aitax_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(16);
    /// assert_eq!(event_bus.capacity(), 16);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<WidgetEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: WidgetEvent,
    ) -> Result<usize, broadcast::error::SendError<WidgetEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: WidgetEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
