//! Client event types and event bus for change notification.
//!
//! The engine's view is pull-based (`NotesClient::view`); the bus only
//! tells consumers (renderer, telemetry, tests) *that* something changed.
//! Slow receivers that fall behind will receive a `Lagged` error and miss
//! events, which is fine: the next `view()` pull reflects everything.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::models::SessionState;
use crate::paths::CollectionKind;

/// Coarse change notification emitted by the engine.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// The session transitioned (resolving, ready, failed, torn down).
    SessionChanged { state: SessionState },
    /// A collection snapshot was replaced by a push.
    CollectionUpdated {
        collection: CollectionKind,
        count: usize,
    },
    /// A subscription delivered a failure; the cache is now sticky-failed.
    SyncFailed { collection: CollectionKind },
    /// A note became the active selection.
    NoteSelected { note_id: String },
    /// The active selection was cleared.
    SelectionCleared,
    /// A save round trip started.
    SaveStarted { note_id: String },
    /// A save round trip completed.
    SaveFinished { note_id: String },
    /// A create/update/delete command failed.
    MutationFailed {
        operation: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        entity_id: Option<String>,
        error: String,
    },
}

/// Broadcast-based event bus for distributing client events.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ClientEvent>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all subscribers. If there are no active
    /// subscribers, the event is silently dropped.
    pub fn emit(&self, event: ClientEvent) {
        tracing::trace!(?event, subscriber_count = self.tx.receiver_count(), "emit");
        let _ = self.tx.send(event);
    }

    /// Subscribe to events. Each subscriber gets its own independent stream.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.tx.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(crate::defaults::EVENT_BUS_CAPACITY)
    }
}
