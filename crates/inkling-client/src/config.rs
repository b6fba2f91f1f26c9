//! Client configuration.

use inkling_core::defaults;

/// Configuration for a [`NotesClient`](crate::NotesClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Buffer capacity for the client event bus.
    pub event_capacity: usize,
    /// Title given to freshly created notes.
    pub new_note_title: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            event_capacity: defaults::EVENT_BUS_CAPACITY,
            new_note_title: defaults::NEW_NOTE_TITLE.to_string(),
        }
    }
}

impl ClientConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `INKLING_EVENT_CAPACITY` | `256` | Event bus buffer capacity |
    /// | `INKLING_NEW_NOTE_TITLE` | `New Note` | Title for new notes |
    pub fn from_env() -> Self {
        let event_capacity = std::env::var("INKLING_EVENT_CAPACITY")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults::EVENT_BUS_CAPACITY)
            .max(1);

        let new_note_title = std::env::var("INKLING_NEW_NOTE_TITLE")
            .unwrap_or_else(|_| defaults::NEW_NOTE_TITLE.to_string());

        Self {
            event_capacity,
            new_note_title,
        }
    }

    /// Set the event bus capacity.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    /// Set the title for freshly created notes.
    pub fn with_new_note_title(mut self, title: impl Into<String>) -> Self {
        self.new_note_title = title.into();
        self
    }
}
