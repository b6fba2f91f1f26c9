//! Core data models for the inkling sync engine.
//!
//! These types are shared across all inkling crates and represent the
//! synced domain entities plus the client-side lifecycle states.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// IDENTITY
// =============================================================================

/// Opaque, stable user identity. Obtained once per session from the
/// identity provider; every collection path is scoped by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Identity {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// =============================================================================
// DOCUMENT FIELD NAMES
// =============================================================================

/// Field names used in notebook and note documents.
pub mod fields {
    pub const NAME: &str = "name";
    pub const TITLE: &str = "title";
    pub const CONTENT: &str = "content";
    pub const NOTEBOOK_ID: &str = "notebook_id";
    pub const CREATED_AT: &str = "created_at";
    pub const UPDATED_AT: &str = "updated_at";
}

// =============================================================================
// NOTEBOOK
// =============================================================================

/// A notebook (folder) grouping notes.
///
/// Created by explicit user action; never renamed in place. Presented
/// sorted by name ascending, case-insensitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notebook {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Notebook {
    /// Comparator for the notebook snapshot: name ascending,
    /// case-insensitive, id as tiebreak so re-sorts are stable
    /// across pushes.
    pub fn by_name(a: &Notebook, b: &Notebook) -> Ordering {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.id.cmp(&b.id))
    }
}

// =============================================================================
// NOTE
// =============================================================================

/// A note. `notebook_id` of `None` means uncategorized; a stale reference
/// to a deleted notebook is tolerated (filtering by that notebook simply
/// yields nothing).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub notebook_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Note {
    /// Comparator for the note snapshot: `updated_at` descending, notes
    /// without a timestamp last (treated as the epoch), id as tiebreak.
    pub fn by_recency(a: &Note, b: &Note) -> Ordering {
        let ta = a.updated_at.unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let tb = b.updated_at.unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        tb.cmp(&ta).then_with(|| a.id.cmp(&b.id))
    }
}

// =============================================================================
// NOTE DRAFT (active selection)
// =============================================================================

/// Local working copy of the active note. Edits buffer here until an
/// explicit save; the synced snapshot entry is untouched in the meantime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteDraft {
    pub id: String,
    pub title: String,
    pub content: String,
}

impl NoteDraft {
    pub fn new(id: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
        }
    }
}

impl From<&Note> for NoteDraft {
    fn from(note: &Note) -> Self {
        Self {
            id: note.id.clone(),
            title: note.title.clone(),
            content: note.content.clone(),
        }
    }
}

// =============================================================================
// LIFECYCLE STATES
// =============================================================================

/// Session lifecycle. `Failed` is terminal for the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SessionState {
    Unresolved,
    Resolving,
    Ready(Identity),
    Failed(String),
}

impl SessionState {
    pub fn is_ready(&self) -> bool {
        matches!(self, SessionState::Ready(_))
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionState::Ready(id) => Some(id),
            _ => None,
        }
    }
}

/// Editor lifecycle for the active note.
///
/// `Viewing(synced) → Editing(draft diverges) → Saving → Viewing` on
/// success, or `SaveFailed` with the draft retained.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum EditorState {
    Viewing,
    Editing,
    Saving,
    SaveFailed(String),
}

impl EditorState {
    pub fn is_saving(&self) -> bool {
        matches!(self, EditorState::Saving)
    }
}
