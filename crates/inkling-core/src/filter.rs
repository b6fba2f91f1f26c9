//! View derivation: filter state and the pure note-list filter.
//!
//! `derive_view` is a pure function from (snapshot, filter state) to the
//! list of notes to display. It only filters: the snapshot order
//! established by the sync cache (`updated_at` descending) is preserved.

use serde::{Deserialize, Serialize};

use crate::models::Note;

// =============================================================================
// FILTER STATE
// =============================================================================

/// Which notebook the note list is scoped to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotebookFilter {
    /// All notes, regardless of notebook.
    #[default]
    All,
    /// Notes with no notebook assignment.
    Uncategorized,
    /// Notes in one specific notebook. A stale id (deleted notebook)
    /// simply matches nothing.
    Notebook(String),
}

impl NotebookFilter {
    /// The notebook id a newly created note should carry under this filter.
    pub fn target_notebook_id(&self) -> Option<String> {
        match self {
            NotebookFilter::Notebook(id) => Some(id.clone()),
            NotebookFilter::All | NotebookFilter::Uncategorized => None,
        }
    }

    fn matches(&self, note: &Note) -> bool {
        match self {
            NotebookFilter::All => true,
            NotebookFilter::Uncategorized => note.notebook_id.is_none(),
            NotebookFilter::Notebook(id) => note.notebook_id.as_deref() == Some(id.as_str()),
        }
    }
}

/// Transient, client-only filter state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterState {
    pub notebook: NotebookFilter,
    pub search_term: String,
}

impl FilterState {
    pub fn new(notebook: NotebookFilter, search_term: impl Into<String>) -> Self {
        Self {
            notebook,
            search_term: search_term.into(),
        }
    }
}

// =============================================================================
// VIEW DERIVATION
// =============================================================================

fn matches_search(note: &Note, needle: &str) -> bool {
    note.title.to_lowercase().contains(needle) || note.content.to_lowercase().contains(needle)
}

/// Derive the visible note list from the current snapshot and filter state.
///
/// Applies the notebook predicate, then the search predicate (trimmed,
/// case-folded substring over title or content). Never re-sorts. An empty
/// snapshot or no matches yields an empty list.
pub fn derive_view(notes: &[Note], filter: &FilterState) -> Vec<Note> {
    let needle = filter.search_term.trim().to_lowercase();

    notes
        .iter()
        .filter(|note| filter.notebook.matches(note))
        .filter(|note| needle.is_empty() || matches_search(note, &needle))
        .cloned()
        .collect()
}
