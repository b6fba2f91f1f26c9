//! The client facade: the boundary the presentation layer talks to.
//!
//! The renderer pulls [`ViewState`] whenever an event on the bus tells it
//! something changed, and pushes user intents through the methods below.
//! All state it receives is derived: snapshots from the session's caches,
//! the visible note list from the pure filter, selection and editor state
//! from the coordinator.

use std::sync::Arc;

use tokio::sync::broadcast;

use inkling_core::{
    derive_view, ClientEvent, EditorState, Error, EventBus, FilterState, IdentityProvider, Note,
    NoteDraft, Notebook, NotebookFilter, RemoteStore, Result, SessionState,
};

use crate::config::ClientConfig;
use crate::coordinator::MutationCoordinator;
use crate::session::SessionController;

/// Everything the presentation layer needs to render one frame.
#[derive(Debug, Clone)]
pub struct ViewState {
    pub session: SessionState,
    /// Notebooks, sorted by name ascending.
    pub notebooks: Vec<Notebook>,
    /// Visible notes: snapshot order (updated_at descending) with the
    /// current notebook and search filters applied.
    pub notes: Vec<Note>,
    pub active_draft: Option<NoteDraft>,
    pub editor: EditorState,
    pub is_saving: bool,
    /// Sticky sync errors, scoped per collection.
    pub notebooks_error: Option<Error>,
    pub notes_error: Option<Error>,
}

/// The note-taking client core.
pub struct NotesClient {
    session: SessionController,
    coordinator: MutationCoordinator,
    filter: FilterState,
    events: EventBus,
}

impl NotesClient {
    pub fn new(store: Arc<dyn RemoteStore>, provider: Arc<dyn IdentityProvider>) -> Self {
        Self::with_config(store, provider, ClientConfig::default())
    }

    pub fn with_config(
        store: Arc<dyn RemoteStore>,
        provider: Arc<dyn IdentityProvider>,
        config: ClientConfig,
    ) -> Self {
        let events = EventBus::new(config.event_capacity);
        Self {
            session: SessionController::new(store.clone(), provider, events.clone()),
            coordinator: MutationCoordinator::new(store, events.clone(), config.new_note_title),
            filter: FilterState::default(),
            events,
        }
    }

    /// Resolve the identity and open both collection subscriptions.
    pub async fn start(&mut self) -> Result<()> {
        let identity = self.session.start().await?;
        self.coordinator.set_identity(Some(identity));
        Ok(())
    }

    /// Apply any pending identity transition from the provider's change
    /// channel, tearing down and reopening as needed.
    pub async fn poll_identity(&mut self) -> Result<()> {
        self.session.poll_identity().await?;
        self.coordinator
            .set_identity(self.session.identity().cloned());
        Ok(())
    }

    /// Close both subscriptions and drop the session.
    pub fn shutdown(&mut self) {
        self.session.shutdown();
        self.coordinator.set_identity(None);
    }

    /// Derive the current view state.
    pub fn view(&self) -> ViewState {
        let notes = self
            .session
            .notes()
            .map(|cache| derive_view(&cache.snapshot(), &self.filter))
            .unwrap_or_default();

        ViewState {
            session: self.session.state().clone(),
            notebooks: self
                .session
                .notebooks()
                .map(|cache| cache.snapshot())
                .unwrap_or_default(),
            notes,
            active_draft: self.coordinator.active().cloned(),
            editor: self.coordinator.editor().clone(),
            is_saving: self.coordinator.is_saving(),
            notebooks_error: self.session.notebooks().and_then(|cache| cache.error()),
            notes_error: self.session.notes().and_then(|cache| cache.error()),
        }
    }

    /// Change notifications for re-rendering.
    pub fn events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn session(&self) -> &SessionController {
        &self.session
    }

    // ------------------------------------------------------------------
    // Intents
    // ------------------------------------------------------------------

    /// Scope the note list to a notebook. Resets the active selection
    /// (discarding any unsaved draft) but keeps the search term.
    pub fn select_notebook(&mut self, notebook: NotebookFilter) {
        self.coordinator.clear_selection();
        self.filter.notebook = notebook;
    }

    pub fn set_search_term(&mut self, term: &str) {
        self.filter.search_term = term.to_string();
    }

    /// Make a synced note the active selection.
    pub fn select_note(&mut self, note: &Note) {
        self.coordinator.select_note(note);
    }

    /// Buffer edits into the active draft.
    pub fn edit_draft(&mut self, title: Option<String>, content: Option<String>) {
        self.coordinator.edit_draft(title, content);
    }

    /// Create a notebook; returns its server id, or `None` when skipped.
    pub async fn add_notebook(&mut self, name: &str) -> Result<Option<String>> {
        self.coordinator.create_notebook(name).await
    }

    /// Create a note under the current notebook filter and select it.
    pub async fn add_note(&mut self) -> Result<Option<String>> {
        let notebook = self.filter.notebook.clone();
        self.coordinator.create_note(&notebook).await
    }

    /// Save the active draft.
    pub async fn save_active_note(&mut self) -> Result<()> {
        self.coordinator.save_active().await
    }

    /// Delete a note; idempotent.
    pub async fn delete_note(&mut self, note_id: &str) -> Result<()> {
        self.coordinator.delete_note(note_id).await
    }
}
