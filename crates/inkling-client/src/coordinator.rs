//! Mutation coordinator: user intents become remote commands, and the
//! active-note selection stays consistent with them.
//!
//! The coordinator never touches the snapshots owned by the sync caches.
//! Writes go to the remote store and surface back through the
//! subscription channel; the one sanctioned exception is the optimistic
//! selection of a freshly created note.

use std::sync::Arc;

use tracing::{debug, info, warn};

use inkling_core::{
    models::fields, ClientEvent, CollectionKind, CollectionPath, DocumentFields, EditorState,
    Error, EventBus, FieldValue, Identity, Note, NoteDraft, NotebookFilter, RemoteStore, Result,
};

pub struct MutationCoordinator {
    store: Arc<dyn RemoteStore>,
    events: EventBus,
    new_note_title: String,
    identity: Option<Identity>,
    active: Option<NoteDraft>,
    editor: EditorState,
}

impl MutationCoordinator {
    pub fn new(store: Arc<dyn RemoteStore>, events: EventBus, new_note_title: String) -> Self {
        Self {
            store,
            events,
            new_note_title,
            identity: None,
            active: None,
            editor: EditorState::Viewing,
        }
    }

    /// Adopt the session's identity. A change of identity (including
    /// sign-out) drops the selection, which belonged to the previous user.
    pub fn set_identity(&mut self, identity: Option<Identity>) {
        if self.identity != identity {
            self.clear_selection();
        }
        self.identity = identity;
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn active(&self) -> Option<&NoteDraft> {
        self.active.as_ref()
    }

    pub fn editor(&self) -> &EditorState {
        &self.editor
    }

    pub fn is_saving(&self) -> bool {
        self.editor.is_saving()
    }

    /// Create a notebook. Silent no-op when the trimmed name is empty or
    /// no identity is present. Local state is never updated directly;
    /// the next subscription push carries the new notebook.
    pub async fn create_notebook(&self, name: &str) -> Result<Option<String>> {
        let Some(path) = self.collection_path(CollectionKind::Notebooks) else {
            debug!("create_notebook skipped, no identity");
            return Ok(None);
        };
        let trimmed = name.trim();
        if trimmed.is_empty() {
            debug!("create_notebook skipped, empty name");
            return Ok(None);
        }

        let mut doc = DocumentFields::new();
        doc.insert(fields::NAME.into(), FieldValue::Text(trimmed.to_string()));
        doc.insert(fields::CREATED_AT.into(), self.store.server_time());

        match self.store.create(&path, doc).await {
            Ok(id) => {
                info!(notebook_id = %id, "notebook created");
                Ok(Some(id))
            }
            Err(e) => Err(self.mutation_failed("create_notebook", None, e)),
        }
    }

    /// Create a note under the current notebook filter and select it
    /// immediately with the server-returned id, ahead of the push.
    pub async fn create_note(&mut self, filter: &NotebookFilter) -> Result<Option<String>> {
        let Some(path) = self.collection_path(CollectionKind::Notes) else {
            debug!("create_note skipped, no identity");
            return Ok(None);
        };

        let mut doc = DocumentFields::new();
        doc.insert(
            fields::TITLE.into(),
            FieldValue::Text(self.new_note_title.clone()),
        );
        doc.insert(fields::CONTENT.into(), FieldValue::Text(String::new()));
        doc.insert(
            fields::NOTEBOOK_ID.into(),
            match filter.target_notebook_id() {
                Some(id) => FieldValue::Text(id),
                None => FieldValue::Null,
            },
        );
        doc.insert(fields::CREATED_AT.into(), self.store.server_time());
        doc.insert(fields::UPDATED_AT.into(), self.store.server_time());

        match self.store.create(&path, doc).await {
            Ok(id) => {
                self.active = Some(NoteDraft::new(
                    id.clone(),
                    self.new_note_title.clone(),
                    "",
                ));
                self.editor = EditorState::Viewing;
                self.events.emit(ClientEvent::NoteSelected {
                    note_id: id.clone(),
                });
                info!(note_id = %id, "note created");
                Ok(Some(id))
            }
            Err(e) => Err(self.mutation_failed("create_note", None, e)),
        }
    }

    /// Make a synced note the active selection. Any unsaved draft is
    /// discarded without a prompt.
    pub fn select_note(&mut self, note: &Note) {
        if matches!(self.editor, EditorState::Editing) {
            debug!(note_id = %note.id, "discarding unsaved draft on selection change");
        }
        self.active = Some(NoteDraft::from(note));
        self.editor = EditorState::Viewing;
        self.events.emit(ClientEvent::NoteSelected {
            note_id: note.id.clone(),
        });
    }

    /// Drop the active selection, if any. Any unsaved draft is discarded.
    pub fn clear_selection(&mut self) {
        if self.active.take().is_some() {
            self.editor = EditorState::Viewing;
            self.events.emit(ClientEvent::SelectionCleared);
        }
    }

    /// Buffer edits into the active draft. The synced snapshot entry is
    /// untouched until a save.
    pub fn edit_draft(&mut self, title: Option<String>, content: Option<String>) {
        let Some(draft) = self.active.as_mut() else {
            debug!("edit_draft skipped, no active note");
            return;
        };
        if let Some(title) = title {
            draft.title = title;
        }
        if let Some(content) = content {
            draft.content = content;
        }
        if !self.editor.is_saving() {
            self.editor = EditorState::Editing;
        }
    }

    /// Save the active draft. No-op without identity or draft; a failure
    /// retains the draft and parks the editor in `SaveFailed`.
    pub async fn save_active(&mut self) -> Result<()> {
        let Some(path) = self.collection_path(CollectionKind::Notes) else {
            debug!("save skipped, no identity");
            return Ok(());
        };
        let Some(draft) = self.active.clone() else {
            debug!("save skipped, no active note");
            return Ok(());
        };
        if self.editor.is_saving() {
            debug!(note_id = %draft.id, "save skipped, already in flight");
            return Ok(());
        }

        self.editor = EditorState::Saving;
        self.events.emit(ClientEvent::SaveStarted {
            note_id: draft.id.clone(),
        });

        let mut doc = DocumentFields::new();
        doc.insert(fields::TITLE.into(), FieldValue::Text(draft.title.clone()));
        doc.insert(
            fields::CONTENT.into(),
            FieldValue::Text(draft.content.clone()),
        );
        doc.insert(fields::UPDATED_AT.into(), self.store.server_time());

        match self.store.update(&path.document(&draft.id), doc).await {
            Ok(()) => {
                self.editor = EditorState::Viewing;
                self.events.emit(ClientEvent::SaveFinished {
                    note_id: draft.id.clone(),
                });
                info!(note_id = %draft.id, "note saved");
                Ok(())
            }
            Err(e) => {
                let error = self.mutation_failed("save_note", Some(draft.id.clone()), e);
                self.editor = EditorState::SaveFailed(error.to_string());
                Err(error)
            }
        }
    }

    /// Delete a note. Idempotent from the caller's perspective: an
    /// already-deleted id is success. Clears the selection at most once,
    /// and only if the deleted note was active.
    pub async fn delete_note(&mut self, note_id: &str) -> Result<()> {
        let Some(path) = self.collection_path(CollectionKind::Notes) else {
            debug!("delete skipped, no identity");
            return Ok(());
        };

        match self.store.delete(&path.document(note_id)).await {
            Ok(()) | Err(Error::NotFound(_)) => {
                if self.active.as_ref().is_some_and(|d| d.id == note_id) {
                    self.active = None;
                    self.editor = EditorState::Viewing;
                    self.events.emit(ClientEvent::SelectionCleared);
                }
                info!(note_id, "note deleted");
                Ok(())
            }
            Err(e) => Err(self.mutation_failed("delete_note", Some(note_id.to_string()), e)),
        }
    }

    fn collection_path(&self, kind: CollectionKind) -> Option<CollectionPath> {
        self.identity
            .as_ref()
            .map(|user| CollectionPath::new(user.clone(), kind))
    }

    fn mutation_failed(&self, operation: &str, entity_id: Option<String>, cause: Error) -> Error {
        warn!(op = operation, entity_id = ?entity_id, error = %cause, "mutation failed");
        self.events.emit(ClientEvent::MutationFailed {
            operation: operation.to_string(),
            entity_id: entity_id.clone(),
            error: cause.to_string(),
        });
        Error::mutation(operation, entity_id, cause.to_string())
    }
}
