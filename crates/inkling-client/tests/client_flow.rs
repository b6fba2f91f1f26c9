//! End-to-end tests driving the client facade against the in-memory
//! backend: mutations issued through the coordinator surface back through
//! the subscription channel and into the derived view.

use std::sync::Arc;
use std::time::Duration;

use inkling_client::{NotesClient, ViewState};
use inkling_core::{
    CollectionKind, CollectionPath, Error, Identity, NotebookFilter, SessionState,
};
use inkling_store::{MemoryIdentityProvider, MemoryStore};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

fn harness() -> (Arc<MemoryStore>, Arc<MemoryIdentityProvider>, NotesClient) {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let provider = Arc::new(MemoryIdentityProvider::with_identity("user-a"));
    let client = NotesClient::new(store.clone(), provider.clone());
    (store, provider, client)
}

/// Poll the derived view until `pred` holds. Subscriptions deliver pushes
/// asynchronously, so tests wait for the loop to close rather than
/// asserting immediately.
async fn wait_view<F>(client: &NotesClient, mut pred: F) -> ViewState
where
    F: FnMut(&ViewState) -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let view = client.view();
            if pred(&view) {
                return view;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("view condition not reached in time")
}

#[tokio::test]
async fn full_edit_cycle_closes_the_loop() {
    let (_store, _provider, mut client) = harness();
    client.start().await.unwrap();
    assert!(client.view().session.is_ready());

    // Notebook creation comes back through the subscription, sorted by name.
    client.add_notebook("Travel").await.unwrap();
    client.add_notebook("archive").await.unwrap();
    let view = wait_view(&client, |v| v.notebooks.len() == 2).await;
    assert_eq!(view.notebooks[0].name, "archive");
    assert_eq!(view.notebooks[1].name, "Travel");
    let travel_id = view.notebooks[1].id.clone();

    // First note: uncategorized (created under the All filter).
    client.add_note().await.unwrap();
    client.edit_draft(Some("Todo".into()), Some("buy milk".into()));
    client.save_active_note().await.unwrap();

    // Second note: created inside the Travel notebook, saved later, so it
    // sorts first under All.
    client.select_notebook(NotebookFilter::Notebook(travel_id.clone()));
    client.add_note().await.unwrap();
    client.edit_draft(Some("Plan".into()), Some("trip".into()));
    client.save_active_note().await.unwrap();

    client.select_notebook(NotebookFilter::All);
    let view = wait_view(&client, |v| {
        v.notes.len() == 2 && v.notes.iter().all(|n| n.title != "New Note")
    })
    .await;
    assert_eq!(view.notes[0].title, "Plan");
    assert_eq!(view.notes[1].title, "Todo");
    assert!(view.notes[0].updated_at > view.notes[1].updated_at);
    assert_eq!(view.notes[0].notebook_id.as_deref(), Some(travel_id.as_str()));
    assert!(view.notes[1].notebook_id.is_none());
}

#[tokio::test]
async fn notebook_and_search_filters_scope_the_view() {
    let (_store, _provider, mut client) = harness();
    client.start().await.unwrap();

    client.add_notebook("Travel").await.unwrap();
    let view = wait_view(&client, |v| v.notebooks.len() == 1).await;
    let travel_id = view.notebooks[0].id.clone();

    client.add_note().await.unwrap();
    client.edit_draft(Some("Todo".into()), Some("buy milk".into()));
    client.save_active_note().await.unwrap();

    client.select_notebook(NotebookFilter::Notebook(travel_id.clone()));
    client.add_note().await.unwrap();
    client.edit_draft(Some("Plan".into()), Some("trip".into()));
    client.save_active_note().await.unwrap();

    // Uncategorized: only the first note.
    client.select_notebook(NotebookFilter::Uncategorized);
    let view = wait_view(&client, |v| v.notes.len() == 1).await;
    assert_eq!(view.notes[0].title, "Todo");

    // All + search "trip": only the second.
    client.select_notebook(NotebookFilter::All);
    client.set_search_term("trip");
    let view = wait_view(&client, |v| v.notes.len() == 1).await;
    assert_eq!(view.notes[0].title, "Plan");

    // Search is case-folded and matches titles too.
    client.set_search_term("tOdO");
    let view = wait_view(&client, |v| v.notes.len() == 1).await;
    assert_eq!(view.notes[0].title, "Todo");

    // A stale notebook filter shows zero notes, not an error.
    client.set_search_term("");
    client.select_notebook(NotebookFilter::Notebook("deleted-notebook".into()));
    let view = wait_view(&client, |v| v.notes.is_empty()).await;
    assert!(view.notes_error.is_none());
}

#[tokio::test]
async fn optimistic_create_selects_server_id_before_any_push() {
    let (_store, _provider, mut client) = harness();
    client.start().await.unwrap();

    let id = client.add_note().await.unwrap().unwrap();
    // No waiting: the selection must already carry the server id.
    let view = client.view();
    assert_eq!(view.active_draft.as_ref().unwrap().id, id);

    // The push eventually confirms the same note.
    let view = wait_view(&client, |v| v.notes.len() == 1).await;
    assert_eq!(view.notes[0].id, id);
}

#[tokio::test]
async fn delete_clears_selection_once_and_is_idempotent() {
    let (_store, _provider, mut client) = harness();
    client.start().await.unwrap();

    let id = client.add_note().await.unwrap().unwrap();
    wait_view(&client, |v| v.notes.len() == 1).await;

    client.delete_note(&id).await.unwrap();
    assert!(client.view().active_draft.is_none());
    let view = wait_view(&client, |v| v.notes.is_empty()).await;
    assert!(view.notes_error.is_none());

    // Deleting again (double-click) is still success, selection still none.
    client.delete_note(&id).await.unwrap();
    assert!(client.view().active_draft.is_none());
}

#[tokio::test]
async fn sync_failure_is_collection_scoped_and_sticky() {
    let (store, _provider, mut client) = harness();
    client.start().await.unwrap();

    client.add_note().await.unwrap();
    wait_view(&client, |v| v.notes.len() == 1).await;

    let notes_path = CollectionPath::new(Identity::from("user-a"), CollectionKind::Notes);
    store.push_sync_error(&notes_path, "stream interrupted").await;

    let view = wait_view(&client, |v| v.notes_error.is_some()).await;
    assert!(matches!(view.notes_error, Some(Error::Sync { .. })));
    // The other collection is unaffected, and the stale note list is
    // still visible under the banner.
    assert!(view.notebooks_error.is_none());
    assert_eq!(view.notes.len(), 1);

    // Frozen: later writes no longer reach the view.
    client.add_note().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    let view = client.view();
    assert_eq!(view.notes.len(), 1);
    assert!(view.notes_error.is_some());
}

#[tokio::test]
async fn identity_switch_reopens_scoped_caches() {
    let (store, provider, mut client) = harness();
    client.start().await.unwrap();

    client.add_note().await.unwrap();
    wait_view(&client, |v| v.notes.len() == 1).await;

    provider.set_identity(Some(Identity::from("user-b")));
    client.poll_identity().await.unwrap();

    // New session: user-b sees an empty world, and the old selection is gone.
    let view = wait_view(&client, |v| v.notes.is_empty()).await;
    assert_eq!(view.session, SessionState::Ready(Identity::from("user-b")));
    assert!(view.active_draft.is_none());

    client.add_note().await.unwrap();
    wait_view(&client, |v| v.notes.len() == 1).await;

    // Both users' data still exists, scoped apart.
    let a_path = CollectionPath::new(Identity::from("user-a"), CollectionKind::Notes);
    let b_path = CollectionPath::new(Identity::from("user-b"), CollectionKind::Notes);
    assert_eq!(store.document_count(&a_path).await, 1);
    assert_eq!(store.document_count(&b_path).await, 1);
}

#[tokio::test]
async fn sign_out_tears_down_and_silences_mutations() {
    let (store, provider, mut client) = harness();
    client.start().await.unwrap();

    provider.set_identity(None);
    client.poll_identity().await.unwrap();

    let view = client.view();
    assert_eq!(view.session, SessionState::Unresolved);

    // Every intent is now a silent no-op.
    assert_eq!(client.add_note().await.unwrap(), None);
    assert_eq!(client.add_notebook("Work").await.unwrap(), None);
    client.save_active_note().await.unwrap();
    client.delete_note("n1").await.unwrap();

    let notes_path = CollectionPath::new(Identity::from("user-a"), CollectionKind::Notes);
    assert_eq!(store.document_count(&notes_path).await, 0);
}

#[tokio::test]
async fn auth_failure_is_terminal() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let provider = Arc::new(MemoryIdentityProvider::new());
    provider.fail_next_provision();
    let mut client = NotesClient::new(store, provider);

    let res = client.start().await;
    assert!(matches!(res, Err(Error::Auth(_))));
    assert!(matches!(client.view().session, SessionState::Failed(_)));
    assert_eq!(client.add_note().await.unwrap(), None);
}

#[tokio::test]
async fn failed_save_keeps_draft_until_retried() {
    let (store, _provider, mut client) = harness();
    client.start().await.unwrap();

    client.add_note().await.unwrap();
    client.edit_draft(Some("Draft title".into()), Some("draft body".into()));

    store.fail_next_mutation("write refused").await;
    let res = client.save_active_note().await;
    assert!(matches!(res, Err(Error::Mutation { .. })));

    let view = client.view();
    assert!(!view.is_saving);
    assert!(matches!(view.editor, inkling_core::EditorState::SaveFailed(_)));
    let draft = view.active_draft.unwrap();
    assert_eq!(draft.title, "Draft title");
    assert_eq!(draft.content, "draft body");

    // User-initiated retry succeeds and the snapshot catches up.
    client.save_active_note().await.unwrap();
    let view = wait_view(&client, |v| {
        v.notes.first().map(|n| n.title.as_str()) == Some("Draft title")
    })
    .await;
    assert_eq!(view.notes[0].content, "draft body");
}

#[tokio::test]
async fn draft_divergence_is_local_until_saved() {
    let (_store, _provider, mut client) = harness();
    client.start().await.unwrap();

    client.add_note().await.unwrap();
    let view = wait_view(&client, |v| v.notes.len() == 1).await;
    assert_eq!(view.notes[0].title, "New Note");

    client.edit_draft(Some("Edited".into()), None);

    // The draft diverges; the synced snapshot entry does not.
    let view = client.view();
    assert_eq!(view.active_draft.as_ref().unwrap().title, "Edited");
    assert_eq!(view.notes[0].title, "New Note");

    client.save_active_note().await.unwrap();
    let view = wait_view(&client, |v| v.notes[0].title == "Edited").await;
    assert_eq!(view.active_draft.unwrap().title, "Edited");
}
