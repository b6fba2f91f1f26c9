//! Collection sync cache: a local ordered snapshot of one server-pushed
//! collection.
//!
//! The cache follows a full-replace model: every push re-materializes the
//! whole snapshot, which is then decoded, sorted, and published over a
//! watch channel. Simpler than incremental patching, and acceptable
//! because collections are small; the interface isolates the choice so it
//! could be swapped later without touching the filter engine or the
//! mutation coordinator.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use inkling_core::{
    ClientEvent, CollectionKind, CollectionPath, Error, EventBus, Identity, RemoteStore,
};

/// The cache's published state: the current ordered snapshot plus the
/// sticky sync error, if the subscription has failed.
#[derive(Debug, Clone)]
pub struct CacheState<T> {
    pub items: Vec<T>,
    pub error: Option<Error>,
}

impl<T> Default for CacheState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            error: None,
        }
    }
}

/// Handle to one open collection subscription.
///
/// Closing the handle (or dropping it) releases the subscription; the
/// owning session must do so before its identity changes so that exactly
/// one subscription per (identity, collection) is open at a time.
pub struct CacheHandle<T> {
    kind: CollectionKind,
    state: watch::Receiver<CacheState<T>>,
    task: Option<JoinHandle<()>>,
}

impl<T> CacheHandle<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Open a live subscription for one collection scoped to `user`.
    ///
    /// Each successful push replaces the entire snapshot: documents are
    /// decoded (decorated with their server id), sorted with `compare`,
    /// and published. A failed push publishes a sticky sync error and the
    /// task stops updating until a fresh `open`; there is no automatic
    /// retry. The last good snapshot is retained alongside the error.
    pub async fn open<C>(
        store: Arc<dyn RemoteStore>,
        user: &Identity,
        kind: CollectionKind,
        compare: C,
        events: EventBus,
    ) -> Self
    where
        C: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        let path = CollectionPath::new(user.clone(), kind);
        let mut subscription = store.subscribe(&path).await;
        let (tx, state) = watch::channel(CacheState::default());

        let task = tokio::spawn(async move {
            while let Some(push) = subscription.recv().await {
                match push {
                    Ok(set) => {
                        let mut items: Vec<T> = Vec::with_capacity(set.len());
                        for doc in &set {
                            match doc.decode() {
                                Ok(item) => items.push(item),
                                Err(error) => warn!(
                                    collection = %kind,
                                    document_id = %doc.id,
                                    %error,
                                    "skipping undecodable document"
                                ),
                            }
                        }
                        items.sort_by(&compare);

                        let count = items.len();
                        trace!(collection = %kind, count, "snapshot replaced");
                        tx.send_replace(CacheState { items, error: None });
                        events.emit(ClientEvent::CollectionUpdated {
                            collection: kind,
                            count,
                        });
                    }
                    Err(error) => {
                        warn!(collection = %kind, %error, "subscription failed, cache frozen");
                        let items = tx.borrow().items.clone();
                        tx.send_replace(CacheState {
                            items,
                            error: Some(error),
                        });
                        events.emit(ClientEvent::SyncFailed { collection: kind });
                        break;
                    }
                }
            }
            debug!(collection = %kind, "cache task finished");
        });

        debug!(collection = %kind, user_id = %user, "cache opened");
        Self {
            kind,
            state,
            task: Some(task),
        }
    }
}

impl<T: Clone> CacheHandle<T> {
    /// The current ordered snapshot.
    pub fn snapshot(&self) -> Vec<T> {
        self.state.borrow().items.clone()
    }

    /// The sticky sync error, if the subscription has failed.
    pub fn error(&self) -> Option<Error> {
        self.state.borrow().error.clone()
    }

    /// A watch receiver for change notification.
    pub fn watch(&self) -> watch::Receiver<CacheState<T>> {
        self.state.clone()
    }
}

impl<T> CacheHandle<T> {
    pub fn kind(&self) -> CollectionKind {
        self.kind
    }

    /// Release the subscription. Idempotent.
    pub fn close(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!(collection = %self.kind, "cache closed");
        }
    }
}

impl<T> Drop for CacheHandle<T> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkling_core::{defaults, DocumentFields, FieldValue, Note, Notebook};
    use inkling_store::MemoryStore;
    use std::time::Duration;

    fn user() -> Identity {
        Identity::from("u1")
    }

    fn note_fields(title: &str) -> DocumentFields {
        let mut fields = DocumentFields::new();
        fields.insert("title".into(), FieldValue::Text(title.into()));
        fields.insert("content".into(), FieldValue::Text(String::new()));
        fields.insert("notebook_id".into(), FieldValue::Null);
        fields.insert("created_at".into(), FieldValue::ServerTime);
        fields.insert("updated_at".into(), FieldValue::ServerTime);
        fields
    }

    fn notebook_fields(name: &str) -> DocumentFields {
        let mut fields = DocumentFields::new();
        fields.insert("name".into(), FieldValue::Text(name.into()));
        fields.insert("created_at".into(), FieldValue::ServerTime);
        fields
    }

    async fn wait_for<T, F>(rx: &mut watch::Receiver<CacheState<T>>, mut pred: F) -> CacheState<T>
    where
        T: Clone,
        F: FnMut(&CacheState<T>) -> bool,
    {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if pred(&rx.borrow()) {
                    return rx.borrow().clone();
                }
                rx.changed().await.expect("cache channel closed");
            }
        })
        .await
        .expect("condition not reached in time")
    }

    #[tokio::test]
    async fn test_snapshot_replaced_and_sorted_on_push() {
        let store = Arc::new(MemoryStore::new());
        let path = CollectionPath::new(user(), CollectionKind::Notebooks);

        store.create(&path, notebook_fields("Work")).await.unwrap();
        store
            .create(&path, notebook_fields("archive"))
            .await
            .unwrap();

        let cache: CacheHandle<Notebook> = CacheHandle::open(
            store.clone(),
            &user(),
            CollectionKind::Notebooks,
            Notebook::by_name,
            EventBus::new(defaults::EVENT_BUS_CAPACITY),
        )
        .await;

        let mut rx = cache.watch();
        let state = wait_for(&mut rx, |s| s.items.len() == 2).await;
        assert_eq!(state.items[0].name, "archive");
        assert_eq!(state.items[1].name, "Work");

        store.create(&path, notebook_fields("Middle")).await.unwrap();
        let state = wait_for(&mut rx, |s| s.items.len() == 3).await;
        let names: Vec<_> = state.items.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["archive", "Middle", "Work"]);
    }

    #[tokio::test]
    async fn test_notes_sorted_by_recency() {
        let store = Arc::new(MemoryStore::new());
        let path = CollectionPath::new(user(), CollectionKind::Notes);

        store.create(&path, note_fields("older")).await.unwrap();
        store.create(&path, note_fields("newer")).await.unwrap();

        let cache: CacheHandle<Note> = CacheHandle::open(
            store.clone(),
            &user(),
            CollectionKind::Notes,
            Note::by_recency,
            EventBus::new(defaults::EVENT_BUS_CAPACITY),
        )
        .await;

        let mut rx = cache.watch();
        let state = wait_for(&mut rx, |s| s.items.len() == 2).await;
        assert_eq!(state.items[0].title, "newer");
        assert_eq!(state.items[1].title, "older");
    }

    #[tokio::test]
    async fn test_sync_error_is_sticky_and_keeps_last_snapshot() {
        let store = Arc::new(MemoryStore::new());
        let path = CollectionPath::new(user(), CollectionKind::Notes);
        store.create(&path, note_fields("kept")).await.unwrap();

        let events = EventBus::new(32);
        let mut event_rx = events.subscribe();
        let cache: CacheHandle<Note> = CacheHandle::open(
            store.clone(),
            &user(),
            CollectionKind::Notes,
            Note::by_recency,
            events,
        )
        .await;

        let mut rx = cache.watch();
        wait_for(&mut rx, |s| s.items.len() == 1).await;

        store.push_sync_error(&path, "backend gone").await;
        let state = wait_for(&mut rx, |s| s.error.is_some()).await;
        assert!(matches!(state.error, Some(Error::Sync { .. })));
        // Last good snapshot survives under the error banner.
        assert_eq!(state.items.len(), 1);

        // The task stopped: a later successful mutation no longer updates
        // this cache.
        store.create(&path, note_fields("unseen")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(cache.snapshot().len(), 1);
        assert!(cache.error().is_some());

        // And the failure was announced on the bus.
        let mut saw_failure = false;
        while let Ok(event) = event_rx.try_recv() {
            if matches!(
                event,
                ClientEvent::SyncFailed {
                    collection: CollectionKind::Notes
                }
            ) {
                saw_failure = true;
            }
        }
        assert!(saw_failure);
    }

    #[tokio::test]
    async fn test_undecodable_documents_are_skipped() {
        let store = Arc::new(MemoryStore::new());
        let path = CollectionPath::new(user(), CollectionKind::Notes);

        store.create(&path, note_fields("good")).await.unwrap();
        // A document whose updated_at is not a timestamp fails to decode.
        let mut bad = DocumentFields::new();
        bad.insert("title".into(), FieldValue::Text("bad".into()));
        bad.insert("updated_at".into(), FieldValue::Text("not a time".into()));
        store.create(&path, bad).await.unwrap();

        let cache: CacheHandle<Note> = CacheHandle::open(
            store.clone(),
            &user(),
            CollectionKind::Notes,
            Note::by_recency,
            EventBus::new(32),
        )
        .await;

        let mut rx = cache.watch();
        let state = wait_for(&mut rx, |s| !s.items.is_empty()).await;
        assert_eq!(state.items.len(), 1);
        assert_eq!(state.items[0].title, "good");
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_stops_updates() {
        let store = Arc::new(MemoryStore::new());
        let path = CollectionPath::new(user(), CollectionKind::Notes);

        let mut cache: CacheHandle<Note> = CacheHandle::open(
            store.clone(),
            &user(),
            CollectionKind::Notes,
            Note::by_recency,
            EventBus::new(32),
        )
        .await;

        let mut rx = cache.watch();
        wait_for(&mut rx, |s| s.error.is_none()).await;

        cache.close();
        cache.close();

        store.create(&path, note_fields("after close")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(cache.snapshot().is_empty());
    }
}
