//! In-memory implementation of the RemoteStore contract.
//!
//! Backs integration tests and embedding hosts that do not need a real
//! backend. Every mutation re-broadcasts the full document set of the
//! affected collection (full-replace pushes), and `FieldValue::ServerTime`
//! sentinels are resolved against a strictly monotonic server clock at
//! write time.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value as JsonValue};
use tokio::sync::{broadcast, Mutex};
use tracing::debug;
use uuid::Uuid;

use inkling_core::{
    defaults, CollectionPath, Document, DocumentFields, DocumentPath, DocumentSet, Error,
    FieldValue, RemoteStore, Result, SnapshotResult, Subscription,
};

struct CollectionSlot {
    docs: BTreeMap<String, JsonValue>,
    tx: broadcast::Sender<SnapshotResult>,
}

impl CollectionSlot {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(defaults::SUBSCRIPTION_CAPACITY);
        Self {
            docs: BTreeMap::new(),
            tx,
        }
    }

    fn document_set(&self) -> DocumentSet {
        self.docs
            .iter()
            .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
            .collect()
    }

    fn push(&self) {
        // No subscribers is fine; the set is re-sent on the next mutation.
        let _ = self.tx.send(Ok(self.document_set()));
    }
}

struct StoreInner {
    collections: HashMap<CollectionPath, CollectionSlot>,
    clock: DateTime<Utc>,
    fail_next_mutation: Option<String>,
}

/// In-memory remote store.
pub struct MemoryStore {
    inner: Mutex<StoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                collections: HashMap::new(),
                clock: DateTime::<Utc>::UNIX_EPOCH,
                fail_next_mutation: None,
            }),
        }
    }

    /// Push a failure to a collection's subscribers, as a backend outage
    /// would. Existing subscriptions observe a sticky sync error.
    pub async fn push_sync_error(&self, path: &CollectionPath, message: &str) {
        let mut inner = self.inner.lock().await;
        let slot = inner
            .collections
            .entry(path.clone())
            .or_insert_with(CollectionSlot::new);
        let _ = slot.tx.send(Err(Error::sync(path.collection, message)));
    }

    /// Arm a one-shot failure: the next create/update/delete returns an
    /// error instead of applying.
    pub async fn fail_next_mutation(&self, message: &str) {
        self.inner.lock().await.fail_next_mutation = Some(message.to_string());
    }

    /// Number of documents currently in a collection.
    pub async fn document_count(&self, path: &CollectionPath) -> usize {
        self.inner
            .lock()
            .await
            .collections
            .get(path)
            .map(|slot| slot.docs.len())
            .unwrap_or(0)
    }

    /// Server clock: strictly monotonic even when wall-clock reads repeat.
    fn bump_clock(inner: &mut StoreInner) -> DateTime<Utc> {
        let now = Utc::now();
        inner.clock = if now > inner.clock {
            now
        } else {
            inner.clock + Duration::milliseconds(1)
        };
        inner.clock
    }

    fn resolve_fields(fields: DocumentFields, now: DateTime<Utc>) -> Result<Map<String, JsonValue>> {
        let mut obj = Map::new();
        for (name, value) in fields {
            let resolved = match value {
                FieldValue::Null => JsonValue::Null,
                FieldValue::Text(s) => JsonValue::String(s),
                FieldValue::Timestamp(ts) => serde_json::to_value(ts)?,
                FieldValue::ServerTime => serde_json::to_value(now)?,
            };
            obj.insert(name, resolved);
        }
        Ok(obj)
    }

    fn take_injected_failure(inner: &mut StoreInner) -> Result<()> {
        match inner.fail_next_mutation.take() {
            Some(message) => Err(Error::Store(message)),
            None => Ok(()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn subscribe(&self, path: &CollectionPath) -> Subscription {
        let mut inner = self.inner.lock().await;
        let slot = inner
            .collections
            .entry(path.clone())
            .or_insert_with(CollectionSlot::new);
        debug!(collection = %path, "subscribe");
        Subscription::new(Ok(slot.document_set()), slot.tx.subscribe())
    }

    async fn create(&self, path: &CollectionPath, fields: DocumentFields) -> Result<String> {
        let mut inner = self.inner.lock().await;
        Self::take_injected_failure(&mut inner)?;

        let now = Self::bump_clock(&mut inner);
        let resolved = Self::resolve_fields(fields, now)?;
        let id = Uuid::new_v4().to_string();

        let slot = inner
            .collections
            .entry(path.clone())
            .or_insert_with(CollectionSlot::new);
        slot.docs.insert(id.clone(), JsonValue::Object(resolved));
        slot.push();

        debug!(collection = %path, document_id = %id, "create");
        Ok(id)
    }

    async fn update(&self, path: &DocumentPath, fields: DocumentFields) -> Result<()> {
        let mut inner = self.inner.lock().await;
        Self::take_injected_failure(&mut inner)?;

        let now = Self::bump_clock(&mut inner);
        let resolved = Self::resolve_fields(fields, now)?;

        let slot = inner
            .collections
            .get_mut(&path.collection)
            .ok_or_else(|| Error::NotFound(path.to_string()))?;
        let doc = slot
            .docs
            .get_mut(&path.document_id)
            .ok_or_else(|| Error::NotFound(path.to_string()))?;

        if let Some(obj) = doc.as_object_mut() {
            for (name, value) in resolved {
                obj.insert(name, value);
            }
        }
        slot.push();

        debug!(document = %path, "update");
        Ok(())
    }

    async fn delete(&self, path: &DocumentPath) -> Result<()> {
        let mut inner = self.inner.lock().await;
        Self::take_injected_failure(&mut inner)?;

        if let Some(slot) = inner.collections.get_mut(&path.collection) {
            // Removing an unknown id is success: delete is idempotent.
            if slot.docs.remove(&path.document_id).is_some() {
                slot.push();
            }
        }

        debug!(document = %path, "delete");
        Ok(())
    }
}
