//! Store and identity contracts for the inkling sync engine.
//!
//! These traits define the narrow interface the engine needs from a
//! backend: collection subscribe plus document create/update/delete,
//! and identity resolution. Concrete implementations are pluggable
//! (the `inkling-store` crate ships an in-memory one).

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tokio::sync::{broadcast, watch};

use crate::error::{Error, Result};
use crate::models::Identity;
use crate::paths::{CollectionPath, DocumentPath};

// =============================================================================
// DOCUMENTS
// =============================================================================

/// A value written into a document field.
///
/// `ServerTime` is the opaque timestamp token of the store contract: it is
/// resolved to the server's clock at write time, so clients never fabricate
/// `created_at`/`updated_at` values.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Text(String),
    Timestamp(DateTime<Utc>),
    ServerTime,
}

/// Fields for a create or update command, keyed by field name.
pub type DocumentFields = BTreeMap<String, FieldValue>;

/// A document as delivered by a subscription push: the server-assigned id
/// plus the raw field object.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub fields: JsonValue,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: JsonValue) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Decode into a typed entity, decorating the field object with the
    /// server-assigned id first.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        let mut fields = self.fields.clone();
        match fields.as_object_mut() {
            Some(obj) => {
                obj.insert("id".to_string(), JsonValue::String(self.id.clone()));
            }
            None => {
                return Err(Error::Serialization(format!(
                    "document {} fields are not an object",
                    self.id
                )))
            }
        }
        Ok(serde_json::from_value(fields)?)
    }
}

/// The full, unordered document set of one collection at one instant.
pub type DocumentSet = Vec<Document>;

/// One subscription push: a full snapshot, or the collection-scoped failure.
pub type SnapshotResult = Result<DocumentSet>;

// =============================================================================
// SUBSCRIPTION
// =============================================================================

/// A live subscription to one collection.
///
/// The first `recv` always yields the snapshot current at subscribe time;
/// every later one yields a full replacement. A receiver that falls behind
/// skips ahead to the freshest snapshot; with full-replace semantics the
/// intermediate ones carry no extra information.
pub struct Subscription {
    initial: Option<SnapshotResult>,
    rx: broadcast::Receiver<SnapshotResult>,
}

impl Subscription {
    pub fn new(initial: SnapshotResult, rx: broadcast::Receiver<SnapshotResult>) -> Self {
        Self {
            initial: Some(initial),
            rx,
        }
    }

    /// Receive the next push. `None` means the store shut down and no
    /// further pushes will arrive.
    pub async fn recv(&mut self) -> Option<SnapshotResult> {
        if let Some(push) = self.initial.take() {
            return Some(push);
        }
        loop {
            match self.rx.recv().await {
                Ok(push) => return Some(push),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::trace!(skipped, "Subscription lagged, skipping to newest snapshot");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

// =============================================================================
// REMOTE STORE
// =============================================================================

/// The backend's collection/document CRUD + subscribe interface.
///
/// Writes never touch local snapshots directly; they surface back through
/// the subscription channel of the affected collection.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Open a live subscription to a collection.
    async fn subscribe(&self, path: &CollectionPath) -> Subscription;

    /// Create a document; returns the server-assigned id.
    async fn create(&self, path: &CollectionPath, fields: DocumentFields) -> Result<String>;

    /// Update fields of an existing document.
    async fn update(&self, path: &DocumentPath, fields: DocumentFields) -> Result<()>;

    /// Delete a document. Deleting an unknown id is success.
    async fn delete(&self, path: &DocumentPath) -> Result<()>;

    /// Opaque timestamp token, resolved server-side at write time.
    fn server_time(&self) -> FieldValue {
        FieldValue::ServerTime
    }
}

// =============================================================================
// IDENTITY PROVIDER
// =============================================================================

/// External identity collaborator.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The identity of the already-signed-in user, if any.
    async fn current_identity(&self) -> Option<Identity>;

    /// Provision an anonymous identity for this session.
    async fn provision_anonymous(&self) -> Result<Identity>;

    /// Change-notification channel for identity transitions.
    fn watch_identity(&self) -> watch::Receiver<Option<Identity>>;
}
