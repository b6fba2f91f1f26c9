//! Collection and document paths for the remote store.
//!
//! All data is scoped per user: a collection lives at
//! `/users/{identity}/{collection}` and a document at
//! `/users/{identity}/{collection}/{document_id}`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::Identity;

/// The two per-user collections this engine synchronizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    Notebooks,
    Notes,
}

impl CollectionKind {
    /// Collection segment as it appears in paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionKind::Notebooks => "notebooks",
            CollectionKind::Notes => "notes",
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Path to a per-user collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath {
    pub user: Identity,
    pub collection: CollectionKind,
}

impl CollectionPath {
    pub fn new(user: Identity, collection: CollectionKind) -> Self {
        Self { user, collection }
    }

    /// Path to a document within this collection.
    pub fn document(&self, document_id: impl Into<String>) -> DocumentPath {
        DocumentPath {
            collection: self.clone(),
            document_id: document_id.into(),
        }
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/users/{}/{}", self.user, self.collection)
    }
}

/// Path to a single document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentPath {
    pub collection: CollectionPath,
    pub document_id: String,
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.document_id)
    }
}
