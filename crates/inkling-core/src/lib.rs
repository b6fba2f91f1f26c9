//! # inkling-core
//!
//! Core types, traits, and abstractions for the inkling sync engine.
//!
//! This crate provides the domain models, error taxonomy, store/identity
//! contracts, the pure view-derivation filter, and the client event bus
//! that the other inkling crates depend on.

pub mod defaults;
pub mod error;
pub mod events;
pub mod filter;
pub mod models;
pub mod paths;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use events::{ClientEvent, EventBus};
pub use filter::{derive_view, FilterState, NotebookFilter};
pub use models::{EditorState, Identity, Note, NoteDraft, Notebook, SessionState};
pub use paths::{CollectionKind, CollectionPath, DocumentPath};
pub use traits::{
    Document, DocumentFields, DocumentSet, FieldValue, IdentityProvider, RemoteStore,
    SnapshotResult, Subscription,
};
