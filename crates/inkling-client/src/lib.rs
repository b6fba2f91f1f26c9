//! # inkling-client
//!
//! The real-time synchronization and view-derivation engine: collection
//! sync caches, the session controller that owns them, the mutation
//! coordinator, and the [`NotesClient`] facade consumed by a
//! presentation layer.

pub mod cache;
pub mod client;
pub mod config;
pub mod coordinator;
pub mod session;

pub use cache::{CacheHandle, CacheState};
pub use client::{NotesClient, ViewState};
pub use config::ClientConfig;
pub use coordinator::MutationCoordinator;
pub use session::SessionController;
