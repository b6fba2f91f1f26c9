//! Session controller: identity lifecycle and ownership of the two
//! collection caches.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, info};

use inkling_core::{
    ClientEvent, CollectionKind, Error, EventBus, Identity, IdentityProvider, Note, Notebook,
    RemoteStore, Result, SessionState,
};

use crate::cache::CacheHandle;

/// Owns the identity lifecycle and the notebook/note caches scoped to it.
///
/// Transitions `Unresolved → Resolving → Ready(identity) | Failed`.
/// `Ready` opens both caches; any transition away from `Ready` closes
/// them first, so no subscription outlives its identity.
pub struct SessionController {
    store: Arc<dyn RemoteStore>,
    provider: Arc<dyn IdentityProvider>,
    events: EventBus,
    changes: watch::Receiver<Option<Identity>>,
    state: SessionState,
    notebooks: Option<CacheHandle<Notebook>>,
    notes: Option<CacheHandle<Note>>,
}

impl SessionController {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        provider: Arc<dyn IdentityProvider>,
        events: EventBus,
    ) -> Self {
        let changes = provider.watch_identity();
        Self {
            store,
            provider,
            events,
            changes,
            state: SessionState::Unresolved,
            notebooks: None,
            notes: None,
        }
    }

    /// Resolve an identity (existing, or freshly provisioned anonymous)
    /// and open both caches. A resolution failure is terminal for the
    /// session; there is no automatic retry.
    pub async fn start(&mut self) -> Result<Identity> {
        if let SessionState::Ready(identity) = &self.state {
            return Ok(identity.clone());
        }

        self.transition(SessionState::Resolving);
        let resolved = match self.provider.current_identity().await {
            Some(identity) => Ok(identity),
            None => self.provider.provision_anonymous().await,
        };

        match resolved {
            Ok(identity) => {
                // Provisioning notified the identity channel; that
                // transition is this one, already being applied.
                self.changes.borrow_and_update();
                self.open_caches(&identity).await;
                self.transition(SessionState::Ready(identity.clone()));
                info!(user_id = %identity, "session ready");
                Ok(identity)
            }
            Err(e) => {
                error!(error = %e, "identity resolution failed");
                self.transition(SessionState::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    /// Apply any identity transition observed on the provider's
    /// change-notification channel.
    pub async fn poll_identity(&mut self) -> Result<()> {
        let changed = self
            .changes
            .has_changed()
            .map_err(|_| Error::Internal("identity channel closed".into()))?;
        if changed {
            let next = self.changes.borrow_and_update().clone();
            self.apply_identity_change(next).await;
        }
        Ok(())
    }

    /// Tear down for the old identity and, if a new one is present,
    /// reopen scoped to it.
    pub async fn apply_identity_change(&mut self, next: Option<Identity>) {
        if self.state.identity() == next.as_ref() {
            debug!("identity unchanged, nothing to apply");
            return;
        }

        match next {
            Some(identity) => {
                info!(user_id = %identity, "identity changed, reopening session");
                self.close_caches();
                self.open_caches(&identity).await;
                self.transition(SessionState::Ready(identity));
            }
            None => {
                info!("identity cleared, tearing down session");
                self.shutdown();
            }
        }
    }

    /// Close both caches and return to `Unresolved`. Safe to call in any
    /// state.
    pub fn shutdown(&mut self) {
        // Caches must be closed before the state leaves Ready.
        self.close_caches();
        if self.state != SessionState::Unresolved {
            self.transition(SessionState::Unresolved);
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.state.identity()
    }

    pub fn notebooks(&self) -> Option<&CacheHandle<Notebook>> {
        self.notebooks.as_ref()
    }

    pub fn notes(&self) -> Option<&CacheHandle<Note>> {
        self.notes.as_ref()
    }

    async fn open_caches(&mut self, identity: &Identity) {
        self.notebooks = Some(
            CacheHandle::open(
                self.store.clone(),
                identity,
                CollectionKind::Notebooks,
                Notebook::by_name,
                self.events.clone(),
            )
            .await,
        );
        self.notes = Some(
            CacheHandle::open(
                self.store.clone(),
                identity,
                CollectionKind::Notes,
                Note::by_recency,
                self.events.clone(),
            )
            .await,
        );
    }

    fn close_caches(&mut self) {
        if let Some(mut cache) = self.notebooks.take() {
            cache.close();
        }
        if let Some(mut cache) = self.notes.take() {
            cache.close();
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug!(from = ?self.state, to = ?next, "session transition");
        self.state = next;
        self.events.emit(ClientEvent::SessionChanged {
            state: self.state.clone(),
        });
    }
}
