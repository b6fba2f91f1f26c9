//! In-memory implementation of the IdentityProvider contract.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::info;
use uuid::Uuid;

use inkling_core::{Error, Identity, IdentityProvider, Result};

/// Identity provider holding the current identity in a watch channel,
/// which doubles as the change-notification channel for identity
/// transitions.
pub struct MemoryIdentityProvider {
    current: watch::Sender<Option<Identity>>,
    fail_next_provision: AtomicBool,
}

impl MemoryIdentityProvider {
    /// Provider with no signed-in user; `provision_anonymous` will mint one.
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self {
            current,
            fail_next_provision: AtomicBool::new(false),
        }
    }

    /// Provider with an existing signed-in identity.
    pub fn with_identity(identity: impl Into<Identity>) -> Self {
        let (current, _) = watch::channel(Some(identity.into()));
        Self {
            current,
            fail_next_provision: AtomicBool::new(false),
        }
    }

    /// Replace the current identity, notifying watchers. `None` models
    /// sign-out.
    pub fn set_identity(&self, identity: Option<Identity>) {
        self.current.send_replace(identity);
    }

    /// Arm a one-shot provisioning failure.
    pub fn fail_next_provision(&self) {
        self.fail_next_provision.store(true, Ordering::SeqCst);
    }
}

impl Default for MemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn current_identity(&self) -> Option<Identity> {
        self.current.borrow().clone()
    }

    async fn provision_anonymous(&self) -> Result<Identity> {
        if self.fail_next_provision.swap(false, Ordering::SeqCst) {
            return Err(Error::Auth("anonymous provisioning unavailable".into()));
        }

        let identity = Identity::new(Uuid::new_v4().to_string());
        self.current.send_replace(Some(identity.clone()));
        info!(user_id = %identity, "provisioned anonymous identity");
        Ok(identity)
    }

    fn watch_identity(&self) -> watch::Receiver<Option<Identity>> {
        self.current.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_current_identity_none_until_provisioned() {
        let provider = MemoryIdentityProvider::new();
        assert!(provider.current_identity().await.is_none());

        let id = provider.provision_anonymous().await.unwrap();
        assert_eq!(provider.current_identity().await, Some(id));
    }

    #[tokio::test]
    async fn test_with_identity_preset() {
        let provider = MemoryIdentityProvider::with_identity("existing-user");
        assert_eq!(
            provider.current_identity().await,
            Some(Identity::from("existing-user"))
        );
    }

    #[tokio::test]
    async fn test_provision_failure_is_one_shot() {
        let provider = MemoryIdentityProvider::new();
        provider.fail_next_provision();

        let res = provider.provision_anonymous().await;
        assert!(matches!(res, Err(Error::Auth(_))));
        assert!(provider.current_identity().await.is_none());

        provider.provision_anonymous().await.unwrap();
        assert!(provider.current_identity().await.is_some());
    }

    #[tokio::test]
    async fn test_watch_sees_transitions() {
        let provider = MemoryIdentityProvider::with_identity("a");
        let mut rx = provider.watch_identity();

        provider.set_identity(Some(Identity::from("b")));
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Some(Identity::from("b")));

        provider.set_identity(None);
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_none());
    }
}
