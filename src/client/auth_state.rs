//! Observable authentication state.
//!
//! The client publishes who is signed in; views subscribe instead of
//! polling. Each subscriber owns an [`AuthSubscription`], and dropping it is
//! the one and only unsubscribe.

use tokio::sync::watch;

use crate::store::Principal;

/// Publisher of the current principal (`None` when signed out).
#[derive(Debug)]
pub struct AuthState {
    sender: watch::Sender<Option<Principal>>,
}

impl AuthState {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self { sender }
    }

    /// Replace the current principal and notify subscribers if it changed.
    pub fn publish(&self, principal: Option<Principal>) {
        self.sender.send_if_modified(|current| {
            if *current == principal {
                false
            } else {
                *current = principal;
                true
            }
        });
    }

    pub fn current(&self) -> Option<Principal> {
        self.sender.borrow().clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.sender.borrow().is_some()
    }

    /// Register an observer.
    pub fn subscribe(&self) -> AuthSubscription {
        AuthSubscription {
            receiver: self.sender.subscribe(),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for AuthState {
    fn default() -> Self {
        Self::new()
    }
}

/// A registered observer of [`AuthState`].
#[derive(Debug)]
pub struct AuthSubscription {
    receiver: watch::Receiver<Option<Principal>>,
}

impl AuthSubscription {
    /// Principal as last seen by this subscription.
    pub fn current(&self) -> Option<Principal> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change.
    ///
    /// Returns `None` once the publisher is gone.
    pub async fn changed(&mut self) -> Option<Option<Principal>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }
}
