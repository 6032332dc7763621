//! Backend boundary for Smartmark.
//!
//! Defines the interfaces consumed from the external managed backend: the
//! auth collaborator (`AuthClient`) and the data collaborator (`DataClient`),
//! plus the subscription feeds both deliver events through. Concrete clients
//! live in `memory` (tests, demo) and `http` (live service).

pub mod memory;

#[cfg(feature = "http-backend")]
pub mod http;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::types::bookmark::{Bookmark, NewBookmark};
use crate::types::change::{AuthEvent, ChangeEvent};
use crate::types::errors::{AuthError, BackendError};
use crate::types::identity::Identity;

/// Handle for a registered subscriber. Dropping it deregisters the
/// subscriber from the backend, so teardown is deterministic.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

/// Live feed of row changes performed by any session.
pub struct ChangeFeed {
    rx: mpsc::UnboundedReceiver<ChangeEvent>,
    _subscription: Subscription,
}

impl ChangeFeed {
    pub fn new(rx: mpsc::UnboundedReceiver<ChangeEvent>, subscription: Subscription) -> Self {
        Self {
            rx,
            _subscription: subscription,
        }
    }

    /// Waits for the next change. Returns `None` once the feed closes.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        self.rx.recv().await
    }

    /// Returns the next already-queued change without waiting.
    pub fn try_next(&mut self) -> Option<ChangeEvent> {
        self.rx.try_recv().ok()
    }
}

/// Feed of session presence transitions from the auth collaborator.
pub struct IdentityFeed {
    rx: mpsc::UnboundedReceiver<AuthEvent>,
    _subscription: Subscription,
}

impl IdentityFeed {
    pub fn new(rx: mpsc::UnboundedReceiver<AuthEvent>, subscription: Subscription) -> Self {
        Self {
            rx,
            _subscription: subscription,
        }
    }

    /// Waits for the next transition. Returns `None` once the feed closes.
    pub async fn next(&mut self) -> Option<AuthEvent> {
        self.rx.recv().await
    }

    /// Returns the next already-queued transition without waiting.
    pub fn try_next(&mut self) -> Option<AuthEvent> {
        self.rx.try_recv().ok()
    }
}

/// Operations consumed from the external auth collaborator.
#[async_trait]
pub trait AuthClient: Send + Sync {
    /// Queries the collaborator for the currently signed-in identity.
    async fn current_identity(&self) -> Result<Option<Identity>, AuthError>;

    /// Registers for sign-in/sign-out notifications.
    ///
    /// Dropping the returned feed deregisters the subscriber.
    fn subscribe_identity(&self) -> IdentityFeed;

    /// Begins provider sign-in. Returns the authorization URL the user
    /// must visit; the provider redirects back to `redirect_to` with a code.
    async fn sign_in_with_provider(
        &self,
        provider: &str,
        redirect_to: &str,
    ) -> Result<String, AuthError>;

    /// Ends the current session.
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Exchanges an authorization code for a session.
    async fn exchange_code(&self, code: &str) -> Result<Identity, AuthError>;
}

/// Operations consumed from the external data collaborator.
#[async_trait]
pub trait DataClient: Send + Sync {
    /// All bookmarks owned by `owner_id`, ordered by `created_at` descending.
    async fn fetch_where_owner(&self, owner_id: &str) -> Result<Vec<Bookmark>, BackendError>;

    /// Inserts a record and returns it with the server-assigned `id` and
    /// `created_at`.
    async fn insert(&self, record: NewBookmark) -> Result<Bookmark, BackendError>;

    /// Deletes a row by id. Deleting an absent id is not an error.
    async fn delete_by_id(&self, id: &str) -> Result<(), BackendError>;

    /// Registers for the live change feed of the bookmarks table.
    ///
    /// Dropping the returned feed deregisters the subscriber.
    fn subscribe_changes(&self) -> ChangeFeed;
}
