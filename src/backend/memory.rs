//! In-memory backend for Smartmark.
//!
//! A process-local twin of the managed backend service, used by tests and
//! the console demo. One `MemoryBackend` value is one backend; cloned
//! handles share the same rows, session slot, and subscriber hubs, so a
//! second handle behaves like a second session talking to the same service.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::backend::{AuthClient, ChangeFeed, DataClient, IdentityFeed, Subscription};
use crate::types::bookmark::{Bookmark, NewBookmark};
use crate::types::change::{AuthEvent, ChangeEvent};
use crate::types::errors::{AuthError, BackendError};
use crate::types::identity::Identity;

struct Shared {
    rows: Mutex<Vec<Bookmark>>,
    session: Mutex<Option<Identity>>,
    issued_codes: Mutex<HashMap<String, Identity>>,
    change_subscribers: Mutex<HashMap<u64, mpsc::UnboundedSender<ChangeEvent>>>,
    auth_subscribers: Mutex<HashMap<u64, mpsc::UnboundedSender<AuthEvent>>>,
    next_subscriber: AtomicU64,
    // Monotonic server clock: every insert gets a strictly newer created_at.
    clock: AtomicI64,
    fail_next_fetch: AtomicBool,
    fail_next_insert: AtomicBool,
    fail_next_delete: AtomicBool,
}

/// In-memory implementation of both collaborator interfaces.
#[derive(Clone)]
pub struct MemoryBackend {
    shared: Arc<Shared>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        let epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;

        Self {
            shared: Arc::new(Shared {
                rows: Mutex::new(Vec::new()),
                session: Mutex::new(None),
                issued_codes: Mutex::new(HashMap::new()),
                change_subscribers: Mutex::new(HashMap::new()),
                auth_subscribers: Mutex::new(HashMap::new()),
                next_subscriber: AtomicU64::new(0),
                clock: AtomicI64::new(epoch),
                fail_next_fetch: AtomicBool::new(false),
                fail_next_insert: AtomicBool::new(false),
                fail_next_delete: AtomicBool::new(false),
            }),
        }
    }

    /// Issues an authorization code for the given identity, as the provider
    /// would after a completed sign-in. The code is single-use.
    pub fn issue_code(&self, identity: Identity) -> String {
        let code = Uuid::new_v4().to_string();
        self.shared
            .issued_codes
            .lock()
            .unwrap()
            .insert(code.clone(), identity);
        code
    }

    /// Installs a session directly, bypassing the code exchange. Broadcasts
    /// the sign-in to identity subscribers.
    pub fn complete_sign_in(&self, identity: Identity) {
        *self.shared.session.lock().unwrap() = Some(identity.clone());
        self.broadcast_auth(AuthEvent::SignedIn(identity));
    }

    /// Makes the next fetch fail with a backend rejection.
    pub fn fail_next_fetch(&self) {
        self.shared.fail_next_fetch.store(true, Ordering::SeqCst);
    }

    /// Makes the next insert fail with a backend rejection.
    pub fn fail_next_insert(&self) {
        self.shared.fail_next_insert.store(true, Ordering::SeqCst);
    }

    /// Makes the next delete fail with a backend rejection.
    pub fn fail_next_delete(&self) {
        self.shared.fail_next_delete.store(true, Ordering::SeqCst);
    }

    /// Number of currently registered change subscribers.
    pub fn change_subscriber_count(&self) -> usize {
        self.shared.change_subscribers.lock().unwrap().len()
    }

    /// Number of currently registered identity subscribers.
    pub fn identity_subscriber_count(&self) -> usize {
        self.shared.auth_subscribers.lock().unwrap().len()
    }

    fn next_timestamp(&self) -> i64 {
        self.shared.clock.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn take_flag(flag: &AtomicBool) -> bool {
        flag.swap(false, Ordering::SeqCst)
    }

    fn broadcast_change(&self, event: ChangeEvent) {
        let subscribers = self.shared.change_subscribers.lock().unwrap();
        for sender in subscribers.values() {
            let _ = sender.send(event.clone());
        }
    }

    fn broadcast_auth(&self, event: AuthEvent) {
        let subscribers = self.shared.auth_subscribers.lock().unwrap();
        for sender in subscribers.values() {
            let _ = sender.send(event.clone());
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthClient for MemoryBackend {
    async fn current_identity(&self) -> Result<Option<Identity>, AuthError> {
        Ok(self.shared.session.lock().unwrap().clone())
    }

    fn subscribe_identity(&self) -> IdentityFeed {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.shared.next_subscriber.fetch_add(1, Ordering::SeqCst);
        self.shared.auth_subscribers.lock().unwrap().insert(id, tx);

        let shared = self.shared.clone();
        IdentityFeed::new(
            rx,
            Subscription::new(move || {
                shared.auth_subscribers.lock().unwrap().remove(&id);
            }),
        )
    }

    async fn sign_in_with_provider(
        &self,
        provider: &str,
        redirect_to: &str,
    ) -> Result<String, AuthError> {
        Ok(format!(
            "memory://authorize?provider={}&redirect_to={}",
            provider, redirect_to
        ))
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let had_session = self.shared.session.lock().unwrap().take().is_some();
        if had_session {
            self.broadcast_auth(AuthEvent::SignedOut);
        }
        Ok(())
    }

    async fn exchange_code(&self, code: &str) -> Result<Identity, AuthError> {
        let identity = self.shared.issued_codes.lock().unwrap().remove(code);
        match identity {
            Some(identity) => {
                *self.shared.session.lock().unwrap() = Some(identity.clone());
                self.broadcast_auth(AuthEvent::SignedIn(identity.clone()));
                Ok(identity)
            }
            None => Err(AuthError::ExchangeFailed(
                "unknown or expired authorization code".to_string(),
            )),
        }
    }
}

#[async_trait]
impl DataClient for MemoryBackend {
    async fn fetch_where_owner(&self, owner_id: &str) -> Result<Vec<Bookmark>, BackendError> {
        if Self::take_flag(&self.shared.fail_next_fetch) {
            return Err(BackendError::Rejected("injected fetch failure".to_string()));
        }

        let mut rows: Vec<Bookmark> = self
            .shared
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.owner_id == owner_id)
            .cloned()
            .collect();
        rows.sort_by(Bookmark::newer_first);
        Ok(rows)
    }

    async fn insert(&self, record: NewBookmark) -> Result<Bookmark, BackendError> {
        if Self::take_flag(&self.shared.fail_next_insert) {
            return Err(BackendError::Rejected(
                "injected insert failure".to_string(),
            ));
        }

        let bookmark = Bookmark {
            id: Uuid::new_v4().to_string(),
            title: record.title,
            url: record.url,
            created_at: self.next_timestamp(),
            owner_id: record.owner_id,
        };
        self.shared.rows.lock().unwrap().push(bookmark.clone());
        self.broadcast_change(ChangeEvent::Inserted(bookmark.clone()));
        Ok(bookmark)
    }

    async fn delete_by_id(&self, id: &str) -> Result<(), BackendError> {
        if Self::take_flag(&self.shared.fail_next_delete) {
            return Err(BackendError::Rejected(
                "injected delete failure".to_string(),
            ));
        }

        let removed = {
            let mut rows = self.shared.rows.lock().unwrap();
            let before = rows.len();
            rows.retain(|b| b.id != id);
            rows.len() != before
        };
        // The service only notifies for rows that actually existed.
        if removed {
            self.broadcast_change(ChangeEvent::Deleted { id: id.to_string() });
        }
        Ok(())
    }

    fn subscribe_changes(&self) -> ChangeFeed {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.shared.next_subscriber.fetch_add(1, Ordering::SeqCst);
        self.shared
            .change_subscribers
            .lock()
            .unwrap()
            .insert(id, tx);

        let shared = self.shared.clone();
        ChangeFeed::new(
            rx,
            Subscription::new(move || {
                shared.change_subscribers.lock().unwrap().remove(&id);
            }),
        )
    }
}
