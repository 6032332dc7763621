//! Session Store for Smartmark.
//!
//! Holds the current authenticated identity and folds collaborator presence
//! events into it. The collaborator is the source of truth; nothing is
//! persisted locally.

use crate::types::change::AuthEvent;
use crate::types::identity::Identity;

/// What a presence event changed about the session.
#[derive(Debug, Clone, PartialEq)]
pub enum IdentityTransition {
    /// The same session (or absence of one) was re-announced.
    Unchanged,
    /// A user signed in where there was none.
    SignedIn(Identity),
    /// The session ended.
    SignedOut,
    /// A different user replaced the session without an intervening
    /// sign-out.
    Switched(Identity),
}

/// Trait defining the session store interface.
pub trait SessionStoreTrait {
    fn current(&self) -> Option<&Identity>;
    fn is_signed_in(&self) -> bool;
    fn seed(&mut self, identity: Option<Identity>) -> IdentityTransition;
    fn apply(&mut self, event: AuthEvent) -> IdentityTransition;
}

/// In-memory holder of the current identity.
pub struct SessionStore {
    current: Option<Identity>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self { current: None }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStoreTrait for SessionStore {
    fn current(&self) -> Option<&Identity> {
        self.current.as_ref()
    }

    fn is_signed_in(&self) -> bool {
        self.current.is_some()
    }

    /// Installs the result of the initial collaborator query.
    fn seed(&mut self, identity: Option<Identity>) -> IdentityTransition {
        match identity {
            Some(identity) => self.apply(AuthEvent::SignedIn(identity)),
            None => self.apply(AuthEvent::SignedOut),
        }
    }

    /// Folds a presence event into the store and reports what changed.
    ///
    /// Transitions are idempotent: at-least-once delivery of the terminal
    /// state never produces a spurious transition. A re-announcement of the
    /// same user (token refresh) reports `Unchanged` but still refreshes the
    /// stored display attributes, since providers may rotate them.
    fn apply(&mut self, event: AuthEvent) -> IdentityTransition {
        match event {
            AuthEvent::SignedIn(identity) => match &self.current {
                Some(current) if current.id == identity.id => {
                    self.current = Some(identity);
                    IdentityTransition::Unchanged
                }
                Some(_) => {
                    self.current = Some(identity.clone());
                    IdentityTransition::Switched(identity)
                }
                None => {
                    self.current = Some(identity.clone());
                    IdentityTransition::SignedIn(identity)
                }
            },
            AuthEvent::SignedOut => {
                if self.current.take().is_some() {
                    IdentityTransition::SignedOut
                } else {
                    IdentityTransition::Unchanged
                }
            }
        }
    }
}
