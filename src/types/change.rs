use crate::types::bookmark::Bookmark;
use crate::types::identity::Identity;

/// A change notification delivered by the backend's live feed.
///
/// Notifications describe a row mutation performed by any session, including
/// this one — the synchronizer is responsible for collapsing echoes of its
/// own writes.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// A row was inserted. Carries the full validated record.
    Inserted(Bookmark),
    /// A row was deleted. Only the id survives in the payload.
    Deleted { id: String },
}

/// A session presence transition reported by the auth collaborator.
///
/// Delivery is at-least-once for the terminal state; intermediate
/// transitions (token refreshes) may re-announce the same identity.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    SignedIn(Identity),
    SignedOut,
}
