//! Presentation layer for Smartmark.
//!
//! Stateless rendering: a pure function of the current identity, the
//! synchronized collection, and in-flight flags produces the view to draw.
//! The only presentation-owned state is the transient add-bookmark form.

use serde::{Deserialize, Serialize};

use crate::types::bookmark::Bookmark;
use crate::types::identity::Identity;

/// Flags for operations currently in flight.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InFlight {
    /// The initial session query has not completed yet.
    pub checking_session: bool,
    /// A full collection fetch is running.
    pub loading_bookmarks: bool,
    /// An add intent is waiting on the backend.
    pub adding: bool,
}

/// What the UI should draw.
#[derive(Debug, Clone, PartialEq)]
pub enum View {
    /// Session check still in flight; show a spinner.
    CheckingSession,
    /// Signed out.
    Welcome,
    /// Signed in with no bookmarks yet.
    EmptyDashboard { identity: Identity },
    /// Signed in with bookmarks, newest first.
    Dashboard {
        identity: Identity,
        bookmarks: Vec<Bookmark>,
        refreshing: bool,
    },
}

/// Intents the presentation layer can emit.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    RequestSignIn,
    RequestSignOut,
    RequestAdd { title: String, url: String },
    RequestDelete { id: String },
}

/// Draft state of the add-bookmark form.
#[derive(Debug, Clone, Default)]
pub struct BookmarkForm {
    pub title: String,
    pub url: String,
    pub error: Option<String>,
}

impl BookmarkForm {
    /// Validates the draft and produces an add intent.
    ///
    /// Empty fields are recovered inline; no intent is emitted and the form
    /// keeps its contents so the user can correct them.
    pub fn submit(&mut self) -> Option<Intent> {
        self.error = None;
        if self.title.trim().is_empty() || self.url.trim().is_empty() {
            self.error = Some("Please fill in both URL and Title.".to_string());
            return None;
        }
        Some(Intent::RequestAdd {
            title: self.title.trim().to_string(),
            url: self.url.trim().to_string(),
        })
    }

    /// Resets the draft after a successful add.
    pub fn clear(&mut self) {
        self.title.clear();
        self.url.clear();
        self.error = None;
    }
}

/// Renders the current application state.
///
/// The three authenticated/unauthenticated views are mutually exclusive;
/// the session spinner takes precedence while the initial query runs.
pub fn render(identity: Option<&Identity>, bookmarks: &[Bookmark], flags: &InFlight) -> View {
    if flags.checking_session {
        return View::CheckingSession;
    }

    let identity = match identity {
        Some(identity) => identity.clone(),
        None => return View::Welcome,
    };

    if bookmarks.is_empty() {
        View::EmptyDashboard { identity }
    } else {
        View::Dashboard {
            identity,
            bookmarks: bookmarks.to_vec(),
            refreshing: flags.loading_bookmarks,
        }
    }
}
