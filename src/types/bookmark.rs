use serde::{Deserialize, Serialize};

use crate::types::errors::BackendError;

/// A saved bookmark owned by a single user.
///
/// `id` and `created_at` are assigned by the backend; `created_at` is a unix
/// timestamp in seconds and drives the newest-first display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: String,
    pub title: String,
    pub url: String,
    pub created_at: i64,
    pub owner_id: String,
}

/// Input for a bookmark insert. The backend assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBookmark {
    pub title: String,
    pub url: String,
    pub owner_id: String,
}

impl Bookmark {
    /// Comparator placing newer records first, with the id as a stable
    /// tie-break for records sharing a timestamp.
    pub fn newer_first(a: &Bookmark, b: &Bookmark) -> std::cmp::Ordering {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    }

    /// Parses and validates an untyped backend record.
    ///
    /// Records cross the trust boundary here: shape mismatches and empty
    /// required fields fail with `BackendError::MalformedRecord` instead of
    /// being carried into the collection.
    pub fn from_record(value: &serde_json::Value) -> Result<Bookmark, BackendError> {
        let bookmark: Bookmark = serde_json::from_value(value.clone())
            .map_err(|e| BackendError::MalformedRecord(e.to_string()))?;

        if bookmark.id.is_empty() {
            return Err(BackendError::MalformedRecord("record has empty id".to_string()));
        }
        if bookmark.title.trim().is_empty() {
            return Err(BackendError::MalformedRecord(format!(
                "record {} has empty title",
                bookmark.id
            )));
        }
        if bookmark.url.trim().is_empty() {
            return Err(BackendError::MalformedRecord(format!(
                "record {} has empty url",
                bookmark.id
            )));
        }
        if bookmark.owner_id.is_empty() {
            return Err(BackendError::MalformedRecord(format!(
                "record {} has empty owner_id",
                bookmark.id
            )));
        }

        Ok(bookmark)
    }
}
