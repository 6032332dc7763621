//! Bookmark Synchronizer for Smartmark.
//!
//! Owns the canonical in-memory collection for the current identity and
//! merges three input streams into it: the initial authenticated fetch,
//! optimistic local mutations, and change notifications delivered by the
//! backend. The collection is always deduplicated by id and kept sorted
//! newest-first across merges.

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::backend::DataClient;
use crate::types::bookmark::Bookmark;
use crate::types::change::ChangeEvent;
use crate::types::errors::SyncError;
use crate::types::identity::Identity;

/// Lifecycle of the synchronized collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No load has been attempted for the current identity.
    Uninitialized,
    /// A full fetch is in flight.
    Loading,
    /// The collection reflects the last successful fetch plus merges.
    Ready,
    /// No identity is signed in; the collection is empty by definition.
    EmptyReady,
}

/// Expected effect of a write applied locally but not yet confirmed by the
/// backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectedEffect {
    Insert { id: String },
    Remove { id: String },
}

#[derive(Debug, Clone)]
struct PendingOp {
    op_id: String,
    effect: ExpectedEffect,
}

/// Log of optimistic effects awaiting backend confirmation.
///
/// Out-of-order notification delivery and failure rollback both resolve
/// against this log: a notification matching a pending effect is an echo of
/// our own write, and a failed operation identifies exactly what must be
/// rolled back.
#[derive(Debug, Default)]
pub struct PendingLog {
    ops: Vec<PendingOp>,
}

impl PendingLog {
    /// Records an effect and returns its operation id.
    pub fn begin(&mut self, effect: ExpectedEffect) -> String {
        let op_id = Uuid::new_v4().to_string();
        self.ops.push(PendingOp {
            op_id: op_id.clone(),
            effect,
        });
        op_id
    }

    /// Resolves a confirmed operation.
    pub fn complete(&mut self, op_id: &str) -> Option<ExpectedEffect> {
        self.remove_op(op_id)
    }

    /// Resolves a failed operation, returning the effect needing rollback.
    pub fn fail(&mut self, op_id: &str) -> Option<ExpectedEffect> {
        self.remove_op(op_id)
    }

    /// Matches a change notification against pending effects. Returns true
    /// if the notification confirms an effect already applied locally.
    pub fn absorb(&mut self, change: &ChangeEvent) -> bool {
        let index = self.ops.iter().position(|op| match (&op.effect, change) {
            (ExpectedEffect::Insert { id }, ChangeEvent::Inserted(b)) => *id == b.id,
            (ExpectedEffect::Remove { id }, ChangeEvent::Deleted { id: deleted }) => id == deleted,
            _ => false,
        });
        match index {
            Some(index) => {
                self.ops.remove(index);
                true
            }
            None => false,
        }
    }

    /// Drops every pending effect referencing the given row id.
    pub fn drop_for_id(&mut self, id: &str) {
        self.ops.retain(|op| match &op.effect {
            ExpectedEffect::Insert { id: op_id } | ExpectedEffect::Remove { id: op_id } => {
                op_id != id
            }
        });
    }

    pub fn clear(&mut self) {
        self.ops.clear();
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    fn remove_op(&mut self, op_id: &str) -> Option<ExpectedEffect> {
        let index = self.ops.iter().position(|op| op.op_id == op_id)?;
        Some(self.ops.remove(index).effect)
    }
}

/// Trait defining the synchronizer interface.
#[async_trait]
pub trait SynchronizerTrait {
    /// Replaces the collection with a full fetch for `identity`.
    async fn load(&mut self, identity: &Identity) -> Result<(), SyncError>;
    /// Inserts at the sorted position if the id is not already present.
    fn apply_local_insert(&mut self, bookmark: Bookmark) -> bool;
    /// Removes the matching element; no-op if absent.
    fn apply_local_delete(&mut self, id: &str) -> bool;
    /// Optimistic removal that also records a pending effect. Returns the
    /// operation id when a row was actually removed.
    fn begin_local_delete(&mut self, id: &str) -> Option<String>;
    /// Merges a gateway insert response and records a pending effect so the
    /// echoed notification is absorbed.
    fn merge_confirmed_insert(&mut self, bookmark: Bookmark) -> bool;
    /// Resolves a confirmed operation.
    fn confirm_op(&mut self, op_id: &str) -> Option<ExpectedEffect>;
    /// Resolves a failed operation.
    fn fail_op(&mut self, op_id: &str) -> Option<ExpectedEffect>;
    /// Merges an external change notification.
    fn apply_change(&mut self, change: ChangeEvent) -> bool;
    /// Restores consistency after a failed backend delete by reloading.
    async fn reconcile_delete_failure(
        &mut self,
        id: &str,
        identity: &Identity,
    ) -> Result<(), SyncError>;
    /// Adopts a new identity (clearing the collection) or clears out on
    /// sign-out.
    fn handle_identity_change(&mut self, identity: Option<&Identity>);
    fn collection(&self) -> &[Bookmark];
    fn state(&self) -> SyncState;
    fn pending_len(&self) -> usize;
}

/// Synchronizer backed by a data collaborator handle.
pub struct Synchronizer {
    data: Arc<dyn DataClient>,
    state: SyncState,
    owner_id: Option<String>,
    collection: Vec<Bookmark>,
    pending: PendingLog,
}

impl Synchronizer {
    /// Creates a new Synchronizer using the provided data client handle.
    pub fn new(data: Arc<dyn DataClient>) -> Self {
        Self {
            data,
            state: SyncState::Uninitialized,
            owner_id: None,
            collection: Vec::new(),
            pending: PendingLog::default(),
        }
    }

    /// Id of the identity the collection currently belongs to.
    pub fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }
}

#[async_trait]
impl SynchronizerTrait for Synchronizer {
    /// Fetches all bookmarks owned by `identity`, newest first, replacing
    /// the collection and clearing the pending log.
    ///
    /// On fetch failure the prior collection is left unchanged
    /// (stale-but-consistent) and the prior state restored — except when the
    /// owner changed, where the collection is always cleared first and stays
    /// cleared.
    async fn load(&mut self, identity: &Identity) -> Result<(), SyncError> {
        let owner_changed = self.owner_id.as_deref() != Some(identity.id.as_str());
        if owner_changed {
            // Never let a failed fetch leave another user's rows visible.
            self.collection.clear();
            self.pending.clear();
            self.owner_id = Some(identity.id.clone());
        }

        let prior_state = self.state;
        self.state = SyncState::Loading;

        match self.data.fetch_where_owner(&identity.id).await {
            Ok(mut rows) => {
                rows.sort_by(Bookmark::newer_first);
                self.collection = rows;
                self.pending.clear();
                self.state = SyncState::Ready;
                Ok(())
            }
            Err(e) => {
                self.state = if owner_changed || prior_state == SyncState::Uninitialized {
                    SyncState::Uninitialized
                } else {
                    prior_state
                };
                Err(SyncError::FetchFailed(e.to_string()))
            }
        }
    }

    /// Dedup key is the id. Records owned by anyone other than the current
    /// identity are dropped at this boundary.
    fn apply_local_insert(&mut self, bookmark: Bookmark) -> bool {
        if self.owner_id.as_deref() != Some(bookmark.owner_id.as_str()) {
            return false;
        }
        if self.collection.iter().any(|b| b.id == bookmark.id) {
            return false;
        }

        let position = self
            .collection
            .iter()
            .position(|existing| Bookmark::newer_first(&bookmark, existing) == Ordering::Less)
            .unwrap_or(self.collection.len());
        self.collection.insert(position, bookmark);
        true
    }

    fn apply_local_delete(&mut self, id: &str) -> bool {
        let before = self.collection.len();
        self.collection.retain(|b| b.id != id);
        self.collection.len() != before
    }

    fn begin_local_delete(&mut self, id: &str) -> Option<String> {
        if !self.apply_local_delete(id) {
            return None;
        }
        Some(self.pending.begin(ExpectedEffect::Remove { id: id.to_string() }))
    }

    fn merge_confirmed_insert(&mut self, bookmark: Bookmark) -> bool {
        let id = bookmark.id.clone();
        if !self.apply_local_insert(bookmark) {
            // The notification beat the gateway response; nothing pending.
            return false;
        }
        self.pending.begin(ExpectedEffect::Insert { id });
        true
    }

    fn confirm_op(&mut self, op_id: &str) -> Option<ExpectedEffect> {
        self.pending.complete(op_id)
    }

    fn fail_op(&mut self, op_id: &str) -> Option<ExpectedEffect> {
        self.pending.fail(op_id)
    }

    /// Insert notifications dedup against optimistic inserts; delete
    /// notifications for absent ids are silently ignored. Both no-ops are
    /// success, not errors.
    fn apply_change(&mut self, change: ChangeEvent) -> bool {
        if self.pending.absorb(&change) {
            // Echo of a write this session already applied.
            return false;
        }
        match change {
            ChangeEvent::Inserted(bookmark) => self.apply_local_insert(bookmark),
            ChangeEvent::Deleted { id } => self.apply_local_delete(&id),
        }
    }

    /// A failed delete after an optimistic removal cannot be undone in
    /// place: the row's position depends on server-assigned order. Restores
    /// consistency with a full reload.
    async fn reconcile_delete_failure(
        &mut self,
        id: &str,
        identity: &Identity,
    ) -> Result<(), SyncError> {
        // Drop any stale expectation so the restored row is not absorbed
        // away by a later notification match.
        self.pending.drop_for_id(id);
        self.load(identity).await
    }

    fn handle_identity_change(&mut self, identity: Option<&Identity>) {
        self.collection.clear();
        self.pending.clear();
        match identity {
            Some(identity) => {
                self.owner_id = Some(identity.id.clone());
                self.state = SyncState::Uninitialized;
            }
            None => {
                self.owner_id = None;
                self.state = SyncState::EmptyReady;
            }
        }
    }

    fn collection(&self) -> &[Bookmark] {
        &self.collection
    }

    fn state(&self) -> SyncState {
        self.state
    }

    fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
