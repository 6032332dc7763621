//! Mutation Gateway for Smartmark.
//!
//! Translates UI intents into backend write calls. Validation failures are
//! caught here before any backend call is attempted; backend outcomes are
//! reported back for the synchronizer to reconcile.

use std::sync::Arc;

use async_trait::async_trait;

use crate::backend::DataClient;
use crate::types::bookmark::{Bookmark, NewBookmark};
use crate::types::errors::GatewayError;
use crate::types::identity::Identity;

/// Trait defining the mutation gateway interface.
#[async_trait]
pub trait MutationGatewayTrait {
    /// Inserts a bookmark for `identity`. Returns the backend-assigned
    /// record for the synchronizer to merge.
    async fn add_bookmark(
        &self,
        title: &str,
        url: &str,
        identity: Option<&Identity>,
    ) -> Result<Bookmark, GatewayError>;

    /// Deletes a bookmark. The caller is expected to have applied the
    /// optimistic removal first, and to reconcile on failure.
    async fn delete_bookmark(&self, id: &str) -> Result<(), GatewayError>;
}

/// Mutation gateway backed by a data collaborator handle.
pub struct MutationGateway {
    data: Arc<dyn DataClient>,
}

impl MutationGateway {
    /// Creates a new MutationGateway using the provided data client handle.
    pub fn new(data: Arc<dyn DataClient>) -> Self {
        Self { data }
    }
}

#[async_trait]
impl MutationGatewayTrait for MutationGateway {
    async fn add_bookmark(
        &self,
        title: &str,
        url: &str,
        identity: Option<&Identity>,
    ) -> Result<Bookmark, GatewayError> {
        let title = title.trim();
        let url = url.trim();

        if title.is_empty() {
            return Err(GatewayError::EmptyTitle);
        }
        if url.is_empty() {
            return Err(GatewayError::EmptyUrl);
        }
        let identity = identity.ok_or(GatewayError::NotSignedIn)?;

        self.data
            .insert(NewBookmark {
                title: title.to_string(),
                url: url.to_string(),
                owner_id: identity.id.clone(),
            })
            .await
            .map_err(|e| GatewayError::Backend(e.to_string()))
    }

    async fn delete_bookmark(&self, id: &str) -> Result<(), GatewayError> {
        self.data
            .delete_by_id(id)
            .await
            .map_err(|e| GatewayError::Backend(e.to_string()))
    }
}
