//! Unit tests for the Mutation Gateway.
//!
//! Validation failures must be caught before any backend call; successful
//! writes return the backend-assigned record for the synchronizer to merge.

use std::sync::Arc;

use smartmark::backend::memory::MemoryBackend;
use smartmark::backend::DataClient;
use smartmark::managers::mutation_gateway::{MutationGateway, MutationGatewayTrait};
use smartmark::types::bookmark::NewBookmark;
use smartmark::types::errors::GatewayError;
use smartmark::types::identity::Identity;

/// Helper: create a MutationGateway backed by a fresh in-memory backend.
fn setup() -> (MemoryBackend, MutationGateway) {
    let backend = MemoryBackend::new();
    let gateway = MutationGateway::new(Arc::new(backend.clone()));
    (backend, gateway)
}

#[tokio::test]
async fn empty_title_is_a_validation_error() {
    let (_backend, gateway) = setup();
    let identity = Identity::bare("u1");

    let err = gateway
        .add_bookmark("   ", "https://x.test", Some(&identity))
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::EmptyTitle));
    assert!(err.is_validation());
}

#[tokio::test]
async fn empty_url_is_a_validation_error() {
    let (_backend, gateway) = setup();
    let identity = Identity::bare("u1");

    let err = gateway
        .add_bookmark("Docs", "\t\n", Some(&identity))
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::EmptyUrl));
    assert!(err.is_validation());
}

#[tokio::test]
async fn missing_identity_is_a_validation_error() {
    let (_backend, gateway) = setup();

    let err = gateway
        .add_bookmark("Docs", "https://x.test", None)
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::NotSignedIn));
    assert!(err.is_validation());
}

/// Validation happens before the backend is touched: an injected failure
/// stays armed through a rejected intent.
#[tokio::test]
async fn validation_error_makes_no_backend_call() {
    let (backend, gateway) = setup();
    let identity = Identity::bare("u1");

    backend.fail_next_insert();
    let err = gateway
        .add_bookmark("", "https://x.test", Some(&identity))
        .await
        .unwrap_err();
    assert!(err.is_validation());

    // The injected failure fires on the first real call.
    let err = gateway
        .add_bookmark("Docs", "https://x.test", Some(&identity))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Backend(_)));
}

/// A successful add returns the server record with authoritative fields and
/// trimmed input.
#[tokio::test]
async fn successful_add_returns_server_record() {
    let (backend, gateway) = setup();
    let identity = Identity::bare("u1");

    let bookmark = gateway
        .add_bookmark("  Docs  ", " https://x.test ", Some(&identity))
        .await
        .expect("add failed");

    assert!(!bookmark.id.is_empty());
    assert!(bookmark.created_at > 0);
    assert_eq!(bookmark.title, "Docs");
    assert_eq!(bookmark.url, "https://x.test");
    assert_eq!(bookmark.owner_id, "u1");

    // The row is visible to a fresh fetch.
    let rows = backend.fetch_where_owner("u1").await.expect("fetch failed");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0], bookmark);
}

#[tokio::test]
async fn backend_rejection_surfaces_as_backend_error() {
    let (backend, gateway) = setup();

    let seeded = backend
        .insert(NewBookmark {
            title: "Docs".to_string(),
            url: "https://x.test".to_string(),
            owner_id: "u1".to_string(),
        })
        .await
        .expect("seed failed");

    backend.fail_next_delete();
    let err = gateway.delete_bookmark(&seeded.id).await.unwrap_err();

    assert!(matches!(err, GatewayError::Backend(_)));
    assert!(!err.is_validation());
}

#[tokio::test]
async fn delete_of_absent_id_succeeds() {
    let (_backend, gateway) = setup();
    gateway
        .delete_bookmark("missing")
        .await
        .expect("absent delete should be success");
}
