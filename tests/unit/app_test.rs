//! Integration tests for the App composition root.
//!
//! Drives the full wiring — session store, synchronizer, gateway, and both
//! collaborator feeds — against the in-memory backend, pumping events
//! deterministically between steps.

use std::sync::Arc;

use smartmark::app::App;
use smartmark::backend::memory::MemoryBackend;
use smartmark::backend::{AuthClient, DataClient};
use smartmark::managers::session_store::SessionStoreTrait;
use smartmark::managers::synchronizer::{SyncState, SynchronizerTrait};
use smartmark::services::backend_config::BackendSettings;
use smartmark::types::bookmark::NewBookmark;
use smartmark::types::identity::Identity;
use smartmark::view::{Intent, View};

fn setup() -> (MemoryBackend, App) {
    let backend = MemoryBackend::new();
    let auth: Arc<dyn AuthClient> = Arc::new(backend.clone());
    let data: Arc<dyn DataClient> = Arc::new(backend.clone());
    let app = App::new(auth, data, &BackendSettings::default());
    (backend, app)
}

fn user(id: &str) -> Identity {
    Identity {
        id: id.to_string(),
        email: Some(format!("{}@example.com", id)),
        avatar_url: None,
    }
}

fn record(title: &str, owner: &str) -> NewBookmark {
    NewBookmark {
        title: title.to_string(),
        url: format!("https://x.test/{}", title),
        owner_id: owner.to_string(),
    }
}

fn collection_titles(app: &App) -> Vec<String> {
    app.synchronizer
        .collection()
        .iter()
        .map(|b| b.title.clone())
        .collect()
}

#[tokio::test]
async fn startup_without_session_renders_welcome() {
    let (_backend, mut app) = setup();

    app.startup().await;

    assert_eq!(app.render(), View::Welcome);
    assert_eq!(app.synchronizer.state(), SyncState::EmptyReady);
}

#[tokio::test]
async fn startup_with_existing_session_loads_bookmarks() {
    let (backend, mut app) = setup();
    backend.insert(record("pre-existing", "u1")).await.unwrap();
    backend.complete_sign_in(user("u1"));

    app.startup().await;

    assert_eq!(collection_titles(&app), vec!["pre-existing"]);
    assert_eq!(app.synchronizer.state(), SyncState::Ready);
}

#[tokio::test]
async fn sign_in_event_triggers_initial_load() {
    let (backend, mut app) = setup();
    app.startup().await;
    assert_eq!(app.render(), View::Welcome);

    backend.insert(record("mine", "u1")).await.unwrap();
    backend.complete_sign_in(user("u1"));
    app.pump_pending().await;

    assert!(app.session.is_signed_in());
    assert_eq!(collection_titles(&app), vec!["mine"]);
    match app.render() {
        View::Dashboard { bookmarks, .. } => assert_eq!(bookmarks.len(), 1),
        other => panic!("expected dashboard, got {:?}", other),
    }
}

#[tokio::test]
async fn add_intent_merges_once_despite_echo() {
    let (backend, mut app) = setup();
    app.startup().await;
    backend.complete_sign_in(user("u1"));
    app.pump_pending().await;

    app.handle_intent(Intent::RequestAdd {
        title: "Docs".to_string(),
        url: "https://x.test/docs".to_string(),
    })
    .await;
    assert_eq!(collection_titles(&app), vec!["Docs"]);

    // The backend echoes the insert through the change feed.
    app.pump_pending().await;
    assert_eq!(collection_titles(&app), vec!["Docs"]);
    assert_eq!(app.synchronizer.pending_len(), 0);
}

#[tokio::test]
async fn add_without_session_surfaces_validation_error() {
    let (_backend, mut app) = setup();
    app.startup().await;

    app.handle_intent(Intent::RequestAdd {
        title: "Docs".to_string(),
        url: "https://x.test/docs".to_string(),
    })
    .await;

    assert!(app
        .last_error
        .as_deref()
        .unwrap_or_default()
        .contains("signed in"));
    assert!(app.synchronizer.collection().is_empty());
}

#[tokio::test]
async fn cross_session_insert_arrives_via_change_feed() {
    let (backend, mut app) = setup();
    app.startup().await;
    backend.complete_sign_in(user("u1"));
    app.pump_pending().await;

    // Another tab writes to the same backend.
    let other_tab: Arc<dyn DataClient> = Arc::new(backend.clone());
    other_tab.insert(record("from-elsewhere", "u1")).await.unwrap();

    app.pump_pending().await;
    assert_eq!(collection_titles(&app), vec!["from-elsewhere"]);
}

#[tokio::test]
async fn foreign_owner_notifications_are_ignored() {
    let (backend, mut app) = setup();
    app.startup().await;
    backend.complete_sign_in(user("u1"));
    app.pump_pending().await;

    backend.insert(record("not-mine", "u2")).await.unwrap();
    app.pump_pending().await;

    assert!(app.synchronizer.collection().is_empty());
}

#[tokio::test]
async fn delete_failure_restores_row_via_resync() {
    let (backend, mut app) = setup();
    app.startup().await;
    backend.complete_sign_in(user("u1"));
    app.pump_pending().await;

    app.handle_intent(Intent::RequestAdd {
        title: "Keep me".to_string(),
        url: "https://x.test/keep".to_string(),
    })
    .await;
    app.pump_pending().await;
    let id = app.synchronizer.collection()[0].id.clone();

    backend.fail_next_delete();
    app.handle_intent(Intent::RequestDelete { id }).await;

    assert!(app.last_error.is_some());
    assert_eq!(collection_titles(&app), vec!["Keep me"]);
    assert_eq!(app.synchronizer.pending_len(), 0);
}

#[tokio::test]
async fn successful_delete_removes_row_and_absorbs_echo() {
    let (backend, mut app) = setup();
    app.startup().await;
    backend.complete_sign_in(user("u1"));
    app.pump_pending().await;

    app.handle_intent(Intent::RequestAdd {
        title: "Doomed".to_string(),
        url: "https://x.test/doomed".to_string(),
    })
    .await;
    app.pump_pending().await;
    let id = app.synchronizer.collection()[0].id.clone();

    app.handle_intent(Intent::RequestDelete { id }).await;
    assert!(app.synchronizer.collection().is_empty());
    assert!(app.last_error.is_none());

    // The echoed delete notification is a no-op.
    app.pump_pending().await;
    assert!(app.synchronizer.collection().is_empty());
    assert_eq!(app.synchronizer.pending_len(), 0);
}

#[tokio::test]
async fn sign_out_intent_clears_collection() {
    let (backend, mut app) = setup();
    app.startup().await;
    backend.insert(record("mine", "u1")).await.unwrap();
    backend.complete_sign_in(user("u1"));
    app.pump_pending().await;
    assert_eq!(collection_titles(&app), vec!["mine"]);

    app.handle_intent(Intent::RequestSignOut).await;
    app.pump_pending().await;

    assert_eq!(app.render(), View::Welcome);
    assert!(app.synchronizer.collection().is_empty());
    assert_eq!(app.synchronizer.state(), SyncState::EmptyReady);
}

#[tokio::test]
async fn identity_switch_replaces_collection() {
    let (backend, mut app) = setup();
    backend.insert(record("first-users", "u1")).await.unwrap();
    backend.insert(record("second-users", "u2")).await.unwrap();
    backend.complete_sign_in(user("u1"));

    app.startup().await;
    assert_eq!(collection_titles(&app), vec!["first-users"]);

    // A different user takes over the session without signing out first.
    backend.complete_sign_in(user("u2"));
    app.pump_pending().await;

    assert_eq!(collection_titles(&app), vec!["second-users"]);
}

#[tokio::test]
async fn sign_in_intent_produces_authorize_url() {
    let (_backend, mut app) = setup();
    app.startup().await;

    app.handle_intent(Intent::RequestSignIn).await;

    let url = app.sign_in_url.as_deref().expect("url expected");
    assert!(url.contains("provider=google"));
}

#[tokio::test]
async fn shutdown_deregisters_both_subscriptions() {
    let (backend, mut app) = setup();
    app.startup().await;
    assert_eq!(backend.change_subscriber_count(), 1);
    assert_eq!(backend.identity_subscriber_count(), 1);

    app.shutdown();

    assert_eq!(backend.change_subscriber_count(), 0);
    assert_eq!(backend.identity_subscriber_count(), 0);
}
