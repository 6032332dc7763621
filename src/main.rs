//! Smartmark — a personal bookmark manager with live cross-session sync.
//!
//! Entry point: runs an interactive console demo against the in-memory
//! backend, walking through sign-in, live sync, and failure reconciliation.

use std::sync::Arc;

use smartmark::app::App;
use smartmark::auth_callback::{handle_callback, CallbackOutcome};
use smartmark::backend::memory::MemoryBackend;
use smartmark::backend::{AuthClient, DataClient};
use smartmark::managers::synchronizer::SynchronizerTrait;
use smartmark::services::backend_config::{BackendConfig, BackendConfigTrait};
use smartmark::types::bookmark::NewBookmark;
use smartmark::types::identity::Identity;
use smartmark::view::{BookmarkForm, Intent, View};

#[tokio::main]
async fn main() {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║             Smartmark v{} — Demo Mode                     ║", env!("CARGO_PKG_VERSION"));
    println!("║     Bookmarks synced live across sessions                  ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    let backend = MemoryBackend::new();
    let auth: Arc<dyn AuthClient> = Arc::new(backend.clone());
    let data: Arc<dyn DataClient> = Arc::new(backend.clone());

    let mut config = BackendConfig::new(None);
    let settings = config.load().expect("config load failed");
    let mut app = App::new(auth, data, &settings);

    demo_config(&config);
    demo_sign_in(&mut app, &backend).await;
    demo_add_bookmarks(&mut app).await;
    demo_live_sync(&mut app, &backend).await;
    demo_delete_failure(&mut app, &backend).await;
    demo_sign_out(&mut app).await;

    app.shutdown();

    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("  ✅ All components demonstrated successfully!");
    println!("═══════════════════════════════════════════════════════════════");
}

fn section(name: &str) {
    println!("───────────────────────────────────────────────────────────────");
    println!("  📦 {}", name);
    println!("───────────────────────────────────────────────────────────────");
}

fn show(app: &App) {
    match app.render() {
        View::CheckingSession => println!("  [view] checking session..."),
        View::Welcome => println!("  [view] Welcome to Smartmark — sign in to get started"),
        View::EmptyDashboard { identity } => {
            println!(
                "  [view] {} — no bookmarks yet",
                identity.email.as_deref().unwrap_or(&identity.id)
            );
        }
        View::Dashboard {
            identity,
            bookmarks,
            ..
        } => {
            println!(
                "  [view] {} — {} bookmark(s):",
                identity.email.as_deref().unwrap_or(&identity.id),
                bookmarks.len()
            );
            for bookmark in &bookmarks {
                println!(
                    "         {} — {} ({})",
                    bookmark.created_at, bookmark.title, bookmark.url
                );
            }
        }
    }
}

fn demo_config(config: &BackendConfig) {
    section("Backend Config");
    let settings = config.settings();
    println!("  Config path: {}", config.config_path());
    println!("  Base URL: {}", settings.base_url);
    println!("  Provider: {}", settings.provider_id);
    println!("  ✓ Settings loaded");
    println!();
}

async fn demo_sign_in(app: &mut App, backend: &MemoryBackend) {
    section("Sign-in Flow");

    app.startup().await;
    show(app);

    app.handle_intent(Intent::RequestSignIn).await;
    println!(
        "  Authorize URL: {}",
        app.sign_in_url.as_deref().unwrap_or("(none)")
    );

    // The provider redirects back to the callback route with a code.
    let identity = Identity {
        id: "user-demo".to_string(),
        email: Some("demo@example.com".to_string()),
        avatar_url: None,
    };
    let code = backend.issue_code(identity);
    let outcome = handle_callback(backend, &format!("code={}", code)).await;
    assert_eq!(outcome, CallbackOutcome::RedirectHome);
    println!("  Callback exchanged code ✓ (redirect to /)");

    app.pump_pending().await;
    show(app);
    println!();
}

async fn demo_add_bookmarks(app: &mut App) {
    section("Adding Bookmarks");

    let mut form = BookmarkForm::default();
    form.title = "Rust Book".to_string();
    form.url = "https://doc.rust-lang.org/book".to_string();
    if let Some(intent) = form.submit() {
        app.handle_intent(intent).await;
        form.clear();
    }

    form.title = "Crates".to_string();
    form.url = "https://crates.io".to_string();
    if let Some(intent) = form.submit() {
        app.handle_intent(intent).await;
        form.clear();
    }

    // A blank form is caught inline, before any backend call.
    let rejected = form.submit();
    assert!(rejected.is_none());
    println!(
        "  Blank form rejected inline: {}",
        form.error.as_deref().unwrap_or("(no error)")
    );

    app.pump_pending().await;
    show(app);
    println!();
}

async fn demo_live_sync(app: &mut App, backend: &MemoryBackend) {
    section("Live Cross-Session Sync");

    // A second session (another tab) writes to the same backend.
    let other_session: Arc<dyn DataClient> = Arc::new(backend.clone());
    other_session
        .insert(NewBookmark {
            title: "Added in another tab".to_string(),
            url: "https://example.com/elsewhere".to_string(),
            owner_id: "user-demo".to_string(),
        })
        .await
        .expect("remote insert failed");

    app.pump_pending().await;
    show(app);
    println!("  ✓ Notification merged without a refetch");
    println!();
}

async fn demo_delete_failure(app: &mut App, backend: &MemoryBackend) {
    section("Optimistic Delete + Failure Reconciliation");

    let first_id = app.synchronizer.collection()[0].id.clone();
    backend.fail_next_delete();
    app.handle_intent(Intent::RequestDelete { id: first_id }).await;
    println!(
        "  Delete failed: {}",
        app.last_error.as_deref().unwrap_or("(no error)")
    );
    show(app);
    println!("  ✓ Full resync restored the optimistically removed row");

    let first_id = app.synchronizer.collection()[0].id.clone();
    app.handle_intent(Intent::RequestDelete { id: first_id }).await;
    app.pump_pending().await;
    show(app);
    println!("  ✓ Second attempt deleted for real");
    println!();
}

async fn demo_sign_out(app: &mut App) {
    section("Sign Out");

    app.handle_intent(Intent::RequestSignOut).await;
    app.pump_pending().await;
    show(app);
    println!("  ✓ Collection cleared on sign-out");
}
