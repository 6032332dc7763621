//! Unit tests for the authentication redirect handoff.
//!
//! The callback route must exchange a present code for a session and send
//! the user home; a missing code or failed exchange lands on the terminal
//! error view.

use rstest::rstest;

use smartmark::auth_callback::{extract_code, handle_callback, CallbackOutcome};
use smartmark::backend::memory::MemoryBackend;
use smartmark::backend::AuthClient;
use smartmark::types::identity::Identity;

#[rstest]
#[case("code=abc123", Some("abc123"))]
#[case("?code=abc123", Some("abc123"))]
#[case("state=xyz&code=abc123", Some("abc123"))]
#[case("code=", None)]
#[case("state=xyz", None)]
#[case("", None)]
#[case("codex=abc", None)]
fn extract_code_finds_the_code_parameter(#[case] query: &str, #[case] expected: Option<&str>) {
    assert_eq!(extract_code(query).as_deref(), expected);
}

#[tokio::test]
async fn valid_code_establishes_session_and_redirects_home() {
    let backend = MemoryBackend::new();
    let code = backend.issue_code(Identity::bare("u1"));

    let outcome = handle_callback(&backend, &format!("code={}", code)).await;

    assert_eq!(outcome, CallbackOutcome::RedirectHome);
    let identity = backend
        .current_identity()
        .await
        .expect("identity query failed");
    assert_eq!(identity.map(|i| i.id), Some("u1".to_string()));
}

#[tokio::test]
async fn missing_code_redirects_to_error_view() {
    let backend = MemoryBackend::new();

    let outcome = handle_callback(&backend, "state=only").await;

    assert_eq!(outcome, CallbackOutcome::RedirectError);
}

#[tokio::test]
async fn failed_exchange_redirects_to_error_view() {
    let backend = MemoryBackend::new();

    let outcome = handle_callback(&backend, "code=never-issued").await;

    assert_eq!(outcome, CallbackOutcome::RedirectError);
    let identity = backend
        .current_identity()
        .await
        .expect("identity query failed");
    assert!(identity.is_none());
}

/// An issued code is single-use.
#[tokio::test]
async fn code_cannot_be_exchanged_twice() {
    let backend = MemoryBackend::new();
    let code = backend.issue_code(Identity::bare("u1"));
    let query = format!("code={}", code);

    assert_eq!(
        handle_callback(&backend, &query).await,
        CallbackOutcome::RedirectHome
    );
    assert_eq!(
        handle_callback(&backend, &query).await,
        CallbackOutcome::RedirectError
    );
}
