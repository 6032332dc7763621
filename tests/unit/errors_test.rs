use smartmark::types::errors::*;

// === AuthError Tests ===

#[test]
fn auth_error_display_variants() {
    assert_eq!(
        AuthError::Network("timeout".to_string()).to_string(),
        "Auth network error: timeout"
    );
    assert_eq!(
        AuthError::ExchangeFailed("bad code".to_string()).to_string(),
        "Code exchange failed: bad code"
    );
    assert_eq!(
        AuthError::MalformedResponse("missing user".to_string()).to_string(),
        "Malformed auth response: missing user"
    );
    assert_eq!(AuthError::SessionExpired.to_string(), "Session expired");
}

#[test]
fn auth_error_implements_error_trait() {
    let err: Box<dyn std::error::Error> = Box::new(AuthError::SessionExpired);
    assert!(err.source().is_none());
}

// === BackendError Tests ===

#[test]
fn backend_error_display_variants() {
    assert_eq!(
        BackendError::Network("refused".to_string()).to_string(),
        "Backend network error: refused"
    );
    assert_eq!(
        BackendError::Rejected("policy".to_string()).to_string(),
        "Backend rejected operation: policy"
    );
    assert_eq!(
        BackendError::MalformedRecord("empty id".to_string()).to_string(),
        "Malformed backend record: empty id"
    );
}

// === SyncError Tests ===

#[test]
fn sync_error_display_variants() {
    assert_eq!(
        SyncError::FetchFailed("503".to_string()).to_string(),
        "Bookmark fetch failed: 503"
    );
    assert_eq!(SyncError::FeedClosed.to_string(), "Change feed closed");
}

#[test]
fn sync_error_implements_error_trait() {
    let err: Box<dyn std::error::Error> = Box::new(SyncError::FeedClosed);
    assert!(err.source().is_none());
}

// === GatewayError Tests ===

#[test]
fn gateway_error_display_variants() {
    assert_eq!(
        GatewayError::EmptyTitle.to_string(),
        "Title must not be empty"
    );
    assert_eq!(GatewayError::EmptyUrl.to_string(), "URL must not be empty");
    assert_eq!(
        GatewayError::NotSignedIn.to_string(),
        "You must be signed in to modify bookmarks"
    );
    assert_eq!(
        GatewayError::Backend("409".to_string()).to_string(),
        "Backend write failed: 409"
    );
}

#[test]
fn gateway_error_validation_classification() {
    assert!(GatewayError::EmptyTitle.is_validation());
    assert!(GatewayError::EmptyUrl.is_validation());
    assert!(GatewayError::NotSignedIn.is_validation());
    assert!(!GatewayError::Backend("500".to_string()).is_validation());
}

// === ConfigError Tests ===

#[test]
fn config_error_display_variants() {
    assert_eq!(
        ConfigError::IoError("denied".to_string()).to_string(),
        "Config I/O error: denied"
    );
    assert_eq!(
        ConfigError::SerializationError("eof".to_string()).to_string(),
        "Config serialization error: eof"
    );
}
