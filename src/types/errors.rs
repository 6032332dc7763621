use std::fmt;

// === AuthError ===

/// Errors from the external auth collaborator.
#[derive(Debug)]
pub enum AuthError {
    /// A network error occurred while talking to the auth service.
    Network(String),
    /// Exchanging an authorization code for a session failed.
    ExchangeFailed(String),
    /// The auth service returned a response that could not be parsed.
    MalformedResponse(String),
    /// The stored session token has expired.
    SessionExpired,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::Network(msg) => write!(f, "Auth network error: {}", msg),
            AuthError::ExchangeFailed(msg) => write!(f, "Code exchange failed: {}", msg),
            AuthError::MalformedResponse(msg) => {
                write!(f, "Malformed auth response: {}", msg)
            }
            AuthError::SessionExpired => write!(f, "Session expired"),
        }
    }
}

impl std::error::Error for AuthError {}

// === BackendError ===

/// Errors from the external data collaborator.
#[derive(Debug)]
pub enum BackendError {
    /// A network error occurred while talking to the data service.
    Network(String),
    /// The backend rejected the operation (policy, constraint, or status).
    Rejected(String),
    /// A record crossing the boundary failed shape validation.
    MalformedRecord(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Network(msg) => write!(f, "Backend network error: {}", msg),
            BackendError::Rejected(msg) => write!(f, "Backend rejected operation: {}", msg),
            BackendError::MalformedRecord(msg) => {
                write!(f, "Malformed backend record: {}", msg)
            }
        }
    }
}

impl std::error::Error for BackendError {}

// === SyncError ===

/// Errors from the bookmark synchronizer.
#[derive(Debug)]
pub enum SyncError {
    /// A full fetch failed. The prior collection is left unchanged.
    FetchFailed(String),
    /// A collaborator feed closed while the synchronizer still needed it.
    FeedClosed,
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::FetchFailed(msg) => write!(f, "Bookmark fetch failed: {}", msg),
            SyncError::FeedClosed => write!(f, "Change feed closed"),
        }
    }
}

impl std::error::Error for SyncError {}

// === GatewayError ===

/// Errors from the mutation gateway.
///
/// The first three variants are validation errors: they are recovered
/// locally, shown inline, and no backend call is attempted.
#[derive(Debug)]
pub enum GatewayError {
    /// The trimmed bookmark title was empty.
    EmptyTitle,
    /// The trimmed bookmark URL was empty.
    EmptyUrl,
    /// No identity is signed in.
    NotSignedIn,
    /// The backend write failed.
    Backend(String),
}

impl GatewayError {
    /// True for errors caught before any backend call.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            GatewayError::EmptyTitle | GatewayError::EmptyUrl | GatewayError::NotSignedIn
        )
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::EmptyTitle => write!(f, "Title must not be empty"),
            GatewayError::EmptyUrl => write!(f, "URL must not be empty"),
            GatewayError::NotSignedIn => write!(f, "You must be signed in to modify bookmarks"),
            GatewayError::Backend(msg) => write!(f, "Backend write failed: {}", msg),
        }
    }
}

impl std::error::Error for GatewayError {}

// === ConfigError ===

/// Errors related to backend configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// An I/O error occurred while reading or writing the config file.
    IoError(String),
    /// Failed to serialize or deserialize the configuration.
    SerializationError(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(msg) => write!(f, "Config I/O error: {}", msg),
            ConfigError::SerializationError(msg) => {
                write!(f, "Config serialization error: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
