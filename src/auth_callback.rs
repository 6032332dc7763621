//! Authentication redirect handoff for Smartmark.
//!
//! After provider sign-in the user lands on the callback route with a
//! `code` query parameter. The handler exchanges it for a session and
//! decides where to send the user next. Extracted as a pure handler so it
//! can be unit-tested without any transport.

use crate::backend::AuthClient;

/// Where the callback should send the user next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Session established; return to the application root.
    RedirectHome,
    /// Missing code or failed exchange; show the terminal error view.
    RedirectError,
}

/// Extracts the `code` parameter from a raw query string.
///
/// Authorization codes are opaque URL-safe tokens, so no percent-decoding
/// is applied.
pub fn extract_code(query: &str) -> Option<String> {
    query
        .trim_start_matches('?')
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "code")
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// Handles the provider redirect: exchanges the code for a session.
///
/// Exchange failure is not recoverable inline; anything other than a
/// successful exchange redirects to the dedicated error view.
pub async fn handle_callback(auth: &dyn AuthClient, query: &str) -> CallbackOutcome {
    let code = match extract_code(query) {
        Some(code) => code,
        None => return CallbackOutcome::RedirectError,
    };

    match auth.exchange_code(&code).await {
        Ok(_) => CallbackOutcome::RedirectHome,
        Err(_) => CallbackOutcome::RedirectError,
    }
}
