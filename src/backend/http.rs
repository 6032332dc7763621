//! HTTP backend for Smartmark.
//!
//! Talks to the managed backend service over its REST dialect: code exchange
//! and sign-out against the auth endpoints, owner-filtered reads and
//! representation-returning writes against the table endpoints, and a
//! streaming line-delimited JSON change feed. Every response body is parsed
//! and validated before it reaches the rest of the application.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use futures::StreamExt;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::backend::{AuthClient, ChangeFeed, DataClient, IdentityFeed, Subscription};
use crate::services::backend_config::BackendSettings;
use crate::types::bookmark::{Bookmark, NewBookmark};
use crate::types::change::{AuthEvent, ChangeEvent};
use crate::types::errors::{AuthError, BackendError};
use crate::types::identity::Identity;

struct SessionState {
    access_token: String,
    expires_at: Option<i64>,
}

/// HTTP implementation of both collaborator interfaces.
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    session: Arc<Mutex<Option<SessionState>>>,
    auth_subscribers: Arc<Mutex<HashMap<u64, mpsc::UnboundedSender<AuthEvent>>>>,
    next_subscriber: AtomicU64,
}

impl HttpBackend {
    pub fn new(settings: &BackendSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            anon_key: settings.anon_key.clone(),
            session: Arc::new(Mutex::new(None)),
            auth_subscribers: Arc::new(Mutex::new(HashMap::new())),
            next_subscriber: AtomicU64::new(0),
        }
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/bookmarks", self.base_url)
    }

    fn bearer(&self) -> Option<String> {
        self.session
            .lock()
            .unwrap()
            .as_ref()
            .map(|s| s.access_token.clone())
    }

    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64
    }

    /// Decodes the `exp` claim from a JWT access token without verifying the
    /// signature. Verification belongs to the backend; the claim is only
    /// used to short-circuit requests with a token known to be stale.
    fn decode_jwt_exp(token: &str) -> Option<i64> {
        let payload = token.split('.').nth(1)?;
        let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
        let claims: Value = serde_json::from_slice(&bytes).ok()?;
        claims.get("exp").and_then(|v| v.as_i64())
    }

    /// Builds an `Identity` from the auth service's user object.
    fn identity_from_user(user: &Value) -> Result<Identity, AuthError> {
        let id = user
            .get("id")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AuthError::MalformedResponse("user object missing id".to_string()))?;

        let email = user
            .get("email")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());
        let avatar_url = user
            .get("user_metadata")
            .and_then(|m| m.get("avatar_url"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        Ok(Identity {
            id: id.to_string(),
            email,
            avatar_url,
        })
    }

    fn clear_session(&self) -> bool {
        self.session.lock().unwrap().take().is_some()
    }

    fn broadcast_auth(&self, event: AuthEvent) {
        let subscribers = self.auth_subscribers.lock().unwrap();
        for sender in subscribers.values() {
            let _ = sender.send(event.clone());
        }
    }

    /// Parses one line of the change stream into an event.
    ///
    /// Keep-alive lines and frames that do not validate are skipped; a full
    /// refetch remains the recovery path for anything the feed misses.
    fn parse_change_line(line: &str) -> Option<ChangeEvent> {
        let value: Value = serde_json::from_str(line).ok()?;
        match value.get("type").and_then(|v| v.as_str())? {
            "INSERT" => {
                let record = value.get("record")?;
                Bookmark::from_record(record).ok().map(ChangeEvent::Inserted)
            }
            "DELETE" => {
                let id = value
                    .get("old_record")
                    .and_then(|r| r.get("id"))
                    .and_then(|v| v.as_str())?;
                Some(ChangeEvent::Deleted { id: id.to_string() })
            }
            _ => None,
        }
    }
}

#[async_trait]
impl AuthClient for HttpBackend {
    /// Validates the stored session against the auth service and returns the
    /// current identity, or `None` when signed out.
    async fn current_identity(&self) -> Result<Option<Identity>, AuthError> {
        let (token, expires_at) = match self.session.lock().unwrap().as_ref() {
            Some(s) => (s.access_token.clone(), s.expires_at),
            None => return Ok(None),
        };

        if let Some(exp) = expires_at {
            if exp <= Self::now() {
                self.clear_session();
                self.broadcast_auth(AuthEvent::SignedOut);
                return Err(AuthError::SessionExpired);
            }
        }

        let response = self
            .http
            .get(self.auth_url("user"))
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            // The service no longer recognizes the token.
            self.clear_session();
            self.broadcast_auth(AuthEvent::SignedOut);
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(AuthError::Network(format!(
                "user query returned {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;
        let user: Value = serde_json::from_str(&body)
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;
        let identity = Self::identity_from_user(&user)?;
        Ok(Some(identity))
    }

    fn subscribe_identity(&self) -> IdentityFeed {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_subscriber.fetch_add(1, Ordering::SeqCst);
        self.auth_subscribers.lock().unwrap().insert(id, tx);

        let subscribers = self.auth_subscribers.clone();
        IdentityFeed::new(
            rx,
            Subscription::new(move || {
                subscribers.lock().unwrap().remove(&id);
            }),
        )
    }

    async fn sign_in_with_provider(
        &self,
        provider: &str,
        redirect_to: &str,
    ) -> Result<String, AuthError> {
        Ok(format!(
            "{}?provider={}&redirect_to={}",
            self.auth_url("authorize"),
            provider,
            redirect_to
        ))
    }

    /// Ends the session. The local session is cleared even if the server
    /// call fails; the server-side token simply expires on its own.
    async fn sign_out(&self) -> Result<(), AuthError> {
        let token = self.bearer();
        if self.clear_session() {
            self.broadcast_auth(AuthEvent::SignedOut);
        }

        if let Some(token) = token {
            self.http
                .post(self.auth_url("logout"))
                .header("apikey", &self.anon_key)
                .header("Authorization", format!("Bearer {}", token))
                .send()
                .await
                .map_err(|e| AuthError::Network(e.to_string()))?;
        }
        Ok(())
    }

    async fn exchange_code(&self, code: &str) -> Result<Identity, AuthError> {
        let body = serde_json::to_string(&json!({ "auth_code": code }))
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;

        let response = self
            .http
            .post(format!(
                "{}?grant_type=authorization_code",
                self.auth_url("token")
            ))
            .header("apikey", &self.anon_key)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(AuthError::ExchangeFailed(format!(
                "token endpoint returned {}",
                status
            )));
        }

        let payload: Value = serde_json::from_str(&text)
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;
        let access_token = payload
            .get("access_token")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                AuthError::MalformedResponse("token response missing access_token".to_string())
            })?
            .to_string();
        let user = payload.get("user").ok_or_else(|| {
            AuthError::MalformedResponse("token response missing user".to_string())
        })?;
        let identity = Self::identity_from_user(user)?;

        let expires_at = payload
            .get("expires_at")
            .and_then(|v| v.as_i64())
            .or_else(|| Self::decode_jwt_exp(&access_token));

        *self.session.lock().unwrap() = Some(SessionState {
            access_token,
            expires_at,
        });
        self.broadcast_auth(AuthEvent::SignedIn(identity.clone()));
        Ok(identity)
    }
}

#[async_trait]
impl DataClient for HttpBackend {
    async fn fetch_where_owner(&self, owner_id: &str) -> Result<Vec<Bookmark>, BackendError> {
        let url = format!(
            "{}?select=*&owner_id=eq.{}&order=created_at.desc",
            self.table_url(),
            owner_id
        );
        let mut request = self.http.get(url).header("apikey", &self.anon_key);
        if let Some(token) = self.bearer() {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;
        if !status.is_success() {
            return Err(BackendError::Rejected(format!(
                "fetch returned {}",
                status
            )));
        }

        let rows: Vec<Value> = serde_json::from_str(&text)
            .map_err(|e| BackendError::MalformedRecord(e.to_string()))?;
        rows.iter().map(Bookmark::from_record).collect()
    }

    async fn insert(&self, record: NewBookmark) -> Result<Bookmark, BackendError> {
        let body = serde_json::to_string(&record)
            .map_err(|e| BackendError::MalformedRecord(e.to_string()))?;
        let mut request = self
            .http
            .post(self.table_url())
            .header("apikey", &self.anon_key)
            .header("Content-Type", "application/json")
            .header("Prefer", "return=representation")
            .body(body);
        if let Some(token) = self.bearer() {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;
        if !status.is_success() {
            return Err(BackendError::Rejected(format!(
                "insert returned {}",
                status
            )));
        }

        // Representation responses come back as a one-element array.
        let value: Value = serde_json::from_str(&text)
            .map_err(|e| BackendError::MalformedRecord(e.to_string()))?;
        let row = match &value {
            Value::Array(rows) => rows.first().ok_or_else(|| {
                BackendError::MalformedRecord("insert returned no rows".to_string())
            })?,
            other => other,
        };
        Bookmark::from_record(row)
    }

    async fn delete_by_id(&self, id: &str) -> Result<(), BackendError> {
        let url = format!("{}?id=eq.{}", self.table_url(), id);
        let mut request = self.http.delete(url).header("apikey", &self.anon_key);
        if let Some(token) = self.bearer() {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;
        if !response.status().is_success() {
            return Err(BackendError::Rejected(format!(
                "delete returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    /// Opens the streaming change feed and pumps it into a channel.
    ///
    /// Must be called from within a tokio runtime; the pump task is aborted
    /// when the returned feed is dropped.
    fn subscribe_changes(&self) -> ChangeFeed {
        let (tx, rx) = mpsc::unbounded_channel();
        let http = self.http.clone();
        let url = format!(
            "{}/realtime/v1/stream?table=bookmarks",
            self.base_url
        );
        let anon_key = self.anon_key.clone();
        let token = self.bearer();

        let handle = tokio::spawn(async move {
            let mut request = http.get(url).header("apikey", &anon_key);
            if let Some(token) = token {
                request = request.header("Authorization", format!("Bearer {}", token));
            }
            let response = match request.send().await {
                Ok(r) if r.status().is_success() => r,
                _ => return,
            };

            let mut stream = response.bytes_stream();
            let mut buffer: Vec<u8> = Vec::new();
            while let Some(chunk) = stream.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(_) => break,
                };
                buffer.extend_from_slice(&chunk);
                while let Some(newline) = buffer.iter().position(|&b| b == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=newline).collect();
                    let line = String::from_utf8_lossy(&line);
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    if let Some(event) = HttpBackend::parse_change_line(line) {
                        if tx.send(event).is_err() {
                            return;
                        }
                    }
                }
            }
        });

        ChangeFeed::new(rx, Subscription::new(move || handle.abort()))
    }
}
