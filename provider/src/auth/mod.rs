//! Password authentication against the hosted identity service.
//!
//! The client owns the current session: it is stored in memory, optionally
//! mirrored to a JSON file so a restarted process can resume it, and every
//! change is reported to registered [`AuthStateListener`]s.

mod observer;
pub(crate) mod types;

pub use observer::{AuthChangeEvent, AuthStateListener, AuthSubscription};
pub use types::{AuthUser, Session, SignUpResponse};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use reqwest::Client;
use serde_json::json;
use tokio::sync::RwLock;

use crate::error::ProviderError;
use crate::response;
use observer::ListenerRegistry;

/// Client for the identity endpoints.
pub struct AuthClient {
    http: Client,
    base_url: String,
    anon_key: String,
    session: RwLock<Option<Session>>,
    session_file: Option<PathBuf>,
    /// Serializes refresh-token exchanges; with token rotation a second
    /// concurrent exchange would fail and wipe the first one's session.
    refresh_lock: tokio::sync::Mutex<()>,
    listeners: ListenerRegistry,
}

impl AuthClient {
    pub(crate) fn new(
        http: Client,
        base_url: String,
        anon_key: String,
        session_file: Option<PathBuf>,
    ) -> Self {
        let session = session_file.as_deref().and_then(load_session_file);
        Self {
            http,
            base_url,
            anon_key,
            session: RwLock::new(session),
            session_file,
            refresh_lock: tokio::sync::Mutex::new(()),
            listeners: ListenerRegistry::default(),
        }
    }

    /// Exchange email + password for a session.
    ///
    /// On success the session becomes the current one and `SignedIn` is
    /// emitted.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ProviderError> {
        let url = format!("{}/auth/v1/token?grant_type=password", self.base_url);
        tracing::debug!(%email, "signing in");

        let response = self
            .http
            .post(&url)
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let session: Session = response::decode(response).await?;
        self.store_session(Some(session.clone()), AuthChangeEvent::SignedIn)
            .await;
        Ok(session)
    }

    /// Register a new account. `metadata` is stored on the user record
    /// (the display name travels as `full_name`).
    ///
    /// With auto-confirm enabled the service issues a session immediately;
    /// it is stored and `SignedIn` emitted. Otherwise the caller gets the
    /// pending user back and no session exists until the first sign-in.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Value,
    ) -> Result<SignUpResponse, ProviderError> {
        let url = format!("{}/auth/v1/signup", self.base_url);
        tracing::debug!(%email, "signing up");

        let response = self
            .http
            .post(&url)
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password, "data": metadata }))
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let sign_up: SignUpResponse = response::decode(response).await?;
        if let Some(session) = sign_up.session() {
            self.store_session(Some(session.clone()), AuthChangeEvent::SignedIn)
                .await;
        }
        Ok(sign_up)
    }

    /// Revoke the current session.
    ///
    /// The local session is cleared and `SignedOut` emitted even when the
    /// remote revocation fails; the error is still returned so callers can
    /// log it.
    pub async fn sign_out(&self) -> Result<(), ProviderError> {
        let token = self.access_token().await;

        let remote = match token {
            Some(token) => {
                let url = format!("{}/auth/v1/logout", self.base_url);
                match self
                    .http
                    .post(&url)
                    .header("apikey", &self.anon_key)
                    .bearer_auth(token)
                    .send()
                    .await
                {
                    Ok(response) => response::ensure_ok(response).await,
                    Err(e) => Err(ProviderError::Transport(e.to_string())),
                }
            }
            None => Ok(()),
        };

        self.store_session(None, AuthChangeEvent::SignedOut).await;
        remote
    }

    /// The current session, if any.
    ///
    /// An expired session is refreshed once via its refresh token; if that
    /// fails the session is cleared and `SignedOut` emitted, and `None` is
    /// returned.
    pub async fn current_session(&self) -> Option<Session> {
        let session = self.session.read().await.clone()?;
        if !session.is_expired(Utc::now()) {
            return Some(session);
        }

        let _refreshing = self.refresh_lock.lock().await;
        // Another caller may have completed the exchange while we waited.
        let session = self.session.read().await.clone()?;
        if !session.is_expired(Utc::now()) {
            return Some(session);
        }

        match self.refresh(&session.refresh_token).await {
            Ok(refreshed) => {
                self.store_session(Some(refreshed.clone()), AuthChangeEvent::TokenRefreshed)
                    .await;
                Some(refreshed)
            }
            Err(e) => {
                tracing::warn!("session refresh failed: {}", e);
                self.store_session(None, AuthChangeEvent::SignedOut).await;
                None
            }
        }
    }

    /// Access token of the current session, if any. Does not refresh.
    pub async fn access_token(&self) -> Option<String> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token.clone())
    }

    /// Register a listener for auth-state transitions.
    pub async fn on_auth_state_change(
        &self,
        listener: Arc<dyn AuthStateListener>,
    ) -> AuthSubscription {
        self.listeners.register(listener).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, ProviderError> {
        let url = format!("{}/auth/v1/token?grant_type=refresh_token", self.base_url);
        tracing::debug!("refreshing session");

        let response = self
            .http
            .post(&url)
            .header("apikey", &self.anon_key)
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        response::decode(response).await
    }

    async fn store_session(&self, session: Option<Session>, event: AuthChangeEvent) {
        *self.session.write().await = session.clone();
        if let Err(e) = self.persist_session(session.as_ref()) {
            tracing::warn!("failed to persist session: {}", e);
        }
        self.listeners.emit(event, session.as_ref()).await;
    }

    fn persist_session(&self, session: Option<&Session>) -> Result<(), ProviderError> {
        let Some(path) = self.session_file.as_deref() else {
            return Ok(());
        };
        match session {
            Some(session) => {
                let body = serde_json::to_string(session)
                    .map_err(|e| ProviderError::SessionPersistence(e.to_string()))?;
                std::fs::write(path, body)
                    .map_err(|e| ProviderError::SessionPersistence(e.to_string()))
            }
            None => match std::fs::remove_file(path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(ProviderError::SessionPersistence(e.to_string())),
            },
        }
    }
}

fn load_session_file(path: &Path) -> Option<Session> {
    let body = match std::fs::read_to_string(path) {
        Ok(body) => body,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!("failed to read session file {}: {}", path.display(), e);
            return None;
        }
    };
    match serde_json::from_str(&body) {
        Ok(session) => Some(session),
        Err(e) => {
            tracing::warn!("ignoring malformed session file {}: {}", path.display(), e);
            None
        }
    }
}
