//! Client for the hosted backend-as-a-service used by CampusConnect.
//!
//! Two surfaces, matching what the service exposes:
//! - [`AuthClient`]: password sign-in/sign-up/sign-out, current-session
//!   resolution, and an observer for auth-state transitions.
//! - [`TableQuery`]: filtered reads and updates against the relational
//!   table API, authorized with the current session's token.
//!
//! The service owns credential storage, token issuance, and refresh; this
//! crate only consumes its HTTP API.

pub mod auth;
pub mod error;
mod response;
pub mod table;

pub use auth::{
    AuthChangeEvent, AuthClient, AuthStateListener, AuthSubscription, AuthUser, Session,
    SignUpResponse,
};
pub use error::ProviderError;
pub use table::TableQuery;

use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;

/// Connection settings for the hosted service.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Project base URL, e.g. `https://abcdefgh.example.co`.
    pub url: String,
    /// Public (anon) API key sent with every request.
    pub anon_key: String,
    /// Where to mirror the current session so a restarted process can
    /// resume it. In-memory only when unset.
    #[serde(default)]
    pub session_file: Option<PathBuf>,
}

/// Entry point: shared HTTP client plus the auth and table surfaces.
pub struct Provider {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    auth: Arc<AuthClient>,
}

impl Provider {
    pub fn new(config: ProviderConfig) -> Self {
        let http = reqwest::Client::new();
        let base_url = config.url.trim_end_matches('/').to_string();
        let auth = Arc::new(AuthClient::new(
            http.clone(),
            base_url.clone(),
            config.anon_key.clone(),
            config.session_file,
        ));
        Self {
            http,
            base_url,
            anon_key: config.anon_key,
            auth,
        }
    }

    pub fn auth(&self) -> &Arc<AuthClient> {
        &self.auth
    }

    /// Start a query against `table`.
    pub fn table(&self, table: &str) -> TableQuery {
        TableQuery::new(
            self.http.clone(),
            self.base_url.clone(),
            self.anon_key.clone(),
            self.auth.clone(),
            table,
        )
    }
}
