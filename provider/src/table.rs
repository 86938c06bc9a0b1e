//! Filtered queries against the hosted table API.
//!
//! The table API is PostgREST-shaped: filters are query parameters
//! (`column=eq.value`), single-object reads use the
//! `application/vnd.pgrst.object+json` accept header, and updates are
//! `PATCH` requests scoped by the same filters. Row-level security applies:
//! requests are made with the signed-in user's token when one exists,
//! falling back to the anon key.

use std::sync::Arc;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::auth::AuthClient;
use crate::error::ProviderError;
use crate::response;

/// PostgREST status for "single object requested, no rows matched".
const STATUS_NO_ROWS: u16 = 406;

/// A query against one table, built up with filters before execution.
pub struct TableQuery {
    http: Client,
    base_url: String,
    anon_key: String,
    auth: Arc<AuthClient>,
    table: String,
    filters: Vec<(String, String)>,
    columns: String,
}

impl TableQuery {
    pub(crate) fn new(
        http: Client,
        base_url: String,
        anon_key: String,
        auth: Arc<AuthClient>,
        table: &str,
    ) -> Self {
        Self {
            http,
            base_url,
            anon_key,
            auth,
            table: table.to_string(),
            filters: Vec::new(),
            columns: "*".to_string(),
        }
    }

    /// Filter rows where `column` equals `value`.
    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters
            .push((column.to_string(), format!("eq.{}", value.to_string())));
        self
    }

    /// Restrict the selected columns (default `*`).
    pub fn select(mut self, columns: &str) -> Self {
        self.columns = columns.to_string();
        self
    }

    /// Fetch at most one row matching the filters.
    ///
    /// `Ok(None)` when no row matches; this is not an error.
    pub async fn fetch_optional<T: DeserializeOwned>(self) -> Result<Option<T>, ProviderError> {
        let url = format!("{}/rest/v1/{}", self.base_url, self.table);
        let token = self.bearer_token().await;

        let mut params = self.filters;
        params.push(("select".to_string(), self.columns));

        tracing::debug!(table = %self.table, "fetching single row");

        let response = self
            .http
            .get(&url)
            .query(&params)
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .header("Accept", "application/vnd.pgrst.object+json")
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if response.status().as_u16() == STATUS_NO_ROWS {
            return Ok(None);
        }

        response::decode(response).await.map(Some)
    }

    /// Update all rows matching the filters with the given patch.
    pub async fn update<P: Serialize>(self, patch: &P) -> Result<(), ProviderError> {
        let url = format!("{}/rest/v1/{}", self.base_url, self.table);
        let token = self.bearer_token().await;

        tracing::debug!(table = %self.table, "updating rows");

        let response = self
            .http
            .patch(&url)
            .query(&self.filters)
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .header("Prefer", "return=minimal")
            .json(patch)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        response::ensure_ok(response).await
    }

    async fn bearer_token(&self) -> String {
        self.auth
            .access_token()
            .await
            .unwrap_or_else(|| self.anon_key.clone())
    }
}
