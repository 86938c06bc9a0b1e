//! Access to the `profiles` table.

use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use campus_provider::{Provider, ProviderError};

use crate::models::ProfileRecord;

const PROFILES_TABLE: &str = "profiles";

/// Reads and writes profile rows keyed by the auth user id.
pub struct ProfileStore {
    provider: Arc<Provider>,
}

impl ProfileStore {
    pub fn new(provider: Arc<Provider>) -> Self {
        Self { provider }
    }

    /// Fetch a user's profile row, `None` when it does not exist yet.
    pub async fn fetch(&self, user_id: Uuid) -> Result<Option<ProfileRecord>, ProviderError> {
        self.provider
            .table(PROFILES_TABLE)
            .eq("id", user_id)
            .fetch_optional()
            .await
    }

    /// Persist the display name chosen at sign-up.
    pub async fn set_full_name(
        &self,
        user_id: Uuid,
        full_name: &str,
    ) -> Result<(), ProviderError> {
        self.provider
            .table(PROFILES_TABLE)
            .eq("id", user_id)
            .update(&json!({ "full_name": full_name }))
            .await
    }
}
