//! Shared response handling for the auth and table endpoints.

use serde::de::DeserializeOwned;

use crate::auth::types::ApiErrorBody;
use crate::error::ProviderError;

/// Check the status and decode the JSON body.
///
/// Non-2xx responses are turned into `ProviderError::Api` with the message
/// extracted from the service's error body.
pub(crate) async fn decode<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ProviderError> {
    let body = read_ok(response).await?;
    serde_json::from_str(&body).map_err(|e| ProviderError::InvalidResponse(e.to_string()))
}

/// Check the status and discard the body.
pub(crate) async fn ensure_ok(response: reqwest::Response) -> Result<(), ProviderError> {
    read_ok(response).await.map(|_| ())
}

async fn read_ok(response: reqwest::Response) -> Result<String, ProviderError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::Transport(e.to_string()))?;

    if !status.is_success() {
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .ok()
            .and_then(ApiErrorBody::into_message)
            .unwrap_or_else(|| format!("request failed with status {}", status.as_u16()));
        return Err(ProviderError::Api {
            status: status.as_u16(),
            message,
        });
    }

    Ok(body)
}
