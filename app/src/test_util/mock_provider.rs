//! JSON bodies in the shapes the hosted service returns, for wiremock-backed
//! tests.

use serde_json::{json, Value};
use uuid::Uuid;

/// Auth user object. `confirmed` controls `email_confirmed_at`.
pub fn user_json(user_id: Uuid, email: &str, full_name: &str, confirmed: bool) -> Value {
    let mut user = json!({
        "id": user_id,
        "email": email,
        "user_metadata": { "full_name": full_name },
        "created_at": "2024-03-01T10:00:00Z",
        "updated_at": "2024-03-01T10:00:00Z"
    });
    if confirmed {
        user["email_confirmed_at"] = json!("2024-03-01T10:00:00Z");
    }
    user
}

/// Successful token / auto-confirmed sign-up response.
pub fn session_json(user_id: Uuid, email: &str, full_name: &str) -> Value {
    json!({
        "access_token": format!("access-{user_id}"),
        "token_type": "bearer",
        "expires_in": 3600,
        "expires_at": chrono::Utc::now().timestamp() + 3600,
        "refresh_token": format!("refresh-{user_id}"),
        "user": user_json(user_id, email, full_name, true)
    })
}

/// A `profiles` row.
pub fn profile_json(user_id: Uuid, email: &str, full_name: Option<&str>) -> Value {
    json!({
        "id": user_id,
        "email": email,
        "full_name": full_name,
        "year": "3rd Year",
        "department": "Computer Engineering",
        "avatar_url": null,
        "created_at": "2024-03-01T10:00:00Z",
        "updated_at": "2024-03-01T10:00:00Z"
    })
}

/// Error body in the service's `error_description` spelling.
pub fn error_json(message: &str) -> Value {
    json!({ "error_description": message })
}
