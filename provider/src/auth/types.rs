//! Wire types for the identity endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Authenticated user record as returned by the identity service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    /// Set once the user has confirmed their address; absent while the
    /// confirmation email is pending.
    #[serde(default)]
    pub email_confirmed_at: Option<DateTime<Utc>>,
    /// Free-form metadata supplied at sign-up (the display name travels here
    /// as `full_name`).
    #[serde(default)]
    pub user_metadata: serde_json::Value,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// An issued session: tokens plus the user they belong to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    /// Unix timestamp of expiry. Absent on older service versions; treated
    /// as unexpired in that case.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub refresh_token: String,
    pub user: AuthUser,
}

impl Session {
    pub fn user_id(&self) -> Uuid {
        self.user.id
    }

    pub fn email(&self) -> Option<&str> {
        self.user.email.as_deref()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(at) => now.timestamp() >= at,
            None => false,
        }
    }
}

/// Response to a sign-up request.
///
/// With auto-confirm enabled the service returns a full session; otherwise it
/// returns the bare user and sends a confirmation email.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SignUpResponse {
    Confirmed(Session),
    Pending(AuthUser),
}

impl SignUpResponse {
    pub fn user(&self) -> &AuthUser {
        match self {
            SignUpResponse::Confirmed(session) => &session.user,
            SignUpResponse::Pending(user) => user,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            SignUpResponse::Confirmed(session) => Some(session),
            SignUpResponse::Pending(_) => None,
        }
    }
}

/// Error body shape. The service spells the human-readable message
/// differently depending on the endpoint.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiErrorBody {
    /// First message the body carries, in endpoint-precedence order.
    pub fn into_message(self) -> Option<String> {
        self.error_description.or(self.msg).or(self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user_json() -> serde_json::Value {
        json!({
            "id": "6f2d6e1a-9f1b-4a2e-8c3d-5b7a9e0c1d2f",
            "email": "jane.doe@nmiet.edu.in",
            "email_confirmed_at": "2024-03-01T10:00:00Z",
            "user_metadata": { "full_name": "Jane Doe" },
            "created_at": "2024-03-01T10:00:00Z"
        })
    }

    #[test]
    fn test_sign_up_response_with_session() {
        let body = json!({
            "access_token": "at",
            "token_type": "bearer",
            "expires_in": 3600,
            "expires_at": 1893456000i64,
            "refresh_token": "rt",
            "user": user_json()
        });
        let parsed: SignUpResponse = serde_json::from_value(body).unwrap();
        assert!(parsed.session().is_some());
        assert_eq!(parsed.user().email.as_deref(), Some("jane.doe@nmiet.edu.in"));
    }

    #[test]
    fn test_sign_up_response_bare_user() {
        let parsed: SignUpResponse = serde_json::from_value(user_json()).unwrap();
        assert!(parsed.session().is_none());
        assert!(parsed.user().email_confirmed_at.is_some());
    }

    #[test]
    fn test_session_expiry() {
        let session: Session = serde_json::from_value(json!({
            "access_token": "at",
            "token_type": "bearer",
            "expires_in": 3600,
            "expires_at": 1000,
            "refresh_token": "rt",
            "user": user_json()
        }))
        .unwrap();
        assert!(session.is_expired(Utc::now()));

        let mut open_ended = session.clone();
        open_ended.expires_at = None;
        assert!(!open_ended.is_expired(Utc::now()));
    }

    #[test]
    fn test_error_body_message_precedence() {
        let body: ApiErrorBody = serde_json::from_value(json!({
            "error_description": "Invalid login credentials",
            "msg": "other"
        }))
        .unwrap();
        assert_eq!(
            body.into_message().as_deref(),
            Some("Invalid login credentials")
        );

        let body: ApiErrorBody =
            serde_json::from_value(json!({ "msg": "User already registered" })).unwrap();
        assert_eq!(body.into_message().as_deref(), Some("User already registered"));

        let body: ApiErrorBody = serde_json::from_value(json!({ "message": "nope" })).unwrap();
        assert_eq!(body.into_message().as_deref(), Some("nope"));

        let body: ApiErrorBody = serde_json::from_value(json!({})).unwrap();
        assert!(body.into_message().is_none());
    }
}
