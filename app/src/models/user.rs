use serde::Serialize;
use uuid::Uuid;

use campus_provider::Session;

use super::profile::ProfileRecord;

/// Normalized user record handed to the rest of the application.
///
/// Every field is populated whenever a user exists; transitions replace the
/// whole value, never individual fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

impl ApplicationUser {
    /// Reconcile a session with its (possibly missing) profile row.
    ///
    /// This is the single construction path used by sign-in, session resume,
    /// and background auth changes, so all of them derive identical users
    /// from the same inputs.
    pub fn from_session_and_profile(session: &Session, profile: Option<&ProfileRecord>) -> Self {
        let email = session
            .email()
            .map(str::to_string)
            .or_else(|| profile.and_then(|p| p.email.clone()))
            .unwrap_or_default();
        let name = display_name(profile.and_then(|p| p.full_name.as_deref()), &email);
        Self {
            id: session.user_id(),
            email,
            name,
        }
    }
}

/// Process-wide authentication state.
///
/// Starts `Unresolved` until the startup session check completes, then is
/// only ever `SignedOut` or `SignedIn`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Unresolved,
    SignedOut,
    SignedIn(ApplicationUser),
}

impl AuthState {
    pub fn user(&self) -> Option<&ApplicationUser> {
        match self {
            AuthState::SignedIn(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, AuthState::Unresolved)
    }
}

/// Display-name fallback chain: profile name, then the email local-part,
/// then a literal default. Never returns an empty string.
pub fn display_name(profile_name: Option<&str>, email: &str) -> String {
    if let Some(name) = profile_name {
        let name = name.trim();
        if !name.is_empty() {
            return name.to_string();
        }
    }
    let local_part = email.split('@').next().unwrap_or("");
    if !local_part.is_empty() {
        return local_part.to_string();
    }
    "User".to_string()
}
