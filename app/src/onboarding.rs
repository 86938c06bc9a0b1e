//! Interactive sign-in / sign-up flow.
//!
//! The controller validates the submitted form locally, talks to the
//! identity service, reconciles the result with the profile row, and keeps
//! the form's visible state (mode, at most one error or one informational
//! message) current.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use campus_provider::{Provider, ProviderError};

use crate::config::OnboardingConfig;
use crate::models::ApplicationUser;
use crate::profiles::ProfileStore;

/// Minimum accepted password length. A rule of the flow, not a knob.
const MIN_PASSWORD_LEN: usize = 6;

const CONFIRMATION_MESSAGE: &str =
    "Please check your email to confirm your account before signing in.";

/// Which form the user is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    SignIn,
    SignUp,
}

/// A submitted credentials form. `name` is only consulted in sign-up mode.
#[derive(Debug, Clone, Default)]
pub struct CredentialsForm {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// User-facing rejection reasons.
///
/// The display strings are the exact copy shown in the form; the two remote
/// variants carry the service's own message verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OnboardingError {
    #[error("Please use your {domain} email address")]
    WrongDomain { domain: String },

    #[error("Password must be at least 6 characters long")]
    WeakPassword,

    #[error("Please enter your full name")]
    MissingName,

    #[error("{0}")]
    AuthenticationFailed(String),

    #[error("{0}")]
    RegistrationFailed(String),

    #[error("An unexpected error occurred. Please try again.")]
    Unexpected,
}

/// Terminal result of one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Authenticated; the caller should reset the form fields.
    SignedIn(ApplicationUser),
    /// Account created but the confirmation email is pending; no user is
    /// produced and the form will flip to sign-in after the notice delay.
    ConfirmationRequired,
    /// Rejected; the reason is also recorded in the form's error slot.
    Rejected(OnboardingError),
}

#[derive(Debug)]
struct FormState {
    mode: FormMode,
    error: Option<OnboardingError>,
    message: Option<String>,
}

pub struct OnboardingController {
    provider: Arc<Provider>,
    profiles: ProfileStore,
    email_domain: String,
    confirmation_redirect_delay: Duration,
    state: Arc<RwLock<FormState>>,
}

impl OnboardingController {
    pub fn new(provider: Arc<Provider>, profiles: ProfileStore, config: &OnboardingConfig) -> Self {
        Self {
            provider,
            profiles,
            email_domain: config.email_domain.clone(),
            confirmation_redirect_delay: Duration::from_millis(
                config.confirmation_redirect_delay_ms,
            ),
            state: Arc::new(RwLock::new(FormState {
                mode: FormMode::SignIn,
                error: None,
                message: None,
            })),
        }
    }

    pub async fn mode(&self) -> FormMode {
        self.state.read().await.mode
    }

    /// Currently displayed error, if any.
    pub async fn error(&self) -> Option<OnboardingError> {
        self.state.read().await.error.clone()
    }

    /// Currently displayed informational message, if any.
    pub async fn message(&self) -> Option<String> {
        self.state.read().await.message.clone()
    }

    /// Switch between sign-in and sign-up; clears any visible error or
    /// message.
    pub async fn set_mode(&self, mode: FormMode) {
        let mut state = self.state.write().await;
        state.mode = mode;
        state.error = None;
        state.message = None;
    }

    /// Run one submission to completion.
    ///
    /// Local validation runs first and rejects without any remote call.
    /// Exactly one authentication call is made per accepted submission, plus
    /// at most one profile read (sign-in) or one profile write (sign-up).
    /// Failures are terminal; resubmitting is the only retry.
    pub async fn submit(&self, form: &CredentialsForm) -> SubmitOutcome {
        {
            let mut state = self.state.write().await;
            state.error = None;
            state.message = None;
        }
        let mode = self.mode().await;

        if let Err(err) = validate_form(form, mode, &self.email_domain) {
            return self.reject(err).await;
        }

        let result = match mode {
            FormMode::SignIn => self.sign_in(form).await,
            FormMode::SignUp => self.sign_up(form).await,
        };
        match result {
            Ok(outcome) => outcome,
            Err(err) => self.reject(err).await,
        }
    }

    async fn sign_in(&self, form: &CredentialsForm) -> Result<SubmitOutcome, OnboardingError> {
        let session = self
            .provider
            .auth()
            .sign_in_with_password(&form.email, &form.password)
            .await
            .map_err(|e| authentication_error(e, OnboardingError::AuthenticationFailed))?;

        // A missing or unreadable profile degrades to session-derived data;
        // the user did authenticate.
        let profile = match self.profiles.fetch(session.user_id()).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(user_id = %session.user_id(), "profile fetch failed: {}", e);
                None
            }
        };

        let user = ApplicationUser::from_session_and_profile(&session, profile.as_ref());
        tracing::info!(user_id = %user.id, "signed in");
        Ok(SubmitOutcome::SignedIn(user))
    }

    async fn sign_up(&self, form: &CredentialsForm) -> Result<SubmitOutcome, OnboardingError> {
        let name = form.name.trim().to_string();
        let response = self
            .provider
            .auth()
            .sign_up(
                &form.email,
                &form.password,
                serde_json::json!({ "full_name": name }),
            )
            .await
            .map_err(|e| authentication_error(e, OnboardingError::RegistrationFailed))?;

        let user = response.user().clone();

        // The account exists now; a failed name write-back is not worth
        // blocking the flow over.
        if let Err(e) = self.profiles.set_full_name(user.id, &name).await {
            tracing::warn!(user_id = %user.id, "profile update after sign-up failed: {}", e);
        }

        if user.email_confirmed_at.is_some() {
            let email = user.email.clone().unwrap_or_else(|| form.email.clone());
            tracing::info!(user_id = %user.id, "account created and confirmed");
            Ok(SubmitOutcome::SignedIn(ApplicationUser {
                id: user.id,
                email,
                name,
            }))
        } else {
            tracing::info!(user_id = %user.id, "account created, confirmation pending");
            self.show_confirmation_notice().await;
            Ok(SubmitOutcome::ConfirmationRequired)
        }
    }

    /// Show the confirm-your-email notice, then flip to sign-in and clear it
    /// after the configured delay.
    async fn show_confirmation_notice(&self) {
        self.state.write().await.message = Some(CONFIRMATION_MESSAGE.to_string());

        let state = Arc::clone(&self.state);
        let delay = self.confirmation_redirect_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut state = state.write().await;
            state.mode = FormMode::SignIn;
            state.message = None;
        });
    }

    async fn reject(&self, err: OnboardingError) -> SubmitOutcome {
        self.state.write().await.error = Some(err.clone());
        SubmitOutcome::Rejected(err)
    }
}

/// Map a provider failure onto the form taxonomy: service-authored messages
/// pass through verbatim, anything else becomes the generic error.
fn authentication_error(
    err: ProviderError,
    surface: fn(String) -> OnboardingError,
) -> OnboardingError {
    match err {
        ProviderError::Api { message, .. } => surface(message),
        other => {
            tracing::error!("auth request failed: {}", other);
            OnboardingError::Unexpected
        }
    }
}

/// Local validation, in display order: domain, password, then (sign-up only)
/// the name. The first violation wins.
fn validate_form(
    form: &CredentialsForm,
    mode: FormMode,
    email_domain: &str,
) -> Result<(), OnboardingError> {
    if !form.email.ends_with(email_domain) {
        return Err(OnboardingError::WrongDomain {
            domain: email_domain.to_string(),
        });
    }
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(OnboardingError::WeakPassword);
    }
    if mode == FormMode::SignUp && form.name.trim().is_empty() {
        return Err(OnboardingError::MissingName);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOMAIN: &str = "@nmiet.edu.in";

    fn form(email: &str, password: &str, name: &str) -> CredentialsForm {
        CredentialsForm {
            email: email.to_string(),
            password: password.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_validate_rejects_foreign_domain() {
        let err = validate_form(
            &form("jane@gmail.com", "secret-pw", ""),
            FormMode::SignIn,
            DOMAIN,
        )
        .unwrap_err();
        assert_eq!(
            err,
            OnboardingError::WrongDomain {
                domain: DOMAIN.to_string()
            }
        );
        assert_eq!(err.to_string(), "Please use your @nmiet.edu.in email address");
    }

    #[test]
    fn test_validate_domain_is_case_sensitive() {
        assert!(validate_form(
            &form("jane@NMIET.EDU.IN", "secret-pw", ""),
            FormMode::SignIn,
            DOMAIN,
        )
        .is_err());
    }

    #[test]
    fn test_validate_rejects_short_password() {
        let err = validate_form(
            &form("jane@nmiet.edu.in", "12345", ""),
            FormMode::SignIn,
            DOMAIN,
        )
        .unwrap_err();
        assert_eq!(err, OnboardingError::WeakPassword);
    }

    #[test]
    fn test_validate_domain_checked_before_password() {
        let err = validate_form(&form("jane@gmail.com", "1", ""), FormMode::SignIn, DOMAIN)
            .unwrap_err();
        assert!(matches!(err, OnboardingError::WrongDomain { .. }));
    }

    #[test]
    fn test_validate_sign_up_requires_name() {
        let err = validate_form(
            &form("jane@nmiet.edu.in", "secret-pw", "   "),
            FormMode::SignUp,
            DOMAIN,
        )
        .unwrap_err();
        assert_eq!(err, OnboardingError::MissingName);

        // Sign-in never looks at the name.
        assert!(validate_form(
            &form("jane@nmiet.edu.in", "secret-pw", ""),
            FormMode::SignIn,
            DOMAIN,
        )
        .is_ok());
    }

    #[test]
    fn test_validate_accepts_six_char_password() {
        assert!(validate_form(
            &form("jane@nmiet.edu.in", "123456", "Jane"),
            FormMode::SignUp,
            DOMAIN,
        )
        .is_ok());
    }
}
