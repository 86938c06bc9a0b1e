//! CampusConnect - onboarding and session tracking for the campus student
//! platform.
//!
//! Authentication and storage live in the hosted service consumed through
//! the `campus-provider` crate; this crate holds the business rules around
//! it: domain-restricted sign-up/sign-in, profile reconciliation, and the
//! process-wide current-user state.

pub mod config;
pub mod models;
pub mod onboarding;
pub mod profiles;
pub mod session;
pub mod test_util;

pub use config::{Config, LoggingConfig, OnboardingConfig};
pub use models::{display_name, ApplicationUser, AuthState, ProfileRecord};
pub use onboarding::{
    CredentialsForm, FormMode, OnboardingController, OnboardingError, SubmitOutcome,
};
pub use profiles::ProfileStore;
pub use session::SessionTracker;
