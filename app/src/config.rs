//! Configuration for the CampusConnect application.

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;

use campus_provider::ProviderConfig;

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Hosted service connection (URL + anon key).
    pub provider: ProviderConfig,
    #[serde(default)]
    pub onboarding: OnboardingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Rules for the interactive sign-in/sign-up flow.
#[derive(Debug, Clone, Deserialize)]
pub struct OnboardingConfig {
    /// Required email suffix; addresses not ending in this are rejected
    /// before any remote call.
    #[serde(default = "default_email_domain")]
    pub email_domain: String,
    /// How long the "confirm your email" notice stays up before the form
    /// flips back to sign-in.
    #[serde(default = "default_confirmation_redirect_delay_ms")]
    pub confirmation_redirect_delay_ms: u64,
}

impl Default for OnboardingConfig {
    fn default() -> Self {
        Self {
            email_domain: default_email_domain(),
            confirmation_redirect_delay_ms: default_confirmation_redirect_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_email_domain() -> String {
    "@nmiet.edu.in".to_string()
}

fn default_confirmation_redirect_delay_ms() -> u64 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration with the following precedence (highest first):
    /// 1. Environment variables (CAMPUS__SECTION__KEY format)
    /// 2. campus-connect.toml file (if present)
    /// 3. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config = ConfigLoader::builder()
            .add_source(File::with_name("campus-connect").required(false))
            .add_source(
                Environment::with_prefix("CAMPUS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_onboarding_config() {
        let onboarding = OnboardingConfig::default();
        assert_eq!(onboarding.email_domain, "@nmiet.edu.in");
        assert_eq!(onboarding.confirmation_redirect_delay_ms, 3000);
    }

    #[test]
    fn test_default_logging_config() {
        let logging = LoggingConfig::default();
        assert_eq!(logging.level, "info");
    }
}
