//! Per-deployment settings used when rendering outbound email.

use crate::error::CoreError;

/// Environment variable naming the active deployment.
pub const ENVIRONMENT_VAR: &str = "DINNER_DONE_BETTER_SERVICE_ENVIRONMENT";

/// Branding and link targets for a deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentConfig {
    pub name: &'static str,
    /// Root of the web frontend; links in emails are built from it.
    pub base_url: &'static str,
    pub outbound_emails_from_address: &'static str,
    pub outbound_emails_from_name: &'static str,
    pub company_name: &'static str,
    pub logo_url: &'static str,
}

const LOCALDEV: EnvironmentConfig = EnvironmentConfig {
    name: "localdev",
    base_url: "http://localhost:9000",
    outbound_emails_from_address: "noreply@localhost",
    outbound_emails_from_name: "Dinner Done Better (local)",
    company_name: "Dinner Done Better",
    logo_url: "http://localhost:9000/logo.png",
};

const TESTING: EnvironmentConfig = EnvironmentConfig {
    name: "testing",
    base_url: "https://www.dinnerdonebetter.dev",
    outbound_emails_from_address: "noreply@dinnerdonebetter.dev",
    outbound_emails_from_name: "Dinner Done Better (testing)",
    company_name: "Dinner Done Better",
    logo_url: "https://media.dinnerdonebetter.dev/logo.png",
};

const PRODUCTION: EnvironmentConfig = EnvironmentConfig {
    name: "production",
    base_url: "https://www.dinnerdonebetter.com",
    outbound_emails_from_address: "noreply@dinnerdonebetter.com",
    outbound_emails_from_name: "Dinner Done Better",
    company_name: "Dinner Done Better",
    logo_url: "https://media.dinnerdonebetter.com/logo.png",
};

impl EnvironmentConfig {
    /// Look up the configuration for a named environment.
    ///
    /// Accepts `localdev`, `dev`/`testing`, and `prod`/`production`.
    pub fn for_environment(name: &str) -> Option<&'static EnvironmentConfig> {
        match name.trim().to_ascii_lowercase().as_str() {
            "localdev" | "local" => Some(&LOCALDEV),
            "dev" | "testing" => Some(&TESTING),
            "prod" | "production" => Some(&PRODUCTION),
            _ => None,
        }
    }

    /// Like [`for_environment`](Self::for_environment) but as a `Result`.
    pub fn require(name: &str) -> Result<&'static EnvironmentConfig, CoreError> {
        Self::for_environment(name).ok_or_else(|| CoreError::UnknownEnvironment(name.to_string()))
    }
}
