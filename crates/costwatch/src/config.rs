//! Service configuration from environment variables.

use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::subscription::Subscription;

/// Default Azure AD login endpoint.
const DEFAULT_LOGIN_BASE: &str = "https://login.microsoftonline.com";

/// Default Azure Resource Manager endpoint.
const DEFAULT_MANAGEMENT_BASE: &str = "https://management.azure.com";

/// Application settings.
///
/// Azure credentials and the four subscription ids are required; everything
/// else has a sensible default. The login and management base URLs are
/// overridable so tests can point the clients at a local mock server.
#[derive(Debug, Clone)]
pub struct Settings {
    // Azure AD service principal
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,

    // Subscription ids, one per environment
    pub subscription_main: String,
    pub subscription_prod: String,
    pub subscription_dev: String,
    pub subscription_test: String,

    // HTTP server
    pub host: String,
    pub port: u16,

    // Where rendered reports land
    pub output_dir: PathBuf,

    // Azure endpoints
    pub login_base: String,
    pub management_base: String,
}

impl Settings {
    /// Load settings from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when a required variable is missing or a
    /// numeric variable fails to parse.
    pub fn from_env() -> Result<Self> {
        let port = match std::env::var("API_PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| Error::Config(format!("API_PORT is not a valid port: {raw}")))?,
            Err(_) => 8000,
        };

        Ok(Self {
            tenant_id: required("AZURE_TENANT_ID")?,
            client_id: required("AZURE_CLIENT_ID")?,
            client_secret: required("AZURE_CLIENT_SECRET")?,

            subscription_main: required("SUBSCRIPTION_MAIN")?,
            subscription_prod: required("SUBSCRIPTION_PROD")?,
            subscription_dev: required("SUBSCRIPTION_DEV")?,
            subscription_test: required("SUBSCRIPTION_TEST")?,

            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port,

            output_dir: std::env::var("OUTPUT_DIRECTORY")
                .unwrap_or_else(|_| "outputs".to_string())
                .into(),

            login_base: std::env::var("AZURE_LOGIN_URL")
                .unwrap_or_else(|_| DEFAULT_LOGIN_BASE.to_string()),
            management_base: std::env::var("AZURE_MANAGEMENT_URL")
                .unwrap_or_else(|_| DEFAULT_MANAGEMENT_BASE.to_string()),
        })
    }

    /// The configured subscription id for an environment.
    #[must_use]
    pub fn subscription_id(&self, subscription: Subscription) -> &str {
        match subscription {
            Subscription::Main => &self.subscription_main,
            Subscription::Prod => &self.subscription_prod,
            Subscription::Dev => &self.subscription_dev,
            Subscription::Test => &self.subscription_test,
        }
    }
}

fn required(name: &str) -> Result<String> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| Error::Config(format!("{name} is not set")))
}
