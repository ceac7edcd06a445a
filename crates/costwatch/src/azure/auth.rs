//! Azure AD client-credentials authentication.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::config::Settings;
use crate::error::{Error, Result};

/// Resource the token is scoped to.
const MANAGEMENT_RESOURCE: &str = "https://management.azure.com/";

/// Token lifetime assumed when the endpoint does not say.
const DEFAULT_EXPIRY_SECS: i64 = 3600;

/// A bearer token with an explicit validity window.
///
/// Acquired once at the start of a request flow and passed down to the cost
/// client; nothing caches it beyond that scope.
#[derive(Debug, Clone)]
pub struct AccessToken {
    secret: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    #[must_use]
    pub fn new(secret: String, expires_in_secs: i64) -> Self {
        Self {
            secret,
            expires_at: Utc::now() + Duration::seconds(expires_in_secs),
        }
    }

    /// The raw bearer secret.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Whether the validity window has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    /// The classic oauth2 endpoint returns this as a string of seconds.
    #[serde(default)]
    expires_in: Option<serde_json::Value>,
}

impl TokenResponse {
    fn expires_in_secs(&self) -> i64 {
        match &self.expires_in {
            Some(serde_json::Value::String(raw)) => raw.parse().unwrap_or(DEFAULT_EXPIRY_SECS),
            Some(serde_json::Value::Number(n)) => n.as_i64().unwrap_or(DEFAULT_EXPIRY_SECS),
            _ => DEFAULT_EXPIRY_SECS,
        }
    }
}

/// Acquire a management-scoped bearer token via the client-credentials grant.
///
/// # Errors
///
/// Any failure here is `Error::Auth`: token acquisition failing aborts the
/// whole request.
pub async fn acquire_token(http: &reqwest::Client, settings: &Settings) -> Result<AccessToken> {
    let url = format!("{}/{}/oauth2/token", settings.login_base, settings.tenant_id);

    let form = [
        ("grant_type", "client_credentials"),
        ("client_id", settings.client_id.as_str()),
        ("client_secret", settings.client_secret.as_str()),
        ("resource", MANAGEMENT_RESOURCE),
    ];

    let response = http
        .post(&url)
        .form(&form)
        .send()
        .await
        .map_err(|e| Error::Auth(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Auth(format!("token endpoint returned {status}: {body}")));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| Error::Auth(format!("malformed token response: {e}")))?;

    debug!("acquired Azure AD access token");
    let expires_in_secs = token.expires_in_secs();
    Ok(AccessToken::new(token.access_token, expires_in_secs))
}
