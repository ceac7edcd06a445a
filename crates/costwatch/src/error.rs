//! Error types for cost retrieval and processing.

use thiserror::Error;

/// Errors that can occur while fetching or processing cost data.
#[derive(Debug, Error)]
pub enum Error {
    /// Azure AD token acquisition failed. Fatal for the enclosing request.
    #[error("Azure AD authentication failed: {0}")]
    Auth(String),

    /// The Cost Management API returned a non-success, non-429 status.
    #[error("cost API returned {status}: {body}")]
    Transport { status: u16, body: String },

    /// Rate limited and the retry budget is spent.
    #[error("rate limited, gave up after {retries} retries")]
    RateLimitExhausted { retries: u32 },

    /// HTTP request failed below the status-code level.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Malformed client input (date string, out-of-range field).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Missing or malformed configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem error while writing or serving a report.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Report template failed to render.
    #[error("template error: {0}")]
    Template(String),
}

pub type Result<T> = std::result::Result<T, Error>;
