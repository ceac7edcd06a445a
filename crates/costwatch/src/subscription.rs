//! The fixed set of monitored subscriptions.

use std::fmt;

use crate::error::{Error, Result};

/// One of the four monitored Azure subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subscription {
    Main,
    Prod,
    Dev,
    Test,
}

impl Subscription {
    /// Iteration order for anomaly checks and for report document sections.
    pub const CHECK_ORDER: [Subscription; 4] = [
        Subscription::Prod,
        Subscription::Dev,
        Subscription::Test,
        Subscription::Main,
    ];

    /// Iteration order for report data gathering.
    pub const REPORT_ORDER: [Subscription; 4] = [
        Subscription::Main,
        Subscription::Prod,
        Subscription::Dev,
        Subscription::Test,
    ];

    /// Short lowercase name used in configuration and API payloads.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Subscription::Main => "main",
            Subscription::Prod => "prod",
            Subscription::Dev => "dev",
            Subscription::Test => "test",
        }
    }

    /// Parse a subscription name, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for anything outside the fixed set.
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "main" => Ok(Subscription::Main),
            "prod" => Ok(Subscription::Prod),
            "dev" => Ok(Subscription::Dev),
            "test" => Ok(Subscription::Test),
            other => Err(Error::InvalidInput(format!(
                "unknown subscription: {other}"
            ))),
        }
    }
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
