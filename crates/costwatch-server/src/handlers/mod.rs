//! Request handlers.

pub mod anomaly;
pub mod report;

use chrono::{Duration, NaiveDate, Utc};
use costwatch::azure::{acquire_token, CostClient};
use costwatch::{Error, Result};

use crate::server::AppState;

/// Yesterday in UTC, the default target for detection and the report window
/// end. Billing data for the current day is still incomplete.
pub(crate) fn yesterday() -> NaiveDate {
    Utc::now().date_naive() - Duration::days(1)
}

/// Parse a `YYYY-MM-DD` date from a request field.
pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| Error::InvalidInput(format!("invalid date format: {raw}")))
}

/// Acquire a fresh token and build a cost client for one request flow.
pub(crate) async fn cost_client(state: &AppState) -> Result<CostClient> {
    let token = acquire_token(&state.http, &state.settings).await?;
    Ok(CostClient::new(
        state.http.clone(),
        token,
        state.settings.management_base.clone(),
    ))
}
