//! Azure AD authentication and the Cost Management client.

mod auth;
mod client;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;

pub use auth::{acquire_token, AccessToken};
pub use client::CostClient;

use crate::costs::CostRow;
use crate::error::Result;

/// Raw billing rows bucketed by integer date key (`YYYYMMDD`).
pub type DailyRows = BTreeMap<u32, Vec<CostRow>>;

/// Source of raw billing rows for a subscription and date range.
///
/// Implemented by [`CostClient`] against the real Cost Management API; tests
/// substitute an in-memory fake so the detector and report preparer run
/// without the network.
#[async_trait]
pub trait CostSource: Sync {
    /// Fetch rows for the inclusive date range, keyed by day.
    ///
    /// `Ok(None)` means the API answered but had no rows for the range;
    /// callers treat that as "no result for this subscription".
    async fn fetch_range(
        &self,
        subscription_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<DailyRows>>;
}
