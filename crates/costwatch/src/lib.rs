//! Azure cost monitoring core.
//!
//! Fetches daily spend from the Azure Cost Management API for a fixed set of
//! subscriptions, buckets it into a small set of resource categories, and
//! compares recent spend against a 7-day trailing baseline. The HTTP surface
//! lives in the `costwatch-server` crate; this crate owns the data model and
//! the three transforms (fetch, bucket, compare).

pub mod anomaly;
pub mod azure;
pub mod config;
pub mod costs;
pub mod error;
pub mod report;
pub mod subscription;

pub use config::Settings;
pub use error::{Error, Result};
pub use subscription::Subscription;
