//! Anomaly detection against a 7-day trailing baseline.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use tracing::{info, warn};

use crate::azure::CostSource;
use crate::config::Settings;
use crate::costs::{date_key, percent_change, round2, Category, DailyCosts};
use crate::error::Result;
use crate::subscription::Subscription;

/// Default anomaly threshold, in percent.
pub const DEFAULT_THRESHOLD: f64 = 25.0;

/// Days in the trailing baseline.
const BASELINE_DAYS: i64 = 7;

/// Per-category comparison against the baseline average.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryCheck {
    pub category: Category,
    pub average_cost: f64,
    pub current_cost: f64,
    pub percent_change: f64,
    pub is_anomaly: bool,
}

/// A flagged category, as surfaced in the `anomalies` list.
#[derive(Debug, Clone, Serialize)]
pub struct AnomalyEntry {
    pub category: Category,
    pub average_cost: f64,
    pub current_cost: f64,
    pub percent_change: f64,
}

/// Anomaly results for one subscription.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionReport {
    pub subscription: String,
    pub target_date: String,
    pub start_date: String,
    pub end_date: String,
    pub threshold: f64,
    pub results: Vec<CategoryCheck>,
    pub anomalies: Vec<AnomalyEntry>,
    pub has_anomalies: bool,
}

/// Cross-subscription roll-up counts.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryCounts {
    pub total_subscriptions: usize,
    pub subscriptions_with_anomalies: usize,
    pub anomaly_detected: bool,
}

/// Result of checking every subscription for one target date.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionSummary {
    pub target_date: String,
    pub threshold: f64,
    pub subscriptions: BTreeMap<String, SubscriptionReport>,
    /// Subscriptions whose fetch failed, with the error message. A failing
    /// subscription no longer aborts the whole batch.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub failures: BTreeMap<String, String>,
    pub summary: SummaryCounts,
}

/// Detect cost anomalies for one subscription on `target_date`.
///
/// Fetches an 8-day window (7 baseline days plus the target day) in a single
/// call, averages each category over the baseline days, and flags categories
/// whose change over the average strictly exceeds the threshold. Returns
/// `Ok(None)` when the API has no data for the window.
///
/// The baseline mean always divides by 7; days without rows count as zero.
pub async fn detect(
    source: &dyn CostSource,
    subscription: Subscription,
    subscription_id: &str,
    target_date: NaiveDate,
    threshold: f64,
) -> Result<Option<SubscriptionReport>> {
    let start_date = target_date - Duration::days(BASELINE_DAYS);

    let Some(daily_rows) = source.fetch_range(subscription_id, start_date, target_date).await?
    else {
        return Ok(None);
    };

    // One cost vector per day, oldest first; index 7 is the target day.
    let window: Vec<DailyCosts> = (0..=BASELINE_DAYS)
        .map(|offset| {
            let key = date_key(start_date + Duration::days(offset));
            daily_rows
                .get(&key)
                .map(|rows| DailyCosts::aggregate(rows))
                .unwrap_or_default()
        })
        .collect();
    let (baseline, target) = window.split_at(BASELINE_DAYS as usize);
    let target = target[0];

    let mut results = Vec::with_capacity(Category::ALL.len());
    let mut anomalies = Vec::new();

    for category in Category::ALL {
        let average: f64 =
            baseline.iter().map(|day| day.get(category)).sum::<f64>() / BASELINE_DAYS as f64;
        let current = target.get(category);
        let change = percent_change(average, current);
        // Strict comparison on the unrounded value: exactly at the threshold
        // is not an anomaly.
        let is_anomaly = change > threshold;

        results.push(CategoryCheck {
            category,
            average_cost: round2(average),
            current_cost: round2(current),
            percent_change: round2(change),
            is_anomaly,
        });

        if is_anomaly {
            anomalies.push(AnomalyEntry {
                category,
                average_cost: round2(average),
                current_cost: round2(current),
                percent_change: round2(change),
            });
        }
    }

    let has_anomalies = !anomalies.is_empty();
    if has_anomalies {
        info!(
            subscription = %subscription,
            target_date = %target_date,
            flagged = anomalies.len(),
            "cost anomalies detected"
        );
    }

    Ok(Some(SubscriptionReport {
        subscription: subscription.name().to_string(),
        target_date: target_date.format("%Y-%m-%d").to_string(),
        start_date: start_date.format("%Y-%m-%d").to_string(),
        end_date: target_date.format("%Y-%m-%d").to_string(),
        threshold,
        results,
        anomalies,
        has_anomalies,
    }))
}

/// Check every subscription (optionally narrowed by `filter`) for anomalies.
///
/// Subscriptions are checked sequentially in the fixed order
/// `[prod, dev, test, main]`. A subscription whose fetch fails is recorded in
/// `failures` and skipped rather than aborting the batch; one bad
/// subscription must not blank out the other three.
pub async fn check_all(
    source: &dyn CostSource,
    settings: &Settings,
    target_date: NaiveDate,
    threshold: f64,
    filter: Option<&[Subscription]>,
) -> DetectionSummary {
    let mut subscriptions = BTreeMap::new();
    let mut failures = BTreeMap::new();

    for subscription in Subscription::CHECK_ORDER {
        if let Some(filter) = filter {
            if !filter.contains(&subscription) {
                continue;
            }
        }

        let id = settings.subscription_id(subscription);
        match detect(source, subscription, id, target_date, threshold).await {
            Ok(Some(report)) => {
                subscriptions.insert(subscription.name().to_string(), report);
            }
            Ok(None) => {
                info!(subscription = %subscription, "no cost data for window, skipping");
            }
            Err(e) => {
                warn!(subscription = %subscription, error = %e, "anomaly check failed");
                failures.insert(subscription.name().to_string(), e.to_string());
            }
        }
    }

    let subscriptions_with_anomalies = subscriptions
        .values()
        .filter(|report| report.has_anomalies)
        .count();

    DetectionSummary {
        target_date: target_date.format("%Y-%m-%d").to_string(),
        threshold,
        summary: SummaryCounts {
            total_subscriptions: subscriptions.len(),
            subscriptions_with_anomalies,
            anomaly_detected: subscriptions_with_anomalies > 0,
        },
        subscriptions,
        failures,
    }
}
