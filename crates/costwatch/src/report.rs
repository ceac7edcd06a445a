//! Day-over-day report data preparation.

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::azure::CostSource;
use crate::costs::{date_key, percent_change, Category, DailyCosts};
use crate::error::Result;
use crate::subscription::Subscription;

/// Tabular report data for one subscription, oldest day first.
#[derive(Debug, Clone, Serialize)]
pub struct ReportTable {
    /// `"Date"` followed by the category labels.
    pub headers: Vec<String>,
    /// One `MM/DD` label per day.
    pub date_labels: Vec<String>,
    /// One row per day: date label, then `$x.yz` per category.
    pub cost_rows: Vec<Vec<String>>,
    /// One row per day pair (the first day has no predecessor): date label,
    /// then a signed `x.yz%` per category.
    pub percent_rows: Vec<Vec<String>>,
}

/// Categories shown for a subscription.
///
/// Databricks only runs in `main`; its column appears there only when at
/// least one day in the window has nonzero Databricks spend.
fn relevant_categories(subscription: Subscription, days: &[DailyCosts]) -> Vec<Category> {
    let mut categories = vec![Category::VirtualMachine, Category::Storage, Category::Others];
    if subscription == Subscription::Main && days.iter().any(|day| day.databricks > 0.0) {
        categories.insert(0, Category::Databricks);
    }
    categories
}

/// Prepare report tables for one subscription over the `num_days` window
/// ending at `end_date` (inclusive).
///
/// Returns `Ok(None)` when the API has no data for the window.
pub async fn prepare(
    source: &dyn CostSource,
    subscription: Subscription,
    subscription_id: &str,
    num_days: u32,
    end_date: NaiveDate,
) -> Result<Option<ReportTable>> {
    let start_date = end_date - Duration::days(i64::from(num_days) - 1);

    let Some(daily_rows) = source.fetch_range(subscription_id, start_date, end_date).await?
    else {
        return Ok(None);
    };

    let mut date_labels = Vec::with_capacity(num_days as usize);
    let mut all_costs = Vec::with_capacity(num_days as usize);
    for offset in 0..i64::from(num_days) {
        let date = start_date + Duration::days(offset);
        date_labels.push(date.format("%m/%d").to_string());
        let costs = daily_rows
            .get(&date_key(date))
            .map(|rows| DailyCosts::aggregate(rows))
            .unwrap_or_default();
        all_costs.push(costs);
    }

    let categories = relevant_categories(subscription, &all_costs);

    let mut headers = vec!["Date".to_string()];
    headers.extend(categories.iter().map(|c| c.label().to_string()));

    let cost_rows = all_costs
        .iter()
        .enumerate()
        .map(|(i, costs)| {
            let mut row = vec![date_labels[i].clone()];
            row.extend(categories.iter().map(|&c| format!("${:.2}", costs.get(c))));
            row
        })
        .collect();

    let percent_rows = (1..all_costs.len())
        .map(|i| {
            let mut row = vec![date_labels[i].clone()];
            row.extend(categories.iter().map(|&c| {
                let change = percent_change(all_costs[i - 1].get(c), all_costs[i].get(c));
                format!("{change:+.2}%")
            }));
            row
        })
        .collect();

    Ok(Some(ReportTable {
        headers,
        date_labels,
        cost_rows,
        percent_rows,
    }))
}
