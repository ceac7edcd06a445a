//! Cost Management query client.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{AccessToken, CostSource, DailyRows};
use crate::costs::CostRow;
use crate::error::{Error, Result};

/// Cost Management API version.
const API_VERSION: &str = "2023-03-01";

/// Retry budget for rate-limited queries.
const MAX_RETRIES: u32 = 3;

/// Client for the Azure Cost Management query endpoint.
pub struct CostClient {
    http: reqwest::Client,
    token: AccessToken,
    management_base: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    properties: QueryProperties,
}

#[derive(Debug, Deserialize)]
struct QueryProperties {
    #[serde(default)]
    columns: Vec<QueryColumn>,
    #[serde(default)]
    rows: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct QueryColumn {
    name: String,
}

impl CostClient {
    #[must_use]
    pub fn new(http: reqwest::Client, token: AccessToken, management_base: impl Into<String>) -> Self {
        Self {
            http,
            token,
            management_base: management_base.into(),
        }
    }

    fn query_url(&self, subscription_id: &str) -> String {
        format!(
            "{}/subscriptions/{}/providers/Microsoft.CostManagement/query?api-version={}",
            self.management_base, subscription_id, API_VERSION
        )
    }

    /// Daily cost-by-resource-type query body for an inclusive date range.
    fn query_body(start: NaiveDate, end: NaiveDate) -> serde_json::Value {
        serde_json::json!({
            "type": "Usage",
            "timeframe": "Custom",
            "timePeriod": {
                "from": format!("{}T00:00:00Z", start.format("%Y-%m-%d")),
                "to": format!("{}T23:59:59Z", end.format("%Y-%m-%d")),
            },
            "dataset": {
                "granularity": "Daily",
                "aggregation": {
                    "totalCost": { "name": "Cost", "function": "Sum" }
                },
                "grouping": [
                    { "type": "Dimension", "name": "ResourceType" }
                ]
            }
        })
    }

    /// Seconds to wait before the next attempt after a 429.
    ///
    /// Honors `Retry-After` when the server sends one, otherwise backs off
    /// `2^attempt` seconds.
    fn retry_delay(response: &reqwest::Response, attempt: u32) -> u64 {
        response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(1 << attempt)
    }

    fn parse_response(properties: QueryProperties) -> Option<DailyRows> {
        if properties.rows.is_empty() {
            return None;
        }

        // Column positions vary; fall back to the documented layout.
        let position = |name: &str, default: usize| {
            properties
                .columns
                .iter()
                .position(|c| c.name == name)
                .unwrap_or(default)
        };
        let cost_idx = position("Cost", 0);
        let date_idx = position("UsageDate", 1);
        let type_idx = position("ResourceType", 2);

        let mut daily = DailyRows::new();
        for row in &properties.rows {
            let Some(date) = row.get(date_idx).and_then(|v| v.as_u64()) else {
                continue;
            };
            let cost = row.get(cost_idx).and_then(|v| v.as_f64()).unwrap_or(0.0);
            let resource_type = row
                .get(type_idx)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();

            daily.entry(date as u32).or_default().push(CostRow {
                cost,
                resource_type,
                date: date as u32,
            });
        }

        Some(daily)
    }
}

#[async_trait]
impl CostSource for CostClient {
    async fn fetch_range(
        &self,
        subscription_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<DailyRows>> {
        let url = self.query_url(subscription_id);
        let body = Self::query_body(start, end);

        // Bounded retry loop; recursion here would grow the stack under
        // sustained rate limiting.
        let mut attempt = 0;
        loop {
            let response = self
                .http
                .post(&url)
                .bearer_auth(self.token.secret())
                .json(&body)
                .send()
                .await?;

            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                if attempt >= MAX_RETRIES {
                    return Err(Error::RateLimitExhausted { retries: MAX_RETRIES });
                }
                let delay = Self::retry_delay(&response, attempt);
                warn!(delay_secs = delay, attempt, "rate limited by cost API, backing off");
                tokio::time::sleep(Duration::from_secs(delay)).await;
                attempt += 1;
                continue;
            }

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(Error::Transport {
                    status: status.as_u16(),
                    body,
                });
            }

            let parsed: QueryResponse = response.json().await?;
            let daily = Self::parse_response(parsed.properties);
            debug!(
                subscription_id,
                days = daily.as_ref().map_or(0, |d| d.len()),
                "fetched cost data range"
            );
            return Ok(daily);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_response_buckets_rows_by_date() {
        let properties = QueryProperties {
            columns: vec![
                QueryColumn { name: "Cost".into() },
                QueryColumn { name: "UsageDate".into() },
                QueryColumn { name: "ResourceType".into() },
                QueryColumn { name: "Currency".into() },
            ],
            rows: vec![
                vec![
                    serde_json::json!(12.5),
                    serde_json::json!(20250101),
                    serde_json::json!("microsoft.compute/virtualmachines"),
                    serde_json::json!("USD"),
                ],
                vec![
                    serde_json::json!(3.0),
                    serde_json::json!(20250101),
                    serde_json::json!("microsoft.storage/storageaccounts"),
                    serde_json::json!("USD"),
                ],
                vec![
                    serde_json::json!(7.0),
                    serde_json::json!(20250102),
                    serde_json::json!("microsoft.network/loadbalancers"),
                    serde_json::json!("USD"),
                ],
            ],
        };

        let daily = CostClient::parse_response(properties).unwrap();
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[&20250101].len(), 2);
        assert_eq!(daily[&20250102][0].cost, 7.0);
        assert_eq!(
            daily[&20250101][0].resource_type,
            "microsoft.compute/virtualmachines"
        );
    }

    #[test]
    fn parse_response_with_no_rows_is_absent() {
        let properties = QueryProperties {
            columns: vec![],
            rows: vec![],
        };
        assert!(CostClient::parse_response(properties).is_none());
    }

    #[test]
    fn parse_response_handles_reordered_columns() {
        let properties = QueryProperties {
            columns: vec![
                QueryColumn { name: "UsageDate".into() },
                QueryColumn { name: "ResourceType".into() },
                QueryColumn { name: "Cost".into() },
            ],
            rows: vec![vec![
                serde_json::json!(20250103),
                serde_json::json!("microsoft.compute/virtualmachines"),
                serde_json::json!(42.0),
            ]],
        };

        let daily = CostClient::parse_response(properties).unwrap();
        assert_eq!(daily[&20250103][0].cost, 42.0);
    }
}
