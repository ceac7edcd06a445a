//! Anomaly detection endpoints.

use axum::extract::{Query, State};
use axum::Json;
use chrono::Duration;
use costwatch::anomaly::{self, DetectionSummary, DEFAULT_THRESHOLD};
use costwatch::{Error, Subscription};
use serde::{Deserialize, Serialize};

use super::{cost_client, parse_date, yesterday};
use crate::server::{ApiError, AppState};

/// Body for `POST /api/anomaly/detect`.
#[derive(Debug, Deserialize)]
pub struct DetectRequest {
    /// Target date, `YYYY-MM-DD`. Defaults to yesterday.
    pub target_date: Option<String>,
    #[serde(default = "default_threshold")]
    pub threshold_percent: f64,
    /// Optional subset of subscription names to check.
    pub subscriptions: Option<Vec<String>>,
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

fn validate_threshold(threshold: f64) -> Result<(), Error> {
    if (0.0..=100.0).contains(&threshold) {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "threshold_percent must be between 0 and 100, got {threshold}"
        )))
    }
}

/// Check subscriptions for cost anomalies on one target date.
pub async fn detect(
    State(state): State<AppState>,
    Json(request): Json<DetectRequest>,
) -> Result<Json<DetectionSummary>, ApiError> {
    validate_threshold(request.threshold_percent)?;

    let target_date = match &request.target_date {
        Some(raw) => parse_date(raw)?,
        None => yesterday(),
    };

    let filter = request
        .subscriptions
        .map(|names| {
            names
                .iter()
                .map(|name| Subscription::parse(name))
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?;

    let client = cost_client(&state).await?;
    let summary = anomaly::check_all(
        &client,
        &state.settings,
        target_date,
        request.threshold_percent,
        filter.as_deref(),
    )
    .await;

    Ok(Json(summary))
}

/// Query parameters for `GET /api/anomaly/history`.
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    #[serde(default = "default_days")]
    pub days: u32,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_days() -> u32 {
    7
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub history: Vec<DetectionSummary>,
}

/// Run the cross-subscription check for each of the last `days` days,
/// oldest first.
pub async fn history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, ApiError> {
    if !(1..=90).contains(&params.days) {
        return Err(Error::InvalidInput(format!(
            "days must be between 1 and 90, got {}",
            params.days
        ))
        .into());
    }
    validate_threshold(params.threshold)?;

    let client = cost_client(&state).await?;
    let newest = yesterday();

    let mut history = Vec::with_capacity(params.days as usize);
    for offset in (0..i64::from(params.days)).rev() {
        let target_date = newest - Duration::days(offset);
        let summary = anomaly::check_all(
            &client,
            &state.settings,
            target_date,
            params.threshold,
            None,
        )
        .await;
        history.push(summary);
    }

    Ok(Json(HistoryResponse { history }))
}
