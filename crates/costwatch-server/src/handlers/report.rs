//! Cost report generation and download endpoints.

use std::collections::HashMap;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use costwatch::report::{self, ReportTable};
use costwatch::{Error, Subscription};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{cost_client, yesterday};
use crate::document;
use crate::server::{ApiError, AppState};

/// Pause between subscription queries so four back-to-back report fetches do
/// not trip the Cost Management rate limit.
const PACING_DELAY: Duration = Duration::from_secs(2);

/// Body for `POST /api/cost-report/generate`.
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    /// Days to look back, 1 to 90.
    pub num_days: u32,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub status: &'static str,
    pub message: String,
    pub filename: String,
    pub download_url: String,
}

/// Gather report data for every subscription and render the document.
///
/// Subscriptions are fetched sequentially with a pacing delay between them.
/// A failing subscription is logged and skipped; its section is simply
/// missing from the document.
pub async fn generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    if !(1..=90).contains(&request.num_days) {
        return Err(Error::InvalidInput(format!(
            "num_days must be between 1 and 90, got {}",
            request.num_days
        ))
        .into());
    }

    let client = cost_client(&state).await?;
    let end_date = yesterday();

    let mut tables: HashMap<Subscription, ReportTable> = HashMap::new();
    for (idx, subscription) in Subscription::REPORT_ORDER.into_iter().enumerate() {
        let id = state.settings.subscription_id(subscription);
        match report::prepare(&client, subscription, id, request.num_days, end_date).await {
            Ok(Some(table)) => {
                tables.insert(subscription, table);
            }
            Ok(None) => {
                info!(subscription = %subscription, "no cost data for report window");
            }
            Err(e) => {
                warn!(subscription = %subscription, error = %e, "report data fetch failed, skipping");
            }
        }

        if idx + 1 < Subscription::REPORT_ORDER.len() {
            tokio::time::sleep(PACING_DELAY).await;
        }
    }

    let filename =
        document::render(&state.settings.output_dir, &tables, request.num_days, end_date)?;
    info!(filename, "cost report generated");

    Ok(Json(GenerateResponse {
        status: "success",
        message: format!(
            "Cost report generated successfully for {} days",
            request.num_days
        ),
        download_url: format!("/api/cost-report/download/{filename}"),
        filename,
    }))
}

/// Serve a previously generated report.
pub async fn download(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    // The output directory is flat; anything path-like is hostile.
    if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
        return Err(Error::InvalidInput("invalid filename".to_string()).into());
    }

    let path = state.settings.output_dir.join(&filename);
    if !path.is_file() {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "file not found" })),
        )
            .into_response());
    }

    let contents = tokio::fs::read(&path).await.map_err(Error::from)?;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        contents,
    )
        .into_response())
}
