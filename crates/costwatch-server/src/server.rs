//! Router assembly and shared server state.

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use costwatch::{Error, Settings};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers;

/// State shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    /// Shared client for Azure AD and Cost Management calls.
    pub http: reqwest::Client,
}

/// Error wrapper mapping core errors onto HTTP responses.
///
/// `InvalidInput` is the caller's fault; everything else surfaces as a 500
/// with the error string in the body.
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

/// Build the HTTP router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/api/health", get(health_handler))
        .route("/api/anomaly/detect", post(handlers::anomaly::detect))
        .route("/api/anomaly/history", get(handlers::anomaly::history))
        .route("/api/cost-report/generate", post(handlers::report::generate))
        .route(
            "/api/cost-report/download/{filename}",
            get(handlers::report::download),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the HTTP server.
///
/// # Errors
///
/// Returns an error if the listener fails to bind or the server exits
/// abnormally.
pub async fn run_server(state: AppState, addr: &str) -> anyhow::Result<()> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr, "cost monitor API listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check response.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
    version: &'static str,
}

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn root_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Azure Cost Monitor API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
