//! Cost monitor API entry point.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use costwatch::Settings;
use costwatch_server::server::{run_server, AppState};
use tracing::info;

/// Per-call timeout for Azure HTTP requests.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    let settings = Settings::from_env().context("loading settings")?;
    std::fs::create_dir_all(&settings.output_dir).context("creating output directory")?;

    let http = reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .context("building HTTP client")?;

    let addr = format!("{}:{}", settings.host, settings.port);
    info!(
        output_dir = %settings.output_dir.display(),
        "starting cost monitor API"
    );

    let state = AppState {
        settings: Arc::new(settings),
        http,
    };

    run_server(state, &addr).await
}
