//! HTTP API tests against a server bound to a random local port.
//!
//! Validation paths run without any Azure backend; the end-to-end detection
//! test points the Azure endpoints at a wiremock server.

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{Duration, Utc};
use costwatch::costs::date_key;
use costwatch::Settings;
use costwatch_server::server::{build_router, AppState};
use tokio::net::TcpListener;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(azure_base: &str) -> Settings {
    Settings {
        tenant_id: "tenant-1".into(),
        client_id: "client-1".into(),
        client_secret: "secret-1".into(),
        subscription_main: "sub-main".into(),
        subscription_prod: "sub-prod".into(),
        subscription_dev: "sub-dev".into(),
        subscription_test: "sub-test".into(),
        host: "127.0.0.1".into(),
        port: 0,
        output_dir: std::env::temp_dir().join("costwatch-http-tests"),
        login_base: azure_base.to_string(),
        management_base: azure_base.to_string(),
    }
}

async fn start_server(settings: Settings) -> SocketAddr {
    let state = AppState {
        settings: Arc::new(settings),
        http: reqwest::Client::new(),
    };
    let app = build_router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Server with Azure endpoints pointing nowhere; fine for validation paths
/// that reject the request before any outbound call.
async fn start_offline_server() -> SocketAddr {
    start_server(settings("http://127.0.0.1:9")).await
}

#[tokio::test]
async fn health_reports_version() {
    let addr = start_offline_server().await;

    let body: serde_json::Value = reqwest::get(format!("http://{addr}/api/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn detect_rejects_malformed_date() {
    let addr = start_offline_server().await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/api/anomaly/detect"))
        .json(&serde_json::json!({ "target_date": "15-06-2025" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("invalid date"));
}

#[tokio::test]
async fn detect_rejects_out_of_range_threshold() {
    let addr = start_offline_server().await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/api/anomaly/detect"))
        .json(&serde_json::json!({ "threshold_percent": 150.0 }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn detect_rejects_unknown_subscription() {
    let addr = start_offline_server().await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/api/anomaly/detect"))
        .json(&serde_json::json!({ "subscriptions": ["prod", "staging"] }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn history_rejects_out_of_range_days() {
    let addr = start_offline_server().await;
    let client = reqwest::Client::new();

    for days in ["0", "91"] {
        let response = client
            .get(format!("http://{addr}/api/anomaly/history?days={days}"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400, "days={days}");
    }
}

#[tokio::test]
async fn generate_rejects_out_of_range_num_days() {
    let addr = start_offline_server().await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/api/cost-report/generate"))
        .json(&serde_json::json!({ "num_days": 0 }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn download_missing_file_is_404() {
    let addr = start_offline_server().await;

    let response = reqwest::get(format!(
        "http://{addr}/api/cost-report/download/does-not-exist.html"
    ))
    .await
    .unwrap();

    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn download_rejects_path_traversal() {
    let addr = start_offline_server().await;

    // %2E%2E decodes to ".." inside the path segment.
    let response = reqwest::get(format!(
        "http://{addr}/api/cost-report/download/%2E%2E%2Fsecrets"
    ))
    .await
    .unwrap();

    assert_eq!(response.status(), 400);
}

fn week_of_rows(baseline: f64, target: f64) -> serde_json::Value {
    // Window 2025-06-08..2025-06-15, target on the 15th, VM spend only.
    let mut rows = Vec::new();
    for day in 8..=14 {
        rows.push(serde_json::json!([
            baseline,
            20250600 + day,
            "microsoft.compute/virtualmachines",
            "USD"
        ]));
    }
    rows.push(serde_json::json!([
        target,
        20250615,
        "microsoft.compute/virtualmachines",
        "USD"
    ]));
    serde_json::json!(rows)
}

#[tokio::test]
async fn detect_end_to_end_flags_a_spend_jump() {
    let azure = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/tenant-1/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "tok",
            "expires_in": "3600"
        })))
        .mount(&azure)
        .await;

    // Every subscription sees the same 30% jump.
    Mock::given(method("POST"))
        .and(path(
            "/subscriptions/sub-prod/providers/Microsoft.CostManagement/query",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "properties": {
                "columns": [
                    { "name": "Cost" }, { "name": "UsageDate" },
                    { "name": "ResourceType" }, { "name": "Currency" }
                ],
                "rows": week_of_rows(100.0, 130.0)
            }
        })))
        .expect(1)
        .mount(&azure)
        .await;

    let addr = start_server(settings(&azure.uri())).await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/api/anomaly/detect"))
        .json(&serde_json::json!({
            "target_date": "2025-06-15",
            "threshold_percent": 25.0,
            "subscriptions": ["prod"]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["target_date"], "2025-06-15");
    assert_eq!(body["summary"]["total_subscriptions"], 1);
    assert_eq!(body["summary"]["subscriptions_with_anomalies"], 1);
    assert_eq!(body["summary"]["anomaly_detected"], true);

    let prod = &body["subscriptions"]["prod"];
    assert_eq!(prod["has_anomalies"], true);
    assert_eq!(prod["start_date"], "2025-06-08");
    assert_eq!(prod["results"].as_array().unwrap().len(), 5);

    let vm = prod["results"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["category"] == "Virtual Machine")
        .unwrap();
    assert_eq!(vm["average_cost"], 100.0);
    assert_eq!(vm["current_cost"], 130.0);
    assert_eq!(vm["percent_change"], 30.0);
    assert_eq!(vm["is_anomaly"], true);
}

fn query_response(rows: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "properties": {
            "columns": [
                { "name": "Cost" }, { "name": "UsageDate" },
                { "name": "ResourceType" }, { "name": "Currency" }
            ],
            "rows": rows
        }
    })
}

async fn mount_token(azure: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/tenant-1/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "tok",
            "expires_in": "3600"
        })))
        .mount(azure)
        .await;
}

fn query_path(subscription_id: &str) -> String {
    format!("/subscriptions/{subscription_id}/providers/Microsoft.CostManagement/query")
}

#[tokio::test]
async fn generate_renders_document_and_skips_failing_subscription() {
    let azure = MockServer::start().await;
    mount_token(&azure).await;

    // Report window for num_days=2 ends yesterday; match the real clock.
    let yesterday = Utc::now().date_naive() - Duration::days(1);
    let vm_rows = serde_json::json!([
        [100.0, date_key(yesterday - Duration::days(1)), "microsoft.compute/virtualmachines", "USD"],
        [130.0, date_key(yesterday), "microsoft.compute/virtualmachines", "USD"]
    ]);

    for subscription_id in ["sub-main", "sub-prod"] {
        Mock::given(method("POST"))
            .and(path(query_path(subscription_id)))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(query_response(vm_rows.clone())),
            )
            .expect(1)
            .mount(&azure)
            .await;
    }
    // dev fails outright, test answers with no rows; neither may abort the
    // batch or appear in the document.
    Mock::given(method("POST"))
        .and(path(query_path("sub-dev")))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&azure)
        .await;
    Mock::given(method("POST"))
        .and(path(query_path("sub-test")))
        .respond_with(ResponseTemplate::new(200).set_body_json(query_response(serde_json::json!([]))))
        .expect(1)
        .mount(&azure)
        .await;

    let mut settings = settings(&azure.uri());
    settings.output_dir = std::env::temp_dir().join(format!(
        "costwatch-generate-test-{}",
        std::process::id()
    ));
    let output_dir = settings.output_dir.clone();
    let addr = start_server(settings).await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/api/cost-report/generate"))
        .json(&serde_json::json!({ "num_days": 2 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "success");
    let filename = body["filename"].as_str().unwrap();
    assert!(filename.ends_with(".html"));
    let download_url = body["download_url"].as_str().unwrap();
    assert_eq!(download_url, format!("/api/cost-report/download/{filename}"));

    // Round-trip through the download endpoint.
    let download = reqwest::get(format!("http://{addr}{download_url}")).await.unwrap();
    assert_eq!(download.status(), 200);
    assert!(download
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/html"));

    let html = download.text().await.unwrap();
    assert!(html.contains("Prod Environment"));
    assert!(html.contains("Main Environment"));
    assert!(html.contains("$130.00"));
    assert!(html.contains("+30.00%"));
    assert!(!html.contains("Dev Environment"));
    assert!(!html.contains("Test Environment"));

    std::fs::remove_dir_all(&output_dir).ok();
}

#[tokio::test]
async fn history_returns_one_summary_per_day_oldest_first() {
    let azure = MockServer::start().await;
    mount_token(&azure).await;

    // Same flat data for every subscription and every day; content is
    // irrelevant here, only the walk order is.
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(query_response(
            serde_json::json!([[10.0, 20250601, "microsoft.compute/virtualmachines", "USD"]]),
        )))
        .mount(&azure)
        .await;

    let addr = start_server(settings(&azure.uri())).await;

    let body: serde_json::Value = reqwest::Client::new()
        .get(format!("http://{addr}/api/anomaly/history?days=2"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let history = body["history"].as_array().unwrap();
    assert_eq!(history.len(), 2);

    let yesterday = Utc::now().date_naive() - Duration::days(1);
    let day_before = yesterday - Duration::days(1);
    assert_eq!(
        history[0]["target_date"],
        day_before.format("%Y-%m-%d").to_string()
    );
    assert_eq!(
        history[1]["target_date"],
        yesterday.format("%Y-%m-%d").to_string()
    );
    assert_eq!(history[0]["summary"]["total_subscriptions"], 4);
}
