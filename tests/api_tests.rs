//! Integration tests for the insight REST API and the dashboard in front of it

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use earnings_insight::api::{self, AppState, CompanyResponse, InsightsResponse, SummaryResponse};
use earnings_insight::dashboard::{self, ApiClient, DashboardState};
use earnings_insight::{InsightFields, InsightRecord, InsightStore};

fn record(ticker: &str, year: i32, quarter: u8, summary: &str) -> InsightRecord {
    InsightRecord {
        ticker: ticker.to_string(),
        year,
        quarter,
        quarter_key: format!("Q{}_{}", quarter, year),
        file: format!("{}_Q{}_{}.json", ticker, quarter, year),
        company: Some("Apple Inc.".to_string()),
        summary: summary.to_string(),
        insights: InsightFields {
            eps: Some(format!("{}.{}", year % 10, quarter)),
            revenue: Some("$90B".to_string()),
            key_risks: vec!["supply chain".to_string()],
            ..Default::default()
        },
        cleaned_at: None,
    }
}

async fn populated_store() -> InsightStore {
    let store = InsightStore::in_memory().await.unwrap();
    store.upsert(&record("AAPL", 2019, 4, "holiday quarter")).await.unwrap();
    store.upsert(&record("AAPL", 2020, 1, "pandemic begins")).await.unwrap();
    store.upsert(&record("AAPL", 2020, 2, "remote work boom")).await.unwrap();
    store.upsert(&record("MSFT", 2021, 3, "cloud growth")).await.unwrap();
    store
}

async fn get(app: &Router, path: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_summary_returns_latest_quarter() {
    let app = api::build_router(AppState::new(populated_store().await));

    let (status, body) = get(&app, "/summary/aapl").await;
    assert_eq!(status, StatusCode::OK);
    let summary: SummaryResponse = serde_json::from_value(body).unwrap();
    assert_eq!(summary.ticker, "AAPL");
    assert_eq!(summary.quarter_key, "Q2_2020");
    assert_eq!(summary.summary, "remote work boom");
}

#[tokio::test]
async fn test_summary_filters_by_year_and_quarter() {
    let app = api::build_router(AppState::new(populated_store().await));

    let (status, body) = get(&app, "/summary/AAPL?year=2019").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quarter_key"], "Q4_2019");

    let (status, body) = get(&app, "/summary/AAPL?year=2020&quarter=Q1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"], "pandemic begins");

    let (status, _) = get(&app, "/summary/AAPL?year=2018").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_ticker_is_not_found() {
    let app = api::build_router(AppState::new(populated_store().await));

    for path in ["/summary/TSLA", "/insights/TSLA", "/company/TSLA", "/company/TSLA/Q1_2020"] {
        let (status, body) = get(&app, path).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", path);
        assert!(body["error"].as_str().unwrap().contains("TSLA"));
    }
}

#[tokio::test]
async fn test_unparseable_filters_are_not_found() {
    let app = api::build_router(AppState::new(populated_store().await));

    let (status, _) = get(&app, "/summary/AAPL?year=soon").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&app, "/insights/AAPL?quarter=Q7").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&app, "/company/AAPL/latest").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_insights_fields() {
    let app = api::build_router(AppState::new(populated_store().await));

    let (status, body) = get(&app, "/insights/MSFT").await;
    assert_eq!(status, StatusCode::OK);
    let insights: InsightsResponse = serde_json::from_value(body).unwrap();
    assert_eq!(insights.quarter_key, "Q3_2021");
    assert_eq!(insights.insights.eps.as_deref(), Some("1.3"));
    assert_eq!(insights.insights.key_risks, vec!["supply chain"]);
}

#[tokio::test]
async fn test_company_lists_records_newest_first() {
    let app = api::build_router(AppState::new(populated_store().await));

    let (status, body) = get(&app, "/company/aapl").await;
    assert_eq!(status, StatusCode::OK);
    let company: CompanyResponse = serde_json::from_value(body).unwrap();
    assert_eq!(company.ticker, "AAPL");
    let keys: Vec<_> = company.records.iter().map(|r| r.quarter_key.as_str()).collect();
    assert_eq!(keys, vec!["Q2_2020", "Q1_2020", "Q4_2019"]);

    let (_, body) = get(&app, "/company/AAPL?year=2020").await;
    assert_eq!(body["records"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_company_quarter_lookup() {
    let app = api::build_router(AppState::new(populated_store().await));

    let (status, body) = get(&app, "/company/AAPL/Q1_2020").await;
    assert_eq!(status, StatusCode::OK);
    let found: InsightRecord = serde_json::from_value(body).unwrap();
    assert_eq!(found.summary, "pandemic begins");
    assert!(found.cleaned_at.is_some());

    let (status, body) = get(&app, "/company/AAPL/q1-2020").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quarter_key"], "Q1_2020");
}

#[tokio::test]
async fn test_tickers_quarters_and_health() {
    let app = api::build_router(AppState::new(populated_store().await));

    let (status, body) = get(&app, "/tickers_quarters").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["AAPL"]["2020"], serde_json::json!(["Q1", "Q2"]));
    assert_eq!(body["MSFT"]["2021"], serde_json::json!(["Q3"]));

    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_missing_database_answers_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = InsightStore::open_readonly(&dir.path().join("earnings_insights.db"))
        .await
        .unwrap();
    let app = api::build_router(AppState::new(store));

    let (status, _) = get(&app, "/summary/AAPL").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = get(&app, "/tickers_quarters").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({}));
}

/// Start the API on an ephemeral port and return its base URL
async fn spawn_api(store: InsightStore) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = api::build_router(AppState::new(store));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn get_html(app: &Router, path: &str) -> (StatusCode, String) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

#[tokio::test]
async fn test_dashboard_renders_latest_record_by_default() {
    let base_url = spawn_api(populated_store().await).await;
    let app = dashboard::build_router(DashboardState {
        api: ApiClient::new(base_url),
    });

    let (status, html) = get_html(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Summary for AAPL (Q2_2020)"));
    assert!(html.contains("remote work boom"));
    assert!(html.contains("<option value=\"MSFT\">MSFT</option>"));

    let (status, html) = get_html(&app, "/?ticker=MSFT").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("cloud growth"));

    let (_, html) = get_html(&app, "/?ticker=AAPL&year=2019&quarter=Q4").await;
    assert!(html.contains("holiday quarter"));
}

#[tokio::test]
async fn test_dashboard_with_empty_database() {
    let base_url = spawn_api(InsightStore::in_memory().await.unwrap()).await;
    let app = dashboard::build_router(DashboardState {
        api: ApiClient::new(base_url),
    });

    let (status, html) = get_html(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("No companies or quarters found."));
}

#[tokio::test]
async fn test_dashboard_reports_unreachable_api() {
    // bind then drop to get a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let app = dashboard::build_router(DashboardState {
        api: ApiClient::new(format!("http://{}", addr)),
    });

    let (status, html) = get_html(&app, "/").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(html.contains("Could not connect to the API server"));
}
