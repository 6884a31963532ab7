//! Browser dashboard over the insight API
//!
//! Server-rendered HTML; every value shown comes from the API, never from
//! the database directly.

use std::net::SocketAddr;

use anyhow::Result;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub mod client;
pub mod render;

pub use client::ApiClient;
pub use render::{escape_html, render_page, resolve_selection, DashboardView, RecordView, Selection};

/// Shared dashboard state
#[derive(Clone)]
pub struct DashboardState {
    pub api: ApiClient,
}

/// Dropdown selection from the query string
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub ticker: Option<String>,
    pub year: Option<String>,
    pub quarter: Option<String>,
}

/// Build the dashboard router
pub fn build_router(state: DashboardState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the dashboard until the process is stopped
pub async fn serve(addr: SocketAddr, api_url: &str) -> Result<()> {
    let state = DashboardState {
        api: ApiClient::new(api_url),
    };
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        "Dashboard listening on http://{} (API at {})",
        listener.local_addr()?,
        state.api.base_url()
    );
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "module": "earnings-insight-dashboard",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /
async fn index(
    State(state): State<DashboardState>,
    Query(query): Query<PageQuery>,
) -> (StatusCode, Html<String>) {
    let tickers = match state.api.tickers_quarters().await {
        Ok(tickers) => tickers,
        Err(e) => {
            error!("Ticker list unavailable: {:#}", e);
            let view = DashboardView {
                tickers: Default::default(),
                selection: None,
                record: RecordView::Empty,
                banner: Some(format!(
                    "Could not connect to the API server at {}. Make sure it is running.",
                    state.api.base_url()
                )),
            };
            return (StatusCode::BAD_GATEWAY, Html(render_page(&view)));
        }
    };

    let selection = resolve_selection(
        &tickers,
        query.ticker.as_deref(),
        query.year.as_deref(),
        query.quarter.as_deref(),
    );

    let mut status = StatusCode::OK;
    let record = match &selection {
        None => RecordView::Empty,
        Some(selection) => match state.api.company_record(&selection.ticker, selection.key()).await {
            Ok(Some(record)) => RecordView::Found(Box::new(record)),
            Ok(None) => RecordView::NotFound,
            Err(e) => {
                error!("Record fetch failed: {:#}", e);
                status = StatusCode::BAD_GATEWAY;
                RecordView::Error(format!("{:#}", e))
            }
        },
    };

    let view = DashboardView {
        tickers,
        selection,
        record,
        banner: None,
    };
    (status, Html(render_page(&view)))
}
