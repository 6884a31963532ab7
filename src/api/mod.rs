//! Read-only REST API over the cleaned insight table
//!
//! Every lookup that matches no row answers 404; there are no write routes.

use std::net::SocketAddr;

use anyhow::Result;
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::store::InsightStore;

pub mod error;
pub mod handlers;
pub mod health;

pub use error::ApiError;
pub use handlers::*;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub store: InsightStore,
}

impl AppState {
    pub fn new(store: InsightStore) -> Self {
        Self { store }
    }
}

/// Build the API router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/summary/:ticker", get(handlers::get_summary))
        .route("/insights/:ticker", get(handlers::get_insights))
        .route("/company/:ticker", get(handlers::get_company))
        .route("/company/:ticker/:quarter_key", get(handlers::get_company_quarter))
        .route("/tickers_quarters", get(handlers::get_tickers_quarters))
        .merge(health::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the API until the process is stopped
pub async fn serve(addr: SocketAddr, store: InsightStore) -> Result<()> {
    let app = build_router(AppState::new(store));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("API listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
