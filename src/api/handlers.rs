use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{ApiError, AppState};
use crate::models::{parse_quarter_number, InsightFields, InsightRecord, QuarterKey};
use crate::store::TickerQuarterMap;

/// Optional year/quarter filter
///
/// Values stay strings so an unparseable filter reads as "no match" rather
/// than a request error.
#[derive(Debug, Default, Deserialize)]
pub struct LookupQuery {
    pub year: Option<String>,
    pub quarter: Option<String>,
}

/// A parsed filter; `None` in a field means "any"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupFilter {
    pub year: Option<i32>,
    pub quarter: Option<u8>,
}

impl LookupQuery {
    /// `None` when a supplied value cannot match any row
    pub fn filter(&self) -> Option<LookupFilter> {
        let year = match self.year.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(y) => Some(y.parse().ok()?),
        };
        let quarter = match self.quarter.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(q) => Some(parse_quarter_number(q)?),
        };
        Some(LookupFilter { year, quarter })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub ticker: String,
    pub year: i32,
    pub quarter: u8,
    pub quarter_key: String,
    pub summary: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InsightsResponse {
    pub ticker: String,
    pub year: i32,
    pub quarter: u8,
    pub quarter_key: String,
    pub insights: InsightFields,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CompanyResponse {
    pub ticker: String,
    pub records: Vec<InsightRecord>,
}

/// Rows for a ticker under a query filter, newest first
async fn lookup(
    state: &AppState,
    ticker: &str,
    query: &LookupQuery,
) -> Result<Vec<InsightRecord>, ApiError> {
    let Some(filter) = query.filter() else {
        return Ok(vec![]);
    };
    Ok(state
        .store
        .list(ticker, filter.year, filter.quarter)
        .await?)
}

/// Newest row matching the filter
async fn lookup_latest(
    state: &AppState,
    ticker: &str,
    query: &LookupQuery,
    what: &str,
) -> Result<InsightRecord, ApiError> {
    lookup(state, ticker, query)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::NotFound(format!("{} for ticker '{}' not found.", what, ticker)))
}

/// GET /summary/:ticker
pub async fn get_summary(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Query(query): Query<LookupQuery>,
) -> Result<Json<SummaryResponse>, ApiError> {
    info!("Summary request for {}", ticker);
    let record = lookup_latest(&state, &ticker, &query, "Summary").await?;
    Ok(Json(SummaryResponse {
        ticker: record.ticker,
        year: record.year,
        quarter: record.quarter,
        quarter_key: record.quarter_key,
        summary: record.summary,
    }))
}

/// GET /insights/:ticker
pub async fn get_insights(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Query(query): Query<LookupQuery>,
) -> Result<Json<InsightsResponse>, ApiError> {
    info!("Insights request for {}", ticker);
    let record = lookup_latest(&state, &ticker, &query, "Insights").await?;
    Ok(Json(InsightsResponse {
        ticker: record.ticker,
        year: record.year,
        quarter: record.quarter,
        quarter_key: record.quarter_key,
        insights: record.insights,
    }))
}

/// GET /company/:ticker
pub async fn get_company(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Query(query): Query<LookupQuery>,
) -> Result<Json<CompanyResponse>, ApiError> {
    info!("Company request for {}", ticker);
    let records = lookup(&state, &ticker, &query).await?;
    if records.is_empty() {
        return Err(ApiError::NotFound(format!(
            "Records for ticker '{}' not found.",
            ticker
        )));
    }
    Ok(Json(CompanyResponse {
        ticker: ticker.to_uppercase(),
        records,
    }))
}

/// GET /company/:ticker/:quarter_key
pub async fn get_company_quarter(
    State(state): State<AppState>,
    Path((ticker, quarter_key)): Path<(String, String)>,
) -> Result<Json<InsightRecord>, ApiError> {
    info!("Full record request for {} {}", ticker, quarter_key);
    let not_found = || {
        ApiError::NotFound(format!(
            "Record for ticker '{}', quarter '{}' not found.",
            ticker, quarter_key
        ))
    };

    let key: QuarterKey = quarter_key.parse().map_err(|_| not_found())?;
    state
        .store
        .find(&ticker, key)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

/// GET /tickers_quarters
pub async fn get_tickers_quarters(
    State(state): State<AppState>,
) -> Result<Json<TickerQuarterMap>, ApiError> {
    let map = state.store.tickers_quarters().await?;
    info!("Returning {} tickers", map.len());
    Ok(Json(map))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(year: Option<&str>, quarter: Option<&str>) -> LookupQuery {
        LookupQuery {
            year: year.map(String::from),
            quarter: quarter.map(String::from),
        }
    }

    #[test]
    fn test_filter_parsing() {
        assert_eq!(
            query(None, None).filter(),
            Some(LookupFilter {
                year: None,
                quarter: None
            })
        );
        assert_eq!(
            query(Some("2020"), Some("Q2")).filter(),
            Some(LookupFilter {
                year: Some(2020),
                quarter: Some(2)
            })
        );
        assert_eq!(query(Some(""), Some("3")).filter().unwrap().quarter, Some(3));
    }

    #[test]
    fn test_unparseable_filter_matches_nothing() {
        assert_eq!(query(Some("twenty"), None).filter(), None);
        assert_eq!(query(None, Some("Q9")).filter(), None);
    }
}
