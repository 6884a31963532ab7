use anyhow::{anyhow, Context, Result};
use reqwest::{Client, StatusCode, Url};
use tracing::{info, warn};

use crate::models::{InsightRecord, QuarterKey};
use crate::store::TickerQuarterMap;

/// Client for the insight API
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Base URL with `segments` appended, each percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("Invalid API URL: {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("API URL cannot take a path: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Every ticker with its years and quarters
    pub async fn tickers_quarters(&self) -> Result<TickerQuarterMap> {
        let url = self.endpoint(&["tickers_quarters"])?;
        info!("Fetching ticker/quarter map from {}", url);
        self.client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Could not connect to the API server at {}", self.base_url))?
            .error_for_status()
            .context("API rejected ticker list request")?
            .json()
            .await
            .context("Failed to parse ticker list")
    }

    /// One full record; `None` when the API answers not found
    pub async fn company_record(
        &self,
        ticker: &str,
        key: QuarterKey,
    ) -> Result<Option<InsightRecord>> {
        let url = self.endpoint(&["company", ticker, &key.to_string()])?;
        info!("Fetching record {} {}", ticker, key);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Could not connect to the API server at {}", self.base_url))?;

        if response.status() == StatusCode::NOT_FOUND {
            warn!("No record found for {} {}", ticker, key);
            return Ok(None);
        }

        let record = response
            .error_for_status()
            .with_context(|| format!("API error fetching {} {}", ticker, key))?
            .json()
            .await
            .context("Failed to parse record")?;
        Ok(Some(record))
    }
}
