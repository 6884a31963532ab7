use std::path::Path;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::io::write_json_pretty;
use crate::models::{QuarterKey, TranscriptRecord};

/// Configuration for the bulk transcript download
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Dataset rows endpoint
    pub rows_url: String,
    /// Hosted dataset id
    pub dataset: String,
    pub config_name: String,
    pub split: String,
    /// Rows requested per page
    pub page_size: usize,
    /// Stop after this many rows (whole dataset when unset)
    pub max_rows: Option<usize>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            rows_url: "https://datasets-server.huggingface.co/rows".to_string(),
            dataset: "kurry/sp500_earnings_transcripts".to_string(),
            config_name: "default".to_string(),
            split: "train".to_string(),
            page_size: 100,
            max_rows: None,
        }
    }
}

/// Result of the ingest stage
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestSummary {
    pub rows_seen: usize,
    pub saved: usize,
    pub skipped: usize,
}

#[derive(Debug, Deserialize)]
struct RowsPage {
    #[serde(default)]
    rows: Vec<RowEntry>,
    #[serde(default)]
    num_rows_total: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RowEntry {
    row: DatasetRow,
}

/// One row of the hosted transcript dataset
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatasetRow {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub quarter: Option<i64>,
    #[serde(default)]
    pub year: Option<i64>,
    #[serde(default)]
    pub date: Option<Value>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Convert a dataset row, explaining why it is unusable if it is
pub fn row_to_transcript(row: DatasetRow) -> Result<TranscriptRecord, String> {
    let ticker = row
        .symbol
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .ok_or("missing symbol")?;
    let transcript = row
        .content
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| format!("{}: missing content", ticker))?;
    let year = row.year.ok_or_else(|| format!("{}: missing year", ticker))?;
    let quarter = row.quarter.ok_or_else(|| format!("{}: missing quarter", ticker))?;
    let year = i32::try_from(year).map_err(|_| format!("{}: year {} out of range", ticker, year))?;
    let key = QuarterKey::new(year, quarter.clamp(0, u32::MAX as i64) as u32)
        .map_err(|e| format!("{}: {}", ticker, e))?;

    let date = row.date.and_then(|d| match d {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    });

    Ok(TranscriptRecord {
        company: row.company_name,
        ticker,
        quarter: key,
        date,
        transcript,
    })
}

/// Download the transcript dataset into `raw_dir`, one file per transcript
pub async fn ingest(client: &Client, config: &IngestConfig, raw_dir: &Path) -> Result<IngestSummary> {
    std::fs::create_dir_all(raw_dir)
        .with_context(|| format!("Failed to create directory: {:?}", raw_dir))?;

    info!("Loading dataset {} ({})", config.dataset, config.split);

    let mut summary = IngestSummary::default();
    let mut offset = 0usize;

    loop {
        let mut length = config.page_size.max(1);
        if let Some(max) = config.max_rows {
            if offset >= max {
                break;
            }
            length = length.min(max - offset);
        }

        let page = fetch_page(client, config, offset, length).await?;
        if page.rows.is_empty() {
            break;
        }

        offset += page.rows.len();
        for entry in page.rows {
            summary.rows_seen += 1;
            match row_to_transcript(entry.row) {
                Ok(record) => {
                    let path = raw_dir.join(record.file_name());
                    write_json_pretty(&path, &record)?;
                    summary.saved += 1;
                    if summary.saved % 100 == 0 {
                        info!("Saved {} transcripts (latest {:?})", summary.saved, path);
                    }
                }
                Err(reason) => {
                    warn!("Skipping dataset row {}: {}", summary.rows_seen - 1, reason);
                    summary.skipped += 1;
                }
            }
        }

        if page.num_rows_total.is_some_and(|total| offset >= total) {
            break;
        }
    }

    info!(
        "Loaded {} transcripts into {:?} ({} rows skipped)",
        summary.saved, raw_dir, summary.skipped
    );
    Ok(summary)
}

async fn fetch_page(
    client: &Client,
    config: &IngestConfig,
    offset: usize,
    length: usize,
) -> Result<RowsPage> {
    let response = client
        .get(&config.rows_url)
        .query(&[
            ("dataset", config.dataset.as_str()),
            ("config", config.config_name.as_str()),
            ("split", config.split.as_str()),
        ])
        .query(&[("offset", offset), ("length", length)])
        .send()
        .await
        .context("Failed to request dataset rows")?
        .error_for_status()
        .with_context(|| format!("Dataset server rejected page at offset {}", offset))?;

    response
        .json()
        .await
        .context("Failed to parse dataset rows response")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> DatasetRow {
        DatasetRow {
            symbol: Some("aapl".into()),
            company_name: Some("Apple Inc.".into()),
            quarter: Some(1),
            year: Some(2006),
            date: Some(Value::from("2006-01-18")),
            content: Some("Good afternoon.".into()),
        }
    }

    #[test]
    fn test_row_to_transcript() {
        let record = row_to_transcript(row()).unwrap();
        assert_eq!(record.ticker, "AAPL");
        assert_eq!(record.file_name(), "AAPL_Q1_2006.json");
        assert_eq!(record.date.as_deref(), Some("2006-01-18"));
        assert_eq!(record.company.as_deref(), Some("Apple Inc."));
    }

    #[test]
    fn test_row_rejections() {
        let no_symbol = DatasetRow {
            symbol: None,
            ..row()
        };
        assert!(row_to_transcript(no_symbol).is_err());

        let blank = DatasetRow {
            content: Some("   ".into()),
            ..row()
        };
        assert!(row_to_transcript(blank).unwrap_err().contains("missing content"));

        let bad_quarter = DatasetRow {
            quarter: Some(7),
            ..row()
        };
        assert!(row_to_transcript(bad_quarter).unwrap_err().contains("out of range"));

        let huge_year = DatasetRow {
            year: Some(i64::from(i32::MAX) + 1),
            ..row()
        };
        assert!(row_to_transcript(huge_year).unwrap_err().contains("year 2147483648 out of range"));
    }

    #[test]
    fn test_parse_rows_page() {
        let json = r#"{
            "features": [],
            "rows": [
                {"row_idx": 0, "row": {"symbol": "MSFT", "company_name": "Microsoft", "quarter": 2, "year": 2020, "date": "2020-04-29 17:30:00", "content": "Hello"}, "truncated_cells": []},
                {"row_idx": 1, "row": {"symbol": "MSFT", "quarter": 3, "year": 2020, "date": null, "content": "Again"}, "truncated_cells": []}
            ],
            "num_rows_total": 2
        }"#;
        let page: RowsPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.num_rows_total, Some(2));
        let records: Vec<_> = page
            .rows
            .into_iter()
            .map(|r| row_to_transcript(r.row).unwrap())
            .collect();
        assert_eq!(records[1].quarter.to_string(), "Q3_2020");
        assert_eq!(records[1].date, None);
    }
}
