//! Cleaned insight table
//!
//! One row per (ticker, year, quarter). The batch cleaner is the only writer;
//! the API opens the same file read-only.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::{info, warn};

use crate::models::{InsightFields, InsightRecord, QuarterKey};

/// Ticker -> year -> sorted quarter labels ("Q1".."Q4")
pub type TickerQuarterMap = BTreeMap<String, BTreeMap<i32, Vec<String>>>;

/// Handle to the insight table
#[derive(Clone)]
pub struct InsightStore {
    pool: SqlitePool,
}

impl InsightStore {
    /// Open (creating if needed) the database for writing
    pub async fn open(db_path: &Path) -> Result<Self> {
        let newly_created = !db_path.exists();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database: {}", db_path.display()))?;

        if newly_created {
            info!("Initialized new database: {}", db_path.display());
        } else {
            info!("Opened existing database: {}", db_path.display());
        }

        let store = Self { pool };
        store.create_schema().await?;
        Ok(store)
    }

    /// Open the database for lookups only
    ///
    /// A missing file is not an error: the store is empty and every lookup
    /// finds nothing.
    pub async fn open_readonly(db_path: &Path) -> Result<Self> {
        if !db_path.exists() {
            warn!(
                "Database file not found at {}; all lookups will return not found",
                db_path.display()
            );
            return Self::empty().await;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .read_only(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await
            .context("Failed to connect to database in read-only mode")?;

        info!("Connected to {} (read-only)", db_path.display());
        Ok(Self { pool })
    }

    /// In-memory store with the schema created
    pub async fn in_memory() -> Result<Self> {
        let store = Self::empty().await?;
        store.create_schema().await?;
        Ok(store)
    }

    /// In-memory store without any tables
    async fn empty() -> Result<Self> {
        // a single long-lived connection keeps the in-memory database alive
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory database")?;
        Ok(Self { pool })
    }

    async fn create_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS earnings_insights (
                ticker TEXT NOT NULL,
                year INTEGER NOT NULL,
                quarter INTEGER NOT NULL,
                file TEXT NOT NULL,
                company TEXT,
                summary TEXT NOT NULL DEFAULT '',
                eps TEXT,
                revenue TEXT,
                guidance TEXT,
                key_risks TEXT NOT NULL DEFAULT '[]',
                ceo_quote TEXT,
                extra_json TEXT NOT NULL DEFAULT '{}',
                cleaned_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (ticker, year, quarter)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create earnings_insights table")?;
        Ok(())
    }

    /// Insert or replace the row for the record's (ticker, year, quarter)
    pub async fn upsert(&self, record: &InsightRecord) -> Result<()> {
        let key_risks = serde_json::to_string(&record.insights.key_risks)?;
        let extra = serde_json::to_string(&record.insights.extra)?;

        sqlx::query(
            r#"
            INSERT INTO earnings_insights (
                ticker, year, quarter, file, company, summary,
                eps, revenue, guidance, key_risks, ceo_quote, extra_json
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (ticker, year, quarter) DO UPDATE SET
                file = excluded.file,
                company = excluded.company,
                summary = excluded.summary,
                eps = excluded.eps,
                revenue = excluded.revenue,
                guidance = excluded.guidance,
                key_risks = excluded.key_risks,
                ceo_quote = excluded.ceo_quote,
                extra_json = excluded.extra_json,
                cleaned_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(record.ticker.to_uppercase())
        .bind(record.year as i64)
        .bind(record.quarter as i64)
        .bind(&record.file)
        .bind(&record.company)
        .bind(&record.summary)
        .bind(&record.insights.eps)
        .bind(&record.insights.revenue)
        .bind(&record.insights.guidance)
        .bind(key_risks)
        .bind(&record.insights.ceo_quote)
        .bind(extra)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to upsert insight for {}", record.file))?;

        Ok(())
    }

    /// Exact lookup
    pub async fn find(&self, ticker: &str, key: QuarterKey) -> Result<Option<InsightRecord>> {
        Ok(self
            .list(ticker, Some(key.year), Some(key.quarter))
            .await?
            .into_iter()
            .next())
    }

    /// Rows for a ticker, newest quarter first, optionally filtered
    pub async fn list(
        &self,
        ticker: &str,
        year: Option<i32>,
        quarter: Option<u8>,
    ) -> Result<Vec<InsightRecord>> {
        let result = sqlx::query(
            r#"
            SELECT * FROM earnings_insights
            WHERE ticker = ?
              AND (? IS NULL OR year = ?)
              AND (? IS NULL OR quarter = ?)
            ORDER BY year DESC, quarter DESC
            "#,
        )
        .bind(ticker.to_uppercase())
        .bind(year.map(i64::from))
        .bind(year.map(i64::from))
        .bind(quarter.map(i64::from))
        .bind(quarter.map(i64::from))
        .fetch_all(&self.pool)
        .await;

        let rows = tolerate_missing_table(result, Vec::new())?;
        rows.iter().map(row_to_record).collect()
    }

    /// Newest row for a ticker
    pub async fn latest(&self, ticker: &str) -> Result<Option<InsightRecord>> {
        Ok(self.list(ticker, None, None).await?.into_iter().next())
    }

    pub async fn count_for_ticker(&self, ticker: &str) -> Result<i64> {
        let result =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM earnings_insights WHERE ticker = ?")
                .bind(ticker.to_uppercase())
                .fetch_one(&self.pool)
                .await;
        tolerate_missing_table(result, 0)
    }

    pub async fn count(&self) -> Result<i64> {
        let result = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM earnings_insights")
            .fetch_one(&self.pool)
            .await;
        tolerate_missing_table(result, 0)
    }

    /// Every available ticker/year/quarter, for dropdowns
    pub async fn tickers_quarters(&self) -> Result<TickerQuarterMap> {
        let result = sqlx::query(
            "SELECT ticker, year, quarter FROM earnings_insights ORDER BY ticker, year, quarter",
        )
        .fetch_all(&self.pool)
        .await;

        let mut map = TickerQuarterMap::new();
        for row in tolerate_missing_table(result, Vec::new())? {
            let ticker: String = row.try_get("ticker")?;
            let year: i64 = row.try_get("year")?;
            let quarter: i64 = row.try_get("quarter")?;
            map.entry(ticker)
                .or_default()
                .entry(year as i32)
                .or_default()
                .push(format!("Q{}", quarter));
        }
        Ok(map)
    }
}

/// A missing table reads as "no rows"
fn tolerate_missing_table<T>(result: Result<T, sqlx::Error>, empty: T) -> Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(sqlx::Error::Database(db_err)) if db_err.message().contains("no such table") => {
            Ok(empty)
        }
        Err(e) => Err(e).context("Database query failed"),
    }
}

fn row_to_record(row: &SqliteRow) -> Result<InsightRecord> {
    let year: i64 = row.try_get("year")?;
    let quarter: i64 = row.try_get("quarter")?;
    let key_risks: String = row.try_get("key_risks")?;
    let extra: String = row.try_get("extra_json")?;

    let insights = InsightFields {
        eps: row.try_get("eps")?,
        revenue: row.try_get("revenue")?,
        guidance: row.try_get("guidance")?,
        key_risks: serde_json::from_str(&key_risks).unwrap_or_default(),
        ceo_quote: row.try_get("ceo_quote")?,
        extra: serde_json::from_str(&extra).unwrap_or_default(),
    };

    Ok(InsightRecord {
        ticker: row.try_get("ticker")?,
        year: year as i32,
        quarter: quarter as u8,
        quarter_key: format!("Q{}_{}", quarter, year),
        file: row.try_get("file")?,
        company: row.try_get("company")?,
        summary: row.try_get("summary")?,
        insights,
        cleaned_at: row.try_get("cleaned_at")?,
    })
}
