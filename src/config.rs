use std::net::SocketAddr;
use std::path::PathBuf;

/// Where a pipeline run reads and writes, and for which company
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root of all pipeline files
    pub data_dir: PathBuf,
    /// Company to extract and process
    pub ticker: String,
    /// Concurrent LLM jobs
    pub max_workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            ticker: "AAPL".to_string(),
            max_workers: 2,
        }
    }
}

impl PipelineConfig {
    pub fn new(data_dir: impl Into<PathBuf>, ticker: &str, max_workers: usize) -> Self {
        Self {
            data_dir: data_dir.into(),
            ticker: ticker.trim().to_uppercase(),
            max_workers: max_workers.max(1),
        }
    }

    /// Bulk download of every transcript
    pub fn raw_dir(&self) -> PathBuf {
        self.data_dir.join("raw")
    }

    /// Transcripts for the target ticker only
    pub fn ticker_dir(&self) -> PathBuf {
        self.data_dir.join(format!("raw_{}", self.ticker.to_lowercase()))
    }

    /// Raw LLM output for the target ticker
    pub fn llm_dir(&self) -> PathBuf {
        self.data_dir.join(format!("llm_{}", self.ticker.to_lowercase()))
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("earnings_insights.db")
    }
}

/// Bind addresses for the two web services
#[derive(Debug, Clone)]
pub struct ServeConfig {
    pub api_addr: SocketAddr,
    pub dashboard_addr: SocketAddr,
    /// Base URL the dashboard uses to reach the API
    pub api_url: String,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            api_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            dashboard_addr: SocketAddr::from(([127, 0, 0, 1], 8501)),
            api_url: "http://localhost:8000".to_string(),
        }
    }
}

impl ServeConfig {
    /// Defaults with any supplied values applied on top
    pub fn with_overrides(
        api_addr: Option<SocketAddr>,
        dashboard_addr: Option<SocketAddr>,
        api_url: Option<String>,
    ) -> Self {
        let defaults = Self::default();
        Self {
            api_addr: api_addr.unwrap_or(defaults.api_addr),
            dashboard_addr: dashboard_addr.unwrap_or(defaults.dashboard_addr),
            api_url: api_url.unwrap_or(defaults.api_url),
        }
    }
}
