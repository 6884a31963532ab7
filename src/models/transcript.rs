use serde::{Deserialize, Serialize};

use super::QuarterKey;

/// A downloaded earnings-call transcript, identified by (ticker, year, quarter)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    pub ticker: String,
    pub quarter: QuarterKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Raw call text
    #[serde(default, alias = "text")]
    pub transcript: String,
}

impl TranscriptRecord {
    /// File name used for this transcript everywhere in the data directory
    pub fn file_name(&self) -> String {
        transcript_file_name(&self.ticker, &self.quarter)
    }

    pub fn has_text(&self) -> bool {
        !self.transcript.trim().is_empty()
    }
}

/// `{TICKER}_Q{n}_{YYYY}.json`
pub fn transcript_file_name(ticker: &str, quarter: &QuarterKey) -> String {
    format!("{}_{}.json", ticker.to_uppercase(), quarter)
}

/// Recover ticker and quarter from a transcript file name
pub fn parse_transcript_file_name(name: &str) -> Option<(String, QuarterKey)> {
    let stem = name.strip_suffix(".json")?;
    // Tickers may contain underscores, so split from the right
    let mut parts = stem.rsplitn(3, '_');
    let year = parts.next()?;
    let quarter = parts.next()?;
    let ticker = parts.next()?;
    if ticker.is_empty() {
        return None;
    }
    let key = format!("{}_{}", quarter, year).parse().ok()?;
    Some((ticker.to_uppercase(), key))
}
