use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::QuarterKey;

/// Raw per-transcript output of the LLM processor, written before cleaning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmOutput {
    /// Name of the transcript file this output was generated from
    pub file: String,
    pub ticker: String,
    pub quarter: QuarterKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    /// Narrative summary as returned by the model
    #[serde(default)]
    pub summary: String,
    /// Raw text of the structured-fields response (expected to hold JSON)
    #[serde(default)]
    pub structured: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub run_id: String,
    #[serde(default)]
    pub generated_at: String,
}

/// Structured financial fields extracted from a transcript
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsightFields {
    pub eps: Option<String>,
    pub revenue: Option<String>,
    pub guidance: Option<String>,
    #[serde(default)]
    pub key_risks: Vec<String>,
    pub ceo_quote: Option<String>,
    /// Any other key/value pairs the model returned
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl InsightFields {
    pub fn is_empty(&self) -> bool {
        self.eps.is_none()
            && self.revenue.is_none()
            && self.guidance.is_none()
            && self.key_risks.is_empty()
            && self.ceo_quote.is_none()
            && self.extra.is_empty()
    }
}

/// A cleaned insight row; at most one per (ticker, year, quarter)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightRecord {
    pub ticker: String,
    pub year: i32,
    pub quarter: u8,
    /// Canonical `Q{n}_{YYYY}` label
    pub quarter_key: String,
    pub file: String,
    pub company: Option<String>,
    pub summary: String,
    pub insights: InsightFields,
    /// Set by the store on write
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cleaned_at: Option<String>,
}
