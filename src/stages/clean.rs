use std::path::Path;

use anyhow::Result;
use tracing::{info, warn};

use crate::io::{list_json_files, read_llm_output_file};
use crate::llm::parse_structured_fields;
use crate::models::{InsightRecord, LlmOutput};
use crate::store::InsightStore;

/// Summaries containing any of these are model boilerplate, not insight
const REFUSAL_PHRASES: &[&str] = &[
    "please provide the content",
    "certainly! please provide",
    "i'm sorry, but you need to",
    "as an ai language model",
    "i cannot fulfill this request",
    "i lack the ability to",
    "i do not have access to real-time",
];

/// Result of the clean stage
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanSummary {
    pub files: usize,
    pub upserted: usize,
    /// Dropped because the summary was a refusal
    pub filtered: usize,
    /// Could not be read or parsed at all
    pub unreadable: usize,
}

/// Whether a summary is a refusal or a request for more input
pub fn is_refusal(summary: &str) -> bool {
    let lower = summary.to_lowercase();
    REFUSAL_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

/// Normalize one raw LLM output into an insight record
///
/// Never fails: malformed structured output yields empty fields.
pub fn parse_llm_output(output: &LlmOutput) -> InsightRecord {
    let company = output
        .company
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string);

    InsightRecord {
        ticker: output.ticker.trim().to_uppercase(),
        year: output.quarter.year,
        quarter: output.quarter.quarter,
        quarter_key: output.quarter.to_string(),
        file: output.file.clone(),
        company,
        summary: output.summary.trim().to_string(),
        insights: parse_structured_fields(&output.structured),
        cleaned_at: None,
    }
}

/// Clean every LLM output in `llm_dir` into the store
///
/// Re-running over the same files leaves exactly one row per
/// (ticker, year, quarter).
pub async fn clean_outputs(store: &InsightStore, llm_dir: &Path) -> Result<CleanSummary> {
    let files = list_json_files(llm_dir)?;
    let mut summary = CleanSummary {
        files: files.len(),
        ..Default::default()
    };

    info!("Cleaning {} LLM outputs from {:?}", summary.files, llm_dir);

    for path in files {
        let output = match read_llm_output_file(&path) {
            Ok(output) => output,
            Err(e) => {
                warn!("Skipping unreadable output: {:#}", e);
                summary.unreadable += 1;
                continue;
            }
        };

        if is_refusal(&output.summary) {
            warn!("Filtered {} due to invalid summary content", output.file);
            summary.filtered += 1;
            continue;
        }

        let record = parse_llm_output(&output);
        if record.insights.is_empty() {
            warn!("{}: no structured fields recovered", record.file);
        }
        store.upsert(&record).await?;
        summary.upserted += 1;
    }

    info!(
        "Finished cleaning: {} upserted, {} filtered, {} unreadable",
        summary.upserted, summary.filtered, summary.unreadable
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(summary: &str, structured: &str) -> LlmOutput {
        LlmOutput {
            file: "AAPL_Q3_2021.json".into(),
            ticker: "aapl".into(),
            quarter: "Q3_2021".parse().unwrap(),
            company: Some("  Apple Inc. ".into()),
            summary: summary.into(),
            structured: structured.into(),
            model: "gpt-4o".into(),
            run_id: "run".into(),
            generated_at: "2024-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn test_is_refusal() {
        assert!(is_refusal("As an AI language model, I cannot..."));
        assert!(is_refusal("Certainly! Please provide the transcript."));
        assert!(!is_refusal("Revenue grew 8% year over year."));
    }

    #[test]
    fn test_parse_llm_output() {
        let record = parse_llm_output(&output(
            " Strong quarter. ",
            r#"{"eps": "1.30", "key_risks": ["supply"]}"#,
        ));
        assert_eq!(record.ticker, "AAPL");
        assert_eq!(record.year, 2021);
        assert_eq!(record.quarter, 3);
        assert_eq!(record.quarter_key, "Q3_2021");
        assert_eq!(record.company.as_deref(), Some("Apple Inc."));
        assert_eq!(record.summary, "Strong quarter.");
        assert_eq!(record.insights.eps.as_deref(), Some("1.30"));
        assert_eq!(record.insights.key_risks, vec!["supply"]);
    }

    #[test]
    fn test_parse_llm_output_tolerates_garbage() {
        let record = parse_llm_output(&output("ok", "not json at all"));
        assert!(record.insights.is_empty());
    }
}
