use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::io::list_json_files;
use crate::models::parse_transcript_file_name;

/// Result of the extract stage
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractSummary {
    /// Files in the bulk download belonging to the ticker
    pub found: usize,
    pub copied: usize,
    pub failed: usize,
}

/// Copy one company's transcripts out of the bulk download
///
/// Finding no files is logged, not an error. A failed copy is counted and
/// the remaining files are still copied.
pub fn extract_ticker(raw_dir: &Path, dest_dir: &Path, ticker: &str) -> Result<ExtractSummary> {
    let ticker = ticker.trim().to_uppercase();
    std::fs::create_dir_all(dest_dir)
        .with_context(|| format!("Failed to create directory: {:?}", dest_dir))?;

    let matching: Vec<_> = list_json_files(raw_dir)?
        .into_iter()
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .and_then(parse_transcript_file_name)
                .is_some_and(|(t, _)| t == ticker)
        })
        .collect();

    let mut summary = ExtractSummary {
        found: matching.len(),
        ..Default::default()
    };

    info!(
        "Extracting {}: found {} files in {:?}",
        ticker, summary.found, raw_dir
    );

    if matching.is_empty() {
        warn!(
            "No {} files found in {:?}; has the ingest stage run?",
            ticker, raw_dir
        );
        return Ok(summary);
    }

    for path in matching {
        let Some(name) = path.file_name() else {
            continue;
        };
        match std::fs::copy(&path, dest_dir.join(name)) {
            Ok(_) => summary.copied += 1,
            Err(e) => {
                warn!("Failed to copy {:?}: {}", name, e);
                summary.failed += 1;
            }
        }
    }

    info!(
        "Copied {} {} transcripts to {:?}",
        summary.copied, ticker, dest_dir
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_only_matching_ticker() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("raw");
        std::fs::create_dir(&raw).unwrap();
        for name in [
            "AAPL_Q1_2020.json",
            "AAPL_Q2_2020.json",
            "AA_Q1_2020.json",
            "AAPLX_Q1_2020.json",
            "AAPL_notes.json",
        ] {
            std::fs::write(raw.join(name), "{}").unwrap();
        }

        let dest = dir.path().join("raw_aapl");
        let summary = extract_ticker(&raw, &dest, "aapl").unwrap();

        assert_eq!(summary.found, 2);
        assert_eq!(summary.copied, 2);
        assert!(dest.join("AAPL_Q1_2020.json").exists());
        assert!(!dest.join("AA_Q1_2020.json").exists());
    }

    #[test]
    fn test_extract_with_no_matches_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("raw_tsla");
        let summary = extract_ticker(&dir.path().join("raw"), &dest, "TSLA").unwrap();
        assert_eq!(summary, ExtractSummary::default());
        assert!(dest.exists());
    }
}
