use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::io::{list_json_files, read_transcript_file, write_json_pretty};
use crate::llm::{
    build_structure_prompt, build_summary_prompt, complete_with_retry, ChatModel, RetryPolicy,
};
use crate::models::LlmOutput;

/// Configuration for the LLM processing stage
#[derive(Debug, Clone)]
pub struct ProcessConfig {
    /// Transcripts in flight at once
    pub max_workers: usize,
    /// Backoff for rate limits and transient failures
    pub retry: RetryPolicy,
    /// Stamped into every output of this run
    pub run_id: String,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            max_workers: 2,
            retry: RetryPolicy::default(),
            run_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// Result of the processing stage
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProcessSummary {
    pub total: usize,
    pub processed: usize,
    pub skipped_existing: usize,
    pub skipped_empty: usize,
    pub failed: usize,
}

#[derive(Debug)]
enum Outcome {
    Processed,
    SkippedEmpty,
    Failed,
}

/// Run every transcript in `input_dir` through the model
///
/// Up to `max_workers` transcripts are processed concurrently. Each writes
/// its own output file into `output_dir`; transcripts that already have one
/// are skipped. A transcript that fails (including after exhausting its
/// retries) is logged and skipped without affecting the others.
pub async fn process_transcripts<M: ChatModel + Sync>(
    model: &M,
    config: &ProcessConfig,
    input_dir: &Path,
    output_dir: &Path,
) -> Result<ProcessSummary> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create directory: {:?}", output_dir))?;

    let files = list_json_files(input_dir)?;
    let mut summary = ProcessSummary {
        total: files.len(),
        ..Default::default()
    };

    let pending: Vec<PathBuf> = files
        .into_iter()
        .filter(|path| match path.file_name() {
            Some(name) if output_dir.join(name).exists() => {
                summary.skipped_existing += 1;
                false
            }
            _ => true,
        })
        .collect();

    info!(
        "Skipping {} already-processed transcripts, processing {} with {} workers",
        summary.skipped_existing,
        pending.len(),
        config.max_workers.max(1)
    );

    let outcomes: Vec<Outcome> = stream::iter(pending)
        .map(|path| process_one(model, config, path, output_dir))
        .buffer_unordered(config.max_workers.max(1))
        .collect()
        .await;

    for outcome in outcomes {
        match outcome {
            Outcome::Processed => summary.processed += 1,
            Outcome::SkippedEmpty => summary.skipped_empty += 1,
            Outcome::Failed => summary.failed += 1,
        }
    }

    info!(
        "Processing complete: {} processed, {} empty, {} failed",
        summary.processed, summary.skipped_empty, summary.failed
    );
    Ok(summary)
}

/// Process a single transcript
async fn process_one<M: ChatModel + Sync>(
    model: &M,
    config: &ProcessConfig,
    path: PathBuf,
    output_dir: &Path,
) -> Outcome {
    let file = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let record = match read_transcript_file(&path) {
        Ok(record) => record,
        Err(e) => {
            warn!("{}: unreadable transcript: {:#}", file, e);
            return Outcome::Failed;
        }
    };

    if !record.has_text() {
        warn!("{}: no transcript text, skipping", file);
        return Outcome::SkippedEmpty;
    }

    let summary_prompt = build_summary_prompt(&record.transcript);
    let summary = match complete_with_retry(model, &summary_prompt, &config.retry, &file).await {
        Ok(text) => text,
        Err(e) => {
            warn!("{}: summary request failed, skipping: {}", file, e);
            return Outcome::Failed;
        }
    };

    let structure_prompt = build_structure_prompt(&record.transcript);
    let structured =
        match complete_with_retry(model, &structure_prompt, &config.retry, &file).await {
            Ok(text) => text,
            Err(e) => {
                warn!("{}: structured request failed, skipping: {}", file, e);
                return Outcome::Failed;
            }
        };

    let output = LlmOutput {
        file: file.clone(),
        ticker: record.ticker.to_uppercase(),
        quarter: record.quarter,
        company: record.company,
        summary,
        structured,
        model: model.model_name().to_string(),
        run_id: config.run_id.clone(),
        generated_at: chrono::Utc::now().to_rfc3339(),
    };

    match write_json_pretty(&output_dir.join(&file), &output) {
        Ok(()) => {
            info!("{}: processed", file);
            Outcome::Processed
        }
        Err(e) => {
            warn!("{}: failed to write output: {:#}", file, e);
            Outcome::Failed
        }
    }
}
