use anyhow::{Context, Result};
use reqwest::Client;
use tracing::info;

use crate::config::PipelineConfig;
use crate::io::dir_has_files;
use crate::llm::ChatModel;
use crate::store::InsightStore;

use super::{
    clean_outputs, extract_ticker, ingest, process_transcripts, IngestConfig, ProcessConfig,
};

/// Which stages a run will execute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagePlan {
    pub ingest: bool,
    pub extract: bool,
    /// LLM processing followed by cleaning
    pub process: bool,
}

/// Decide which stages still need to run
///
/// Ingest is skipped when the raw directory holds files, extract when the
/// ticker directory does, and processing when the cleaned table already has
/// rows for the ticker.
pub async fn plan(config: &PipelineConfig, store: &InsightStore) -> Result<StagePlan> {
    let existing_rows = store.count_for_ticker(&config.ticker).await?;
    Ok(StagePlan {
        ingest: !dir_has_files(&config.raw_dir()),
        extract: !dir_has_files(&config.ticker_dir()),
        process: existing_rows == 0,
    })
}

/// Execute a plan, stopping at the first stage error
///
/// `make_model` is only called when processing runs, so a missing API key
/// does not matter for an already-populated database.
pub async fn execute_plan<M, F>(
    plan: StagePlan,
    config: &PipelineConfig,
    store: &InsightStore,
    http: &Client,
    ingest_config: &IngestConfig,
    make_model: F,
) -> Result<()>
where
    M: ChatModel + Sync,
    F: FnOnce() -> Result<M>,
{
    if plan.ingest {
        info!("Stage 1: downloading transcripts");
        ingest(http, ingest_config, &config.raw_dir())
            .await
            .context("Ingest stage failed")?;
    } else {
        info!("Stage 1: raw data present in {:?}, skipping download", config.raw_dir());
    }

    if plan.extract {
        info!("Stage 2: extracting {} transcripts", config.ticker);
        extract_ticker(&config.raw_dir(), &config.ticker_dir(), &config.ticker)
            .context("Extract stage failed")?;
    } else {
        info!(
            "Stage 2: {:?} already populated, skipping extraction",
            config.ticker_dir()
        );
    }

    if plan.process {
        info!("Stage 3: LLM processing for {}", config.ticker);
        let model = make_model().context("Failed to set up LLM client")?;
        let process_config = ProcessConfig {
            max_workers: config.max_workers,
            ..Default::default()
        };
        process_transcripts(&model, &process_config, &config.ticker_dir(), &config.llm_dir())
            .await
            .context("Processing stage failed")?;

        info!("Stage 4: cleaning LLM outputs");
        clean_outputs(store, &config.llm_dir())
            .await
            .context("Clean stage failed")?;
    } else {
        info!(
            "Stage 3: cleaned table already has rows for {}, skipping processing",
            config.ticker
        );
    }

    Ok(())
}
