use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use reqwest::Client;
use tracing::info;
use tracing_subscriber::EnvFilter;

use earnings_insight::{
    api, clean_outputs, dashboard, execute_plan, extract_ticker, ingest, plan,
    process_transcripts, IngestConfig, InsightStore, OpenAiClient, OpenAiConfig, PipelineConfig,
    ProcessConfig, ServeConfig,
};

#[derive(Parser)]
#[command(name = "earnings-insight")]
#[command(author, version, about = "Earnings call transcript insight pipeline", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run whatever pipeline stages are missing, then serve the API and dashboard
    Run {
        #[command(flatten)]
        pipeline: PipelineArgs,

        #[command(flatten)]
        serve: ServeArgs,

        /// Stop after the pipeline without starting the web services
        #[arg(long)]
        no_serve: bool,
    },

    /// Download every transcript into the raw directory
    Ingest {
        #[command(flatten)]
        data: DataArgs,

        /// Stop after this many dataset rows
        #[arg(long)]
        max_rows: Option<usize>,
    },

    /// Copy one company's transcripts out of the raw directory
    Extract {
        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Summarize and extract insights from the company's transcripts
    Process {
        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Parse LLM outputs and upsert them into the insight database
    Clean {
        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Serve the REST API
    ServeApi {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        serve: ServeArgs,
    },

    /// Serve the dashboard
    ServeDashboard {
        #[command(flatten)]
        serve: ServeArgs,
    },
}

#[derive(Args)]
struct DataArgs {
    /// Root directory for all pipeline files
    #[arg(long, env = "DATA_DIR", default_value = "data")]
    data_dir: PathBuf,
}

#[derive(Args)]
struct PipelineArgs {
    #[command(flatten)]
    data: DataArgs,

    /// Company to process
    #[arg(short, long, env = "TARGET_TICKER", default_value = "AAPL")]
    ticker: String,

    /// Concurrent LLM jobs
    #[arg(long, env = "MAX_WORKERS", default_value = "2")]
    max_workers: usize,
}

impl PipelineArgs {
    fn config(&self) -> PipelineConfig {
        PipelineConfig::new(&self.data.data_dir, &self.ticker, self.max_workers)
    }
}

#[derive(Args)]
struct ServeArgs {
    /// API bind address [default: 127.0.0.1:8000]
    #[arg(long, env = "API_ADDR")]
    api_addr: Option<SocketAddr>,

    /// Dashboard bind address [default: 127.0.0.1:8501]
    #[arg(long, env = "DASHBOARD_ADDR")]
    dashboard_addr: Option<SocketAddr>,

    /// Base URL the dashboard uses to reach the API [default: http://localhost:8000]
    #[arg(long, env = "FASTAPI_URL")]
    api_url: Option<String>,
}

impl ServeArgs {
    fn config(self) -> ServeConfig {
        ServeConfig::with_overrides(self.api_addr, self.dashboard_addr, self.api_url)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            pipeline,
            serve,
            no_serve,
        } => run(pipeline.config(), serve.config(), no_serve).await,
        Commands::Ingest { data, max_rows } => {
            let config = PipelineConfig::new(&data.data_dir, "AAPL", 1);
            let ingest_config = IngestConfig {
                max_rows,
                ..Default::default()
            };
            let summary = ingest(&Client::new(), &ingest_config, &config.raw_dir()).await?;
            info!(
                "Ingest complete: {} rows, {} saved, {} skipped",
                summary.rows_seen, summary.saved, summary.skipped
            );
            Ok(())
        }
        Commands::Extract { pipeline } => {
            let config = pipeline.config();
            let summary = extract_ticker(&config.raw_dir(), &config.ticker_dir(), &config.ticker)?;
            info!(
                "Extract complete: {} found, {} copied, {} failed",
                summary.found, summary.copied, summary.failed
            );
            Ok(())
        }
        Commands::Process { pipeline } => {
            let config = pipeline.config();
            let model = OpenAiClient::new(OpenAiConfig::from_env()?)?;
            let process_config = ProcessConfig {
                max_workers: config.max_workers,
                ..Default::default()
            };
            process_transcripts(&model, &process_config, &config.ticker_dir(), &config.llm_dir())
                .await?;
            Ok(())
        }
        Commands::Clean { pipeline } => {
            let config = pipeline.config();
            let store = InsightStore::open(&config.db_path()).await?;
            clean_outputs(&store, &config.llm_dir()).await?;
            Ok(())
        }
        Commands::ServeApi { data, serve } => {
            let config = PipelineConfig::new(&data.data_dir, "AAPL", 1);
            let store = InsightStore::open_readonly(&config.db_path()).await?;
            api::serve(serve.config().api_addr, store).await
        }
        Commands::ServeDashboard { serve } => {
            let serve = serve.config();
            dashboard::serve(serve.dashboard_addr, &serve.api_url).await
        }
    }
}

fn setup_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(config: PipelineConfig, serve: ServeConfig, no_serve: bool) -> Result<()> {
    info!(
        "Pipeline for {} in {:?} ({} workers)",
        config.ticker, config.data_dir, config.max_workers
    );

    let store = InsightStore::open(&config.db_path()).await?;
    let stage_plan = plan(&config, &store).await?;
    info!("Plan: {:?}", stage_plan);

    execute_plan(
        stage_plan,
        &config,
        &store,
        &Client::new(),
        &IngestConfig::default(),
        || OpenAiClient::new(OpenAiConfig::from_env()?),
    )
    .await
    .context("Pipeline failed")?;

    let rows = store.count_for_ticker(&config.ticker).await?;
    info!("{} cleaned rows available for {}", rows, config.ticker);
    drop(store);

    if no_serve {
        return Ok(());
    }

    let api_store = InsightStore::open_readonly(&config.db_path()).await?;
    tokio::try_join!(
        api::serve(serve.api_addr, api_store),
        dashboard::serve(serve.dashboard_addr, &serve.api_url),
    )?;
    Ok(())
}
