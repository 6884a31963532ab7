pub mod api;
pub mod config;
pub mod dashboard;
pub mod io;
pub mod llm;
pub mod models;
pub mod stages;
pub mod store;

pub use config::{PipelineConfig, ServeConfig};
pub use llm::{ChatModel, LlmError, OpenAiClient, OpenAiConfig, RetryPolicy};
pub use models::{InsightFields, InsightRecord, LlmOutput, QuarterKey, TranscriptRecord};
pub use stages::{
    clean_outputs, execute_plan, extract_ticker, ingest, plan, process_transcripts, IngestConfig,
    ProcessConfig, StagePlan,
};
pub use store::{InsightStore, TickerQuarterMap};
