use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

use crate::models::{LlmOutput, TranscriptRecord};

/// Parse a transcript JSON file
pub fn read_transcript_file(path: &Path) -> Result<TranscriptRecord> {
    read_json_file(path)
}

/// Parse a raw LLM output JSON file
pub fn read_llm_output_file(path: &Path) -> Result<LlmOutput> {
    read_json_file(path)
}

fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse JSON in {:?}", path))
}

/// All `*.json` files directly inside `dir`, sorted by name
///
/// A missing directory yields an empty list.
pub fn list_json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(vec![]);
    }

    let mut files = Vec::new();
    for entry in
        std::fs::read_dir(dir).with_context(|| format!("Failed to read directory: {:?}", dir))?
    {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Whether `dir` exists and holds at least one regular file
pub fn dir_has_files(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|mut entries| {
            entries.any(|e| e.map(|e| e.path().is_file()).unwrap_or(false))
        })
        .unwrap_or(false)
}
