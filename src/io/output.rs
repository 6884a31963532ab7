use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

/// Write a value as pretty JSON
///
/// The content goes to a sibling temp file first and is renamed into place,
/// so a file that exists is always complete.
pub fn write_json_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }

    let tmp = path.with_extension("json.tmp");
    let file = std::fs::File::create(&tmp)
        .with_context(|| format!("Failed to create file: {:?}", tmp))?;
    serde_json::to_writer_pretty(file, value).context("Failed to write JSON")?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("Failed to move {:?} into place", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_write_json_pretty_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("llm_aapl").join("AAPL_Q1_2020.json");

        write_json_pretty(&path, &json!({"summary": "ok"})).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\n  \"summary\": \"ok\""));
        assert!(!path.with_extension("json.tmp").exists());
    }
}
