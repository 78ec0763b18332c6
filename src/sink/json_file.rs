// src/sink/json_file.rs
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

use super::OutputSink;
use crate::aggregate::Snapshot;

/// Overwrites one JSON file with the latest snapshot.
///
/// Writes go to a sibling `.tmp` file first and are renamed into place, so a
/// reader polling the file never sees a half-written document.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl OutputSink for JsonFileSink {
    async fn publish(&self, snapshot: &Snapshot) -> Result<()> {
        let body = serde_json::to_vec_pretty(snapshot).context("serialize snapshot")?;
        write_atomic(&self.path, &body).await
    }

    fn name(&self) -> &'static str {
        "json_file"
    }
}

/// Temp file + rename. Shared with the checkpoint writer.
pub(crate) async fn write_atomic(path: &Path, body: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, body)
        .await
        .with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .await
        .with_context(|| format!("renaming {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}
