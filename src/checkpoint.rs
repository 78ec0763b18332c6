//! Optional on-disk checkpoint of the pipeline state.
//!
//! Holds the processed file names plus the aggregate counts so a restarted
//! process neither re-reads old drops nor loses its totals. Written after
//! each published batch.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::aggregate::Snapshot;
use crate::ingest::watcher::ProcessedFileSet;
use crate::sink::json_file::write_atomic;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub processed: ProcessedFileSet,
    pub state: Snapshot,
}

impl Checkpoint {
    /// `Ok(None)` when no checkpoint exists yet; a corrupt file is an error.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let data = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("reading checkpoint {}", path.display()))
            }
        };
        let cp = serde_json::from_str(&data)
            .with_context(|| format!("parsing checkpoint {}", path.display()))?;
        Ok(Some(cp))
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        let body = serde_json::to_vec_pretty(self).context("serialize checkpoint")?;
        write_atomic(path, &body).await
    }
}
