// src/sink/logger.rs
use anyhow::Result;

use super::OutputSink;
use crate::aggregate::Snapshot;

/// Emits each snapshot as one structured `tracing` event.
#[derive(Debug, Clone, Default)]
pub struct LogSink;

#[async_trait::async_trait]
impl OutputSink for LogSink {
    async fn publish(&self, snapshot: &Snapshot) -> Result<()> {
        let departments = serde_json::to_string(&snapshot.departments)?;
        let top_years = serde_json::to_string(&snapshot.top_years)?;
        tracing::info!(
            target: "snapshot",
            batches = snapshot.batches,
            total_records = snapshot.total_records,
            departments = %departments,
            top_years = %top_years,
            "aggregate snapshot"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
