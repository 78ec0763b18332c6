// src/sink/mod.rs
//! Output sinks: where each batch's snapshot is published.
//!
//! Sinks never see the engine itself, only a borrowed
//! [`Snapshot`]. Publishing the same snapshot twice must leave the sink in
//! the same state.

pub mod json_file;
pub mod logger;
pub mod shared;

use anyhow::Result;

use crate::aggregate::Snapshot;

pub use json_file::JsonFileSink;
pub use logger::LogSink;
pub use shared::SharedSnapshot;

#[async_trait::async_trait]
pub trait OutputSink: Send + Sync {
    async fn publish(&self, snapshot: &Snapshot) -> Result<()>;
    fn name(&self) -> &'static str;
}

// --- Test helper ---
/// Records every published snapshot in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub published: std::sync::Mutex<Vec<Snapshot>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<Snapshot> {
        self.published
            .lock()
            .ok()
            .and_then(|v| v.last().cloned())
    }

    pub fn count(&self) -> usize {
        self.published.lock().map(|v| v.len()).unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl OutputSink for MemorySink {
    async fn publish(&self, snapshot: &Snapshot) -> Result<()> {
        self.published
            .lock()
            .map_err(|_| anyhow::anyhow!("memory sink mutex poisoned"))?
            .push(snapshot.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[async_trait::async_trait]
impl<S: OutputSink + ?Sized> OutputSink for std::sync::Arc<S> {
    async fn publish(&self, snapshot: &Snapshot) -> Result<()> {
        (**self).publish(snapshot).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
