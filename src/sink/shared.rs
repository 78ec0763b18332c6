// src/sink/shared.rs
use anyhow::Result;
use std::sync::{Arc, RwLock};

use super::OutputSink;
use crate::aggregate::Snapshot;

/// Latest published snapshot, shared with readers such as the HTTP API.
#[derive(Debug, Clone, Default)]
pub struct SharedSnapshot {
    inner: Arc<RwLock<Option<Snapshot>>>,
}

impl SharedSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` until the first batch has been published.
    pub fn latest(&self) -> Option<Snapshot> {
        self.inner.read().ok().and_then(|g| g.clone())
    }
}

#[async_trait::async_trait]
impl OutputSink for SharedSnapshot {
    async fn publish(&self, snapshot: &Snapshot) -> Result<()> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| anyhow::anyhow!("snapshot lock poisoned"))?;
        *guard = Some(snapshot.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "shared"
    }
}
