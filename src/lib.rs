// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod aggregate;
pub mod api;
pub mod checkpoint;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod schema;
pub mod sink;

// ---- Re-exports for stable public API ----
pub use crate::aggregate::{AggregationEngine, Snapshot, YearCount, TOP_YEARS};
pub use crate::error::IngestError;
pub use crate::ingest::config::PipelineConfig;
pub use crate::ingest::scheduler::IngestScheduler;
pub use crate::ingest::types::{BatchReport, FileOutcome, IncidentRecord};
pub use crate::ingest::watcher::{DirectoryWatcher, ProcessedFileSet};
pub use crate::sink::{JsonFileSink, LogSink, MemorySink, OutputSink, SharedSnapshot};
