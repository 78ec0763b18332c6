// src/ingest/scheduler.rs
//! Timer-driven micro-batch loop: Watcher → Parser → Engine → Sinks.
//!
//! The scheduler owns every piece of mutable state (processed names,
//! counters) and runs one batch at a time to completion. A stop signal is
//! only looked at between batches.

use anyhow::Result;
use metrics::{counter, gauge};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::aggregate::{AggregationEngine, Snapshot};
use crate::checkpoint::Checkpoint;
use crate::error::IngestError;
use crate::ingest::config::PipelineConfig;
use crate::ingest::parser::DEFAULT_DELIMITER;
use crate::ingest::types::{BatchReport, FileOutcome};
use crate::ingest::watcher::DirectoryWatcher;
use crate::ingest::{ensure_metrics_described, parse_records};
use crate::schema::{Schema, INCIDENT_SCHEMA};
use crate::sink::OutputSink;

pub struct IngestScheduler {
    watcher: DirectoryWatcher,
    engine: AggregationEngine,
    sinks: Vec<Box<dyn OutputSink>>,
    schema: Schema,
    delimiter: char,
    checkpoint_path: Option<PathBuf>,
    /// Restored state not yet seen by the sinks.
    restored: bool,
}

/// Shortest poll period `run` accepts.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

impl IngestScheduler {
    pub fn new(watcher: DirectoryWatcher) -> Self {
        Self {
            watcher,
            engine: AggregationEngine::new(),
            sinks: Vec::new(),
            schema: INCIDENT_SCHEMA,
            delimiter: DEFAULT_DELIMITER,
            checkpoint_path: None,
            restored: false,
        }
    }

    /// Build from config, restoring the checkpoint if one is configured.
    /// Sinks are wired by the caller.
    pub fn from_config(cfg: &PipelineConfig) -> Result<Self> {
        let mut watcher =
            DirectoryWatcher::new(cfg.watch_dir.clone()).with_extension(cfg.extension.clone());
        let mut engine = AggregationEngine::new();
        let mut restored = false;

        if let Some(path) = &cfg.checkpoint_path {
            if let Some(cp) = Checkpoint::load(path)? {
                tracing::info!(
                    target: "ingest",
                    path = %path.display(),
                    processed = cp.processed.len(),
                    total_records = cp.state.total_records,
                    "restored checkpoint"
                );
                engine = AggregationEngine::restore(&cp.state);
                watcher = watcher.with_processed(cp.processed);
                restored = true;
            }
        }

        Ok(Self {
            watcher,
            engine,
            sinks: Vec::new(),
            schema: INCIDENT_SCHEMA,
            delimiter: cfg.delimiter,
            checkpoint_path: cfg.checkpoint_path.clone(),
            restored,
        })
    }

    pub fn with_sink<S: OutputSink + 'static>(mut self, sink: S) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_checkpoint(mut self, path: impl Into<PathBuf>) -> Self {
        self.checkpoint_path = Some(path.into());
        self
    }

    pub fn engine(&self) -> &AggregationEngine {
        &self.engine
    }

    pub fn watcher(&self) -> &DirectoryWatcher {
        &self.watcher
    }

    pub fn snapshot(&self) -> Snapshot {
        self.engine.snapshot()
    }

    /// One poll of the watched directory, processed to completion.
    ///
    /// An unavailable directory yields an empty report; the next poll retries.
    pub async fn poll_once(&mut self) -> BatchReport {
        let names = match self.watcher.poll() {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!(target: "ingest", kind = e.kind(), error = %e, "poll skipped");
                counter!("incident_directory_unavailable_total").increment(1);
                return BatchReport::default();
            }
        };

        let files = names
            .into_iter()
            .map(|name| {
                let content = self.watcher.read(&name);
                (name, content)
            })
            .collect::<Vec<_>>();
        self.process(files).await
    }

    /// Feed a synthetic batch of `(name, content)` pairs, bypassing the
    /// directory listing. Names already processed are ignored.
    pub async fn ingest_batch(&mut self, files: Vec<(String, String)>) -> BatchReport {
        let mut fresh = Vec::with_capacity(files.len());
        for (name, content) in files {
            if self.watcher.mark_processed(&name) {
                fresh.push((name, Ok(content)));
            } else {
                tracing::debug!(target: "ingest", file = %name, "already processed, ignored");
            }
        }
        fresh.sort_by(|a, b| a.0.cmp(&b.0));
        self.process(fresh).await
    }

    async fn process(&mut self, files: Vec<(String, Result<String, IngestError>)>) -> BatchReport {
        if files.is_empty() {
            return BatchReport::default();
        }
        ensure_metrics_described();
        counter!("incident_files_total").increment(files.len() as u64);

        let mut report = BatchReport::default();
        let mut batch = Vec::new();
        for (name, content) in files {
            match content {
                Ok(text) => {
                    let (records, outcome) =
                        parse_records(&name, &text, self.schema, self.delimiter);
                    report.malformed += outcome.malformed;
                    batch.extend(records);
                    report.files.push(outcome);
                }
                Err(e) => {
                    tracing::warn!(target: "ingest", kind = e.kind(), error = %e, "file skipped");
                    counter!("incident_missing_files_total").increment(1);
                    report.files.push(FileOutcome {
                        file: name,
                        skipped: true,
                        ..FileOutcome::default()
                    });
                }
            }
        }

        report.records = self.engine.ingest(batch);
        counter!("incident_batches_total").increment(1);
        counter!("incident_records_total").increment(report.records as u64);

        let snapshot = self.engine.snapshot();
        self.publish(&snapshot).await;
        report.published = true;

        if let Some(path) = &self.checkpoint_path {
            let cp = Checkpoint {
                processed: self.watcher.processed().clone(),
                state: snapshot,
            };
            if let Err(e) = cp.save(path).await {
                tracing::warn!(target: "ingest", error = %format!("{e:#}"), "checkpoint write failed");
            }
        }

        let now = chrono::Utc::now().timestamp().max(0);
        gauge!("incident_last_batch_ts").set(now as f64);
        tracing::info!(
            target: "ingest",
            files = report.files.len(),
            records = report.records,
            malformed = report.malformed,
            "batch ingested"
        );
        report
    }

    async fn publish(&self, snapshot: &Snapshot) {
        for sink in &self.sinks {
            if let Err(e) = sink.publish(snapshot).await {
                tracing::warn!(target: "ingest", sink = sink.name(), error = %format!("{e:#}"), "sink publish failed");
                counter!("incident_sink_errors_total").increment(1);
            }
        }
    }

    /// Poll every `interval` until `stop` flips to `true` (or its sender is
    /// dropped). A batch in progress always finishes first. Returns the
    /// scheduler so callers can inspect the final state.
    ///
    /// State restored from a checkpoint is published once before the first
    /// poll. `interval` is raised to [`MIN_POLL_INTERVAL`] if shorter.
    pub async fn run(mut self, interval: Duration, mut stop: watch::Receiver<bool>) -> Self {
        let interval = interval.max(MIN_POLL_INTERVAL);
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            target: "ingest",
            dir = %self.watcher.dir().display(),
            interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
            "scheduler started"
        );

        if std::mem::take(&mut self.restored) {
            let snapshot = self.engine.snapshot();
            self.publish(&snapshot).await;
        }

        loop {
            if *stop.borrow() {
                break;
            }
            tokio::select! {
                biased;
                changed = stop.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    self.poll_once().await;
                }
            }
        }

        tracing::info!(
            target: "ingest",
            processed = self.watcher.processed().len(),
            "scheduler stopped"
        );
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use std::sync::Arc;

    const HEADER: &str = "Id,title,description,service,date";

    #[tokio::test]
    async fn empty_poll_publishes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = Arc::new(MemorySink::new());
        let mut s = IngestScheduler::new(DirectoryWatcher::new(tmp.path())).with_sink(sink.clone());
        let report = s.poll_once().await;
        assert!(report.is_empty());
        assert!(!report.published);
        assert_eq!(sink.count(), 0);
    }

    #[tokio::test]
    async fn injected_batch_skips_known_names() {
        let tmp = tempfile::tempdir().unwrap();
        let mut s = IngestScheduler::new(DirectoryWatcher::new(tmp.path()));
        let f = format!("{HEADER}\n1,a,b,Emergency,2023-01-01\n");

        let r1 = s.ingest_batch(vec![("a.csv".into(), f.clone())]).await;
        assert_eq!(r1.records, 1);
        let r2 = s.ingest_batch(vec![("a.csv".into(), f)]).await;
        assert!(r2.is_empty());
        assert_eq!(s.engine().department_count("Emergency"), 1);
    }

    #[tokio::test]
    async fn unreadable_file_is_skipped_rest_of_batch_counts() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("bad.csv"), [0xff, 0xfe, b'\n', 0xc3]).unwrap();
        std::fs::write(
            tmp.path().join("good.csv"),
            format!("{HEADER}\n1,a,b,Radiology,2023-01-01\n2,a,b,Radiology,2024-01-01\n"),
        )
        .unwrap();

        let sink = Arc::new(MemorySink::new());
        let mut s = IngestScheduler::new(DirectoryWatcher::new(tmp.path())).with_sink(sink.clone());
        let report = s.poll_once().await;

        assert_eq!(report.files.len(), 2);
        let bad = &report.files[0];
        assert_eq!(bad.file, "bad.csv");
        assert!(bad.skipped);
        assert_eq!(bad.records, 0);
        assert!(!report.files[1].skipped);
        assert_eq!(report.records, 2);
        assert_eq!(s.engine().department_count("Radiology"), 2);
        assert_eq!(sink.count(), 1);
        assert!(s.watcher().processed().contains("bad.csv"));

        // never retried
        assert!(s.poll_once().await.is_empty());
    }

    #[tokio::test]
    async fn zero_interval_still_polls() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("a.csv"),
            format!("{HEADER}\n1,a,b,Emergency,2023-01-01\n"),
        )
        .unwrap();
        let sink = Arc::new(MemorySink::new());
        let scheduler = IngestScheduler::new(DirectoryWatcher::new(tmp.path())).with_sink(sink.clone());

        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(scheduler.run(Duration::ZERO, rx));
        for _ in 0..200 {
            if sink.count() >= 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        tx.send(true).unwrap();

        let s = task.await.expect("run must not panic on a zero interval");
        assert_eq!(s.engine().department_count("Emergency"), 1);
    }

    #[tokio::test]
    async fn stop_before_start_returns_immediately() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.csv"), format!("{HEADER}\n1,a,b,X,2023-01-01\n")).unwrap();
        let (tx, rx) = watch::channel(true);
        let s = IngestScheduler::new(DirectoryWatcher::new(tmp.path()))
            .run(Duration::from_millis(10), rx)
            .await;
        drop(tx);
        assert!(s.watcher().processed().is_empty());
    }
}
