// src/ingest/types.rs
use chrono::{Datelike, NaiveDate};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct IncidentRecord {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub department: String, // `service` column, case-sensitive
    pub date: NaiveDate,
}

impl IncidentRecord {
    pub fn year(&self) -> i32 {
        self.date.year()
    }
}

/// What happened to one file of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileOutcome {
    pub file: String,
    pub records: usize,
    pub malformed: usize,
    pub rejected: bool,
    pub skipped: bool,
}

/// Per-batch summary returned by the scheduler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub files: Vec<FileOutcome>,
    pub records: usize,
    pub malformed: usize,
    pub published: bool,
}

impl BatchReport {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
