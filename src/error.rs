// src/error.rs
//! Recoverable failure kinds of the ingest pipeline.
//!
//! None of these terminate the process: each is handled where it occurs
//! (row, file or poll) and shows up as undercounting or a stale snapshot.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// A data row failed schema typing; the row is dropped.
    #[error("{file}:{line}: malformed record: {reason}")]
    MalformedRecord {
        file: String,
        line: usize,
        reason: String,
    },

    /// The header (column structure) does not match the schema; the file
    /// contributes zero records.
    #[error("{file}: schema mismatch: {reason}")]
    SchemaMismatch { file: String, reason: String },

    /// Listed by the watcher but gone before it could be read.
    #[error("{file}: vanished before it could be read")]
    MissingFile { file: String },

    /// Present but could not be read (permissions, invalid UTF-8, ...).
    #[error("{file}: unreadable: {source}")]
    FileUnreadable {
        file: String,
        #[source]
        source: std::io::Error,
    },

    /// The watched directory itself is missing or unreadable.
    #[error("watched directory {} unavailable: {source}", dir.display())]
    DirectoryUnavailable {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl IngestError {
    /// Short stable label, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::MalformedRecord { .. } => "malformed_record",
            IngestError::SchemaMismatch { .. } => "schema_mismatch",
            IngestError::MissingFile { .. } => "missing_file",
            IngestError::FileUnreadable { .. } => "file_unreadable",
            IngestError::DirectoryUnavailable { .. } => "directory_unavailable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_location() {
        let e = IngestError::MalformedRecord {
            file: "a.csv".into(),
            line: 4,
            reason: "Id: invalid digit".into(),
        };
        assert_eq!(e.to_string(), "a.csv:4: malformed record: Id: invalid digit");
        assert_eq!(e.kind(), "malformed_record");
    }
}
