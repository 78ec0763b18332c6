// src/ingest/watcher.rs
//! Polling watcher over a drop directory.
//!
//! Each poll lists the directory, diffs against the [`ProcessedFileSet`] and
//! returns the new names sorted lexically. Names are marked processed before
//! they are returned, so a file is dispatched at most once even if reading or
//! parsing it fails later. Content changes to an already-seen name are never
//! picked up.

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::IngestError;

/// Filenames already dispatched. Only ever grows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessedFileSet {
    names: BTreeSet<String>,
}

impl ProcessedFileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Returns `true` if the name was not seen before.
    pub fn mark(&mut self, name: &str) -> bool {
        self.names.insert(name.to_string())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl FromIterator<String> for ProcessedFileSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug)]
pub struct DirectoryWatcher {
    dir: PathBuf,
    extension: Option<String>,
    processed: ProcessedFileSet,
}

impl DirectoryWatcher {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            extension: None,
            processed: ProcessedFileSet::new(),
        }
    }

    /// Only dispatch files with this extension (case-insensitive, no dot).
    pub fn with_extension(mut self, ext: Option<String>) -> Self {
        self.extension = ext
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty());
        self
    }

    /// Resume from a previously persisted set.
    pub fn with_processed(mut self, processed: ProcessedFileSet) -> Self {
        self.processed = processed;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn processed(&self) -> &ProcessedFileSet {
        &self.processed
    }

    /// Mark a name dispatched by some other route (injected batches).
    /// Returns `false` if it had already been seen.
    pub fn mark_processed(&mut self, name: &str) -> bool {
        self.processed.mark(name)
    }

    /// List new files, mark them processed and return them sorted.
    pub fn poll(&mut self) -> Result<Vec<String>, IngestError> {
        let entries =
            std::fs::read_dir(&self.dir).map_err(|source| IngestError::DirectoryUnavailable {
                dir: self.dir.clone(),
                source,
            })?;

        let mut fresh = Vec::new();
        for entry in entries.flatten() {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                tracing::debug!(target: "ingest", path = ?entry.path(), "skipping non-UTF-8 file name");
                continue;
            };
            if !self.is_candidate(&name) || self.processed.contains(&name) {
                continue;
            }
            // Follows symlinks; a file that vanished here is simply not listed.
            match std::fs::metadata(entry.path()) {
                Ok(m) if m.is_file() => fresh.push(name),
                _ => continue,
            }
        }

        fresh.sort();
        for name in &fresh {
            self.processed.mark(name);
        }
        Ok(fresh)
    }

    /// Read one dispatched file as UTF-8 text.
    pub fn read(&self, name: &str) -> Result<String, IngestError> {
        std::fs::read_to_string(self.dir.join(name)).map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                IngestError::MissingFile {
                    file: name.to_string(),
                }
            } else {
                IngestError::FileUnreadable {
                    file: name.to_string(),
                    source,
                }
            }
        })
    }

    /// Hidden and in-progress names (`.x`, `_x`) are never dispatched.
    fn is_candidate(&self, name: &str) -> bool {
        if name.starts_with('.') || name.starts_with('_') {
            return false;
        }
        match &self.extension {
            None => true,
            Some(want) => Path::new(name)
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(want)),
        }
    }
}
