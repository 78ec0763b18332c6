// src/ingest/parser.rs
//! Delimited-text record parser on top of `csv`.
//!
//! [`parse_file`] validates the header eagerly and hands back a lazy
//! [`RecordParser`] that yields one `Result` per data record, so a bad record
//! is reported and skipped without aborting the rest of the file. Quoted
//! fields may span lines; a record's line number is where it starts.

use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};

use crate::error::IngestError;
use crate::ingest::types::IncidentRecord;
use crate::schema::Schema;

pub const DEFAULT_DELIMITER: char = ',';

/// Lazy, single-pass iterator over the data records of one file.
pub struct RecordParser<'a> {
    file: &'a str,
    records: StringRecordsIntoIter<&'a [u8]>,
    schema: Schema,
}

// `StringRecordsIntoIter` is not `Debug`, so the derive cannot be used.
impl std::fmt::Debug for RecordParser<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordParser")
            .field("file", &self.file)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Check the header of `content` against `schema` and return the record
/// iterator.
///
/// A missing or mismatching header rejects the whole file with
/// [`IngestError::SchemaMismatch`].
pub fn parse_file<'a>(
    file: &'a str,
    content: &'a str,
    schema: Schema,
    delimiter: char,
) -> Result<RecordParser<'a>, IngestError> {
    let mismatch = |reason: String| IngestError::SchemaMismatch {
        file: file.to_string(),
        reason,
    };

    let delimiter = u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| mismatch(format!("delimiter {delimiter:?} is not ASCII")))?;

    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let header: Vec<String> = rdr
        .headers()
        .map_err(|e| mismatch(format!("unreadable header: {e}")))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();
    if header.is_empty() {
        return Err(mismatch("no header row".to_string()));
    }
    schema.check_header(&header).map_err(mismatch)?;

    Ok(RecordParser {
        file,
        records: rdr.into_records(),
        schema,
    })
}

impl Iterator for RecordParser<'_> {
    type Item = Result<IncidentRecord, IngestError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let parsed = match self.records.next()? {
                Ok(rec) if is_blank(&rec) => continue,
                Ok(rec) => {
                    let line = rec.position().map(|p| p.line()).unwrap_or(0);
                    let cols = rec.iter().map(str::to_string).collect();
                    self.schema
                        .validate_row(cols)
                        .map_err(|reason| self.malformed(line, reason))
                }
                Err(e) => {
                    let line = e.position().map(|p| p.line()).unwrap_or(0);
                    Err(self.malformed(line, e.to_string()))
                }
            };
            return Some(parsed);
        }
    }
}

impl RecordParser<'_> {
    fn malformed(&self, line: u64, reason: String) -> IngestError {
        IngestError::MalformedRecord {
            file: self.file.to_string(),
            line: usize::try_from(line).unwrap_or(usize::MAX),
            reason,
        }
    }
}

/// Whitespace-only lines come through as a single blank field.
fn is_blank(rec: &StringRecord) -> bool {
    rec.len() == 1 && rec.get(0).is_some_and(|f| f.trim().is_empty())
}
