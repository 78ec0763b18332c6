// src/ingest/mod.rs
pub mod config;
pub mod parser;
pub mod scheduler;
pub mod types;
pub mod watcher;

use metrics::{counter, describe_counter, describe_gauge};
use once_cell::sync::OnceCell;

use crate::error::IngestError;
use crate::ingest::types::{FileOutcome, IncidentRecord};
use crate::schema::Schema;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("incident_batches_total", "Non-empty batches processed.");
        describe_counter!("incident_files_total", "Files dispatched by the watcher.");
        describe_counter!(
            "incident_records_total",
            "Valid records folded into the aggregates."
        );
        describe_counter!(
            "incident_malformed_rows_total",
            "Rows dropped for failing schema typing."
        );
        describe_counter!(
            "incident_schema_mismatch_total",
            "Files rejected because their header does not match the schema."
        );
        describe_counter!(
            "incident_missing_files_total",
            "Files that vanished or could not be read after being listed."
        );
        describe_counter!(
            "incident_directory_unavailable_total",
            "Polls where the watched directory could not be listed."
        );
        describe_counter!("incident_sink_errors_total", "Failed sink publishes.");
        describe_gauge!(
            "incident_poll_interval_secs",
            "Configured poll period of the scheduler."
        );
        describe_gauge!(
            "incident_last_batch_ts",
            "Unix ts when the last non-empty batch was published."
        );
    });
}

/// Parse one file, keeping the valid records and reporting the rest.
///
/// Malformed rows are logged one by one at debug level and summarized once
/// per file; a schema mismatch rejects the file with zero records.
pub fn parse_records(
    file: &str,
    content: &str,
    schema: Schema,
    delimiter: char,
) -> (Vec<IncidentRecord>, FileOutcome) {
    let mut outcome = FileOutcome {
        file: file.to_string(),
        ..FileOutcome::default()
    };

    let rows = match parser::parse_file(file, content, schema, delimiter) {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!(target: "ingest", kind = e.kind(), error = %e, "file rejected");
            counter!("incident_schema_mismatch_total").increment(1);
            outcome.rejected = true;
            return (Vec::new(), outcome);
        }
    };

    let mut records = Vec::new();
    for row in rows {
        match row {
            Ok(r) => records.push(r),
            Err(e @ IngestError::MalformedRecord { .. }) => {
                tracing::debug!(target: "ingest", error = %e, "row dropped");
                outcome.malformed += 1;
            }
            Err(e) => {
                tracing::warn!(target: "ingest", kind = e.kind(), error = %e, "unexpected row error");
                outcome.malformed += 1;
            }
        }
    }
    outcome.records = records.len();

    if outcome.malformed > 0 {
        tracing::warn!(
            target: "ingest",
            file,
            kept = outcome.records,
            malformed = outcome.malformed,
            "malformed rows dropped"
        );
        counter!("incident_malformed_rows_total").increment(outcome.malformed as u64);
    }

    (records, outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::INCIDENT_SCHEMA;

    #[test]
    fn four_good_rows_one_bad_id() {
        let content = "Id,title,description,service,date\n\
            1,a,b,Emergency,2023-01-01\n\
            2,a,b,Pediatrics,2023-02-01\n\
            abc,a,b,Radiology,2023-03-01\n\
            4,a,b,Emergency,2024-01-01\n\
            5,a,b,Radiology,2024-02-01\n";
        let (records, outcome) = parse_records("f.csv", content, INCIDENT_SCHEMA, ',');
        assert_eq!(records.len(), 4);
        assert_eq!(outcome.records, 4);
        assert_eq!(outcome.malformed, 1);
        assert!(!outcome.rejected);
    }

    #[test]
    fn mismatched_header_contributes_nothing() {
        let content = "a,b,c\n1,2,3\n";
        let (records, outcome) = parse_records("f.csv", content, INCIDENT_SCHEMA, ',');
        assert!(records.is_empty());
        assert!(outcome.rejected);
    }
}
