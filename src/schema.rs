//! # Incident Schema
//! Static declaration of the expected file layout plus pure validation
//! functions used by the record parser.
//!
//! Column order is fixed: `Id, title, description, service, date`.
//! Header names compare ASCII case-insensitively after trimming; data
//! values are checked per declared [`FieldType`].

use chrono::NaiveDate;

use crate::ingest::types::IncidentRecord;

/// ISO-8601 calendar date, e.g. `2023-04-17`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Integer,
    Text,
    /// Text that must not be empty (categorical keys).
    NonEmptyText,
    Date,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
}

#[derive(Debug, Clone, Copy)]
pub struct Schema {
    pub fields: &'static [FieldSpec],
}

pub const INCIDENT_SCHEMA: Schema = Schema {
    fields: &[
        FieldSpec {
            name: "Id",
            ty: FieldType::Integer,
        },
        FieldSpec {
            name: "title",
            ty: FieldType::Text,
        },
        FieldSpec {
            name: "description",
            ty: FieldType::Text,
        },
        FieldSpec {
            name: "service",
            ty: FieldType::NonEmptyText,
        },
        FieldSpec {
            name: "date",
            ty: FieldType::Date,
        },
    ],
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum FieldValue {
    Integer(i64),
    Text(String),
    Date(NaiveDate),
}

impl FieldType {
    fn parse(self, raw: String) -> Result<FieldValue, String> {
        match self {
            FieldType::Integer => raw
                .trim()
                .parse::<i64>()
                .map(FieldValue::Integer)
                .map_err(|e| format!("{e} ({raw:?})")),
            FieldType::Text => Ok(FieldValue::Text(raw)),
            FieldType::NonEmptyText => {
                if raw.trim().is_empty() {
                    Err("empty value".to_string())
                } else {
                    Ok(FieldValue::Text(raw))
                }
            }
            FieldType::Date => NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
                .map(FieldValue::Date)
                .map_err(|e| format!("{e} ({raw:?})")),
        }
    }
}

impl Schema {
    pub fn width(&self) -> usize {
        self.fields.len()
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }

    /// Check that a header row declares exactly this schema's columns, in order.
    pub fn check_header<S: AsRef<str>>(&self, header: &[S]) -> Result<(), String> {
        if header.len() != self.width() {
            return Err(format!(
                "expected {} columns {:?}, header has {}",
                self.width(),
                self.column_names(),
                header.len()
            ));
        }
        for (spec, got) in self.fields.iter().zip(header) {
            let got = got.as_ref().trim();
            if !got.eq_ignore_ascii_case(spec.name) {
                return Err(format!("expected column {:?}, found {:?}", spec.name, got));
            }
        }
        Ok(())
    }

    /// Type-check one data row and build the record. The error names the
    /// first offending field.
    pub fn validate_row(&self, cols: Vec<String>) -> Result<IncidentRecord, String> {
        if cols.len() != self.width() {
            return Err(format!(
                "expected {} fields, found {}",
                self.width(),
                cols.len()
            ));
        }

        let mut values = Vec::with_capacity(self.width());
        for (spec, raw) in self.fields.iter().zip(cols) {
            let v = spec.ty.parse(raw).map_err(|e| format!("{}: {e}", spec.name))?;
            values.push(v);
        }

        match <[FieldValue; 5]>::try_from(values) {
            Ok(
                [
                    FieldValue::Integer(id),
                    FieldValue::Text(title),
                    FieldValue::Text(description),
                    FieldValue::Text(department),
                    FieldValue::Date(date),
                ],
            ) => Ok(IncidentRecord {
                id,
                title,
                description,
                department,
                date,
            }),
            _ => Err("schema does not describe an incident record".to_string()),
        }
    }
}
