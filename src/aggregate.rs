//! # Aggregation Engine
//! Running incident counts per department and per calendar year.
//!
//! Pure state machine, no I/O: `ingest` folds records in, `snapshot` returns
//! the complete current state (not a delta). Counts only ever grow.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::ingest::types::IncidentRecord;

/// Number of ranked years published in each snapshot.
pub const TOP_YEARS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearCount {
    pub year: i32,
    pub count: u64,
}

/// Complete-mode view of the engine state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub departments: BTreeMap<String, u64>,
    pub years: BTreeMap<i32, u64>,
    pub top_years: Vec<YearCount>,
    pub total_records: u64,
    pub batches: u64,
}

#[derive(Debug, Default)]
pub struct AggregationEngine {
    departments: HashMap<String, u64>,
    years: HashMap<i32, u64>,
    total_records: u64,
    batches: u64,
}

impl AggregationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted counts (see `checkpoint`).
    pub fn restore(snapshot: &Snapshot) -> Self {
        Self {
            departments: snapshot
                .departments
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
            years: snapshot.years.iter().map(|(k, v)| (*k, *v)).collect(),
            total_records: snapshot.total_records,
            batches: snapshot.batches,
        }
    }

    /// Fold one batch of valid records. Returns how many were counted.
    pub fn ingest<I>(&mut self, records: I) -> usize
    where
        I: IntoIterator<Item = IncidentRecord>,
    {
        let mut n = 0usize;
        for r in records {
            *self.years.entry(r.year()).or_insert(0) += 1;
            *self.departments.entry(r.department).or_insert(0) += 1;
            n += 1;
        }
        self.total_records += n as u64;
        self.batches += 1;
        n
    }

    pub fn department_count(&self, department: &str) -> u64 {
        self.departments.get(department).copied().unwrap_or(0)
    }

    pub fn year_count(&self, year: i32) -> u64 {
        self.years.get(&year).copied().unwrap_or(0)
    }

    /// Years ranked by count descending, earlier year first on ties.
    pub fn top_years(&self, n: usize) -> Vec<YearCount> {
        rank_years(self.years.iter().map(|(y, c)| (*y, *c)), n)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            departments: self
                .departments
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
            years: self.years.iter().map(|(k, v)| (*k, *v)).collect(),
            top_years: self.top_years(TOP_YEARS),
            total_records: self.total_records,
            batches: self.batches,
        }
    }
}

pub fn rank_years<I>(counts: I, n: usize) -> Vec<YearCount>
where
    I: IntoIterator<Item = (i32, u64)>,
{
    let mut all: Vec<YearCount> = counts
        .into_iter()
        .map(|(year, count)| YearCount { year, count })
        .collect();
    all.sort_by(|a, b| b.count.cmp(&a.count).then(a.year.cmp(&b.year)));
    all.truncate(n);
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn rec(dept: &str, year: i32) -> IncidentRecord {
        IncidentRecord {
            id: 1,
            title: "t".into(),
            description: "d".into(),
            department: dept.into(),
            date: NaiveDate::from_ymd_opt(year, 6, 15).unwrap(),
        }
    }

    #[test]
    fn counts_departments_exactly() {
        let mut e = AggregationEngine::new();
        e.ingest(
            ["Emergency", "Pediatrics", "Radiology", "Emergency", "Pediatrics"]
                .into_iter()
                .map(|d| rec(d, 2023)),
        );
        let snap = e.snapshot();
        let expected: BTreeMap<String, u64> = [
            ("Emergency".to_string(), 2),
            ("Pediatrics".to_string(), 2),
            ("Radiology".to_string(), 1),
        ]
        .into_iter()
        .collect();
        assert_eq!(snap.departments, expected);
    }

    #[test]
    fn department_match_is_case_sensitive() {
        let mut e = AggregationEngine::new();
        e.ingest(vec![rec("Radiology", 2023), rec("radiology", 2023)]);
        assert_eq!(e.department_count("Radiology"), 1);
        assert_eq!(e.department_count("radiology"), 1);
    }

    #[test]
    fn top_years_tie_goes_to_earlier_year() {
        let mut e = AggregationEngine::new();
        let mut batch = Vec::new();
        batch.extend((0..3).map(|_| rec("A", 2022)));
        batch.extend((0..5).map(|_| rec("A", 2024)));
        batch.extend((0..5).map(|_| rec("A", 2023)));
        e.ingest(batch);
        assert_eq!(
            e.snapshot().top_years,
            vec![
                YearCount { year: 2023, count: 5 },
                YearCount { year: 2024, count: 5 }
            ]
        );
    }

    #[test]
    fn top_years_with_fewer_than_two_years() {
        let mut e = AggregationEngine::new();
        assert!(e.top_years(TOP_YEARS).is_empty());
        e.ingest(vec![rec("A", 2021)]);
        assert_eq!(e.top_years(TOP_YEARS), vec![YearCount { year: 2021, count: 1 }]);
    }

    #[test]
    fn snapshot_is_idempotent_and_counts_never_drop() {
        let mut e = AggregationEngine::new();
        e.ingest(vec![rec("A", 2020), rec("B", 2021)]);
        let a = e.snapshot();
        assert_eq!(a, e.snapshot());

        e.ingest(Vec::new());
        let b = e.snapshot();
        assert_eq!(b.departments, a.departments);
        assert_eq!(b.batches, 2);

        e.ingest(vec![rec("A", 2020)]);
        let c = e.snapshot();
        for (k, v) in &a.departments {
            assert!(c.departments[k] >= *v);
        }
        assert_eq!(c.total_records, 3);
    }

    #[test]
    fn restore_round_trips_counts() {
        let mut e = AggregationEngine::new();
        e.ingest(vec![rec("A", 2020), rec("A", 2021), rec("B", 2021)]);
        let snap = e.snapshot();
        let restored = AggregationEngine::restore(&snap);
        assert_eq!(restored.snapshot(), snap);
    }
}
