use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::key::{Key, KeyScheme};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

pub const COL_EVENT: &str = "event";
pub const COL_RUN: &str = "run";
pub const COL_BEAM: &str = "beam_beamid";
pub const COL_CHI_SQUARE: &str = "kin_chisq";
pub const COL_NDF: &str = "kin_ndf";

/// Columns every dataset source must provide, in canonical order.
pub const REQUIRED_COLUMNS: [&str; 5] = [COL_EVENT, COL_RUN, COL_BEAM, COL_CHI_SQUARE, COL_NDF];

/// One kinematic-fit candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Record {
    pub event_id: u64,
    pub run_id: u32,
    pub beam_id: u32,
    pub chi_square: f32,
    pub ndf: u32,
}

impl Record {
    pub fn new(event_id: u64, run_id: u32, beam_id: u32, chi_square: f32, ndf: u32) -> Self {
        Self { event_id, run_id, beam_id, chi_square, ndf }
    }
}

/// A loaded row: the typed record plus every raw field of the source row.
#[derive(Debug, Clone)]
pub struct DatasetRow {
    pub record: Record,
    pub fields: Vec<String>,
}

/// Rows of one hypothesis, in source order. Read-only after loading.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<DatasetRow>,
}

impl Dataset {
    /// Build a dataset carrying only the required columns.
    pub fn from_records(name: impl Into<String>, records: impl IntoIterator<Item = Record>) -> Self {
        let rows = records
            .into_iter()
            .map(|r| DatasetRow {
                fields: vec![
                    r.event_id.to_string(),
                    r.run_id.to_string(),
                    r.beam_id.to_string(),
                    r.chi_square.to_string(),
                    r.ndf.to_string(),
                ],
                record: r,
            })
            .collect();

        Self {
            name: name.into(),
            columns: REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> + '_ {
        self.rows.iter().map(|r| &r.record)
    }
}

// ---------------------------------------------------------------------------
// Reduction
// ---------------------------------------------------------------------------

/// Minimal-chi-square record per key of one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct BestCandidateTable {
    pub(crate) scheme: KeyScheme,
    pub(crate) entries: BTreeMap<Key, Record>,
}

impl BestCandidateTable {
    pub fn scheme(&self) -> KeyScheme {
        self.scheme
    }

    pub fn get(&self, key: &Key) -> Option<&Record> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Record)> + '_ {
        self.entries.iter()
    }

    /// The best candidates as a dataset, in key order.
    pub fn to_dataset(&self, name: impl Into<String>) -> Dataset {
        Dataset::from_records(name, self.entries.values().copied())
    }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// One accepted match, rendered as a line of the match log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchLogEntry {
    pub event_id: u64,
    pub primary_run: u32,
    pub secondary_run: u32,
    pub primary_beam: u32,
    pub secondary_beam: u32,
}

impl fmt::Display for MatchLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Event ID: {} found in both trees. Run IDs: {},{} Beam IDs: {},{}",
            self.event_id, self.primary_run, self.secondary_run, self.primary_beam, self.secondary_beam,
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatchStats {
    /// Accepted matches.
    pub matches: usize,
    /// Key present in both tables but run ids differ.
    pub run_mismatches: usize,
    /// Primary key absent from the secondary table.
    pub absent: usize,
    /// Key found with equal runs but the secondary candidate has `ndf == 0`.
    pub zero_ndf: usize,
}

/// Quality of a secondary's best candidate per accepted primary key.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub table: String,
    pub scheme: KeyScheme,
    pub qualities: BTreeMap<Key, f32>,
    pub stats: MatchStats,
    /// Accepted matches in primary-key order. Empty unless logging was requested.
    pub log: Vec<MatchLogEntry>,
}

impl MatchResult {
    pub fn quality(&self, key: &Key) -> Option<f32> {
        self.qualities.get(key).copied()
    }
}

// ---------------------------------------------------------------------------
// Augmentation
// ---------------------------------------------------------------------------

/// A retained primary row plus one quality value per secondary.
#[derive(Debug, Clone)]
pub struct AugmentedRow<'a> {
    pub source: &'a DatasetRow,
    pub qualities: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct AugmentedTable<'a> {
    /// Primary columns followed by the appended quality columns.
    pub columns: Vec<String>,
    pub rows: Vec<AugmentedRow<'a>>,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct CompareMeta {
    pub engine_version: String,
    pub run_at: String,
    pub scheme: KeyScheme,
    pub preserve_combos: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub table: String,
    pub rows: usize,
    pub best_candidates: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SecondarySummary {
    pub table: String,
    pub rows: usize,
    pub best_candidates: usize,
    pub column: String,
    #[serde(flatten)]
    pub stats: MatchStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompareSummary {
    pub meta: CompareMeta,
    pub primary: DatasetSummary,
    pub secondaries: Vec<SecondarySummary>,
    pub total_matches: usize,
    pub output_rows: usize,
    pub output_columns: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_records_synthesizes_required_columns() {
        let ds = Dataset::from_records("h1", [Record::new(1, 10, 2, 3.5, 4)]);
        assert_eq!(ds.columns, REQUIRED_COLUMNS);
        assert_eq!(ds.rows[0].fields, vec!["1", "10", "2", "3.5", "4"]);
        assert_eq!(ds.len(), 1);
    }

    #[test]
    fn log_line_format() {
        let entry = MatchLogEntry {
            event_id: 42,
            primary_run: 30274,
            secondary_run: 30274,
            primary_beam: 3,
            secondary_beam: 5,
        };
        assert_eq!(
            entry.to_string(),
            "Event ID: 42 found in both trees. Run IDs: 30274,30274 Beam IDs: 3,5"
        );
    }
}
