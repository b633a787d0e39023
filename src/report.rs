//! Report emission
//!
//! Builds the row sequences handed to the export collaborators: the raw
//! per-sample table, the raw and normalized grouped tables (one of each per
//! ecotope) and the representative table across all ecotopes.
//!
//! Rounding is applied here, when cells are emitted, to taxon values and
//! surfaces alike. Stored sums and surfaces stay exact.

use crate::pipeline::ProcessingRun;
use crate::types::{Group, Property};
use serde::{Serialize, Serializer};
use std::fmt;

/// A single table cell
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Integer(i64),
    Number(f64),
    /// Rendered as a blank field
    Empty,
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => f.write_str(s),
            Cell::Integer(i) => write!(f, "{}", i),
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Empty => Ok(()),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Text(s) => serializer.serialize_str(s),
            Cell::Integer(i) => serializer.serialize_i64(*i),
            Cell::Number(n) => serializer.serialize_f64(*n),
            Cell::Empty => serializer.serialize_str(""),
        }
    }
}

impl From<&str> for Cell {
    fn from(v: &str) -> Self {
        Cell::Text(v.to_string())
    }
}

impl From<String> for Cell {
    fn from(v: String) -> Self {
        Cell::Text(v)
    }
}

impl From<i64> for Cell {
    fn from(v: i64) -> Self {
        Cell::Integer(v)
    }
}

impl From<u32> for Cell {
    fn from(v: u32) -> Self {
        Cell::Integer(i64::from(v))
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Number(v)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(v: Option<T>) -> Self {
        v.map_or(Cell::Empty, Into::into)
    }
}

pub type Row = Vec<Cell>;

/// Which group table a grouped report is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupSource {
    Raw,
    Normalized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    RawSamples,
    RawGroups,
    NormalizedGroups,
    Representatives,
}

impl From<GroupSource> for ReportKind {
    fn from(source: GroupSource) -> Self {
        match source {
            GroupSource::Raw => ReportKind::RawGroups,
            GroupSource::Normalized => ReportKind::NormalizedGroups,
        }
    }
}

/// One emitted table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub kind: ReportKind,
    /// `None` for the representative table
    pub ecotope: Option<String>,
    pub property: Property,
    pub rows: Vec<Row>,
}

/// Round to `decimals` places, half away from zero
pub fn round_value(value: f64, decimals: u32) -> f64 {
    if decimals > 15 {
        return value;
    }
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Builds report rows from a finished run
pub struct ReportEmitter<'a> {
    run: &'a ProcessingRun,
}

impl<'a> ReportEmitter<'a> {
    pub fn new(run: &'a ProcessingRun) -> Self {
        Self { run }
    }

    fn value_cell(&self, value: Option<f64>) -> Cell {
        match (value, self.run.config.round_to) {
            (Some(v), Some(decimals)) => Cell::Number(round_value(v, decimals)),
            (Some(v), None) => Cell::Number(v),
            (None, _) => Cell::Empty,
        }
    }

    fn property_row(&self) -> Row {
        vec!["Property:".into(), self.run.config.property.as_str().into()]
    }

    /// Per-sample values of one ecotope
    pub fn raw_table(&self, ecotope: &str) -> Report {
        let store = &self.run.store;
        let sample_codes = store.sample_codes(ecotope);

        let mut rows = vec![
            self.property_row(),
            vec!["Ecotope:".into(), ecotope.into()],
        ];

        let mut row: Row = vec!["Sample code:".into()];
        row.extend(sample_codes.iter().map(|&code| Cell::from(code)));
        rows.push(row);

        let mut row: Row = vec!["Sample surface:".into()];
        row.extend(
            sample_codes
                .iter()
                .map(|&code| self.value_cell(store.sample_surface(code))),
        );
        rows.push(row);

        rows.push(vec![Cell::Empty]);

        for taxon in store.taxa() {
            let mut row: Row = vec![taxon.as_str().into()];
            row.extend(
                sample_codes
                    .iter()
                    .map(|&code| self.value_cell(store.sample_value(ecotope, code, taxon))),
            );
            rows.push(row);
        }

        Report {
            kind: ReportKind::RawSamples,
            ecotope: Some(ecotope.to_string()),
            property: self.run.config.property,
            rows,
        }
    }

    /// Raw or normalized groups of one ecotope
    pub fn grouped_table(&self, ecotope: &str, source: GroupSource) -> Report {
        let groups: &[Group] = match (self.run.ecotope(ecotope), source) {
            (Some(result), GroupSource::Raw) => &result.groups,
            (Some(result), GroupSource::Normalized) => &result.normalized,
            (None, _) => &[],
        };

        let mut rows = vec![
            self.property_row(),
            vec!["Ecotope:".into(), ecotope.into()],
        ];

        let mut row: Row = vec!["Sample group:".into()];
        row.extend(groups.iter().map(|g| Cell::from(g.id)));
        rows.push(row);

        let mut row: Row = vec!["Group surface:".into()];
        row.extend(groups.iter().map(|g| self.value_cell(Some(g.surface))));
        rows.push(row);

        rows.push(vec![Cell::Empty]);

        for taxon in self.run.store.taxa() {
            let mut row: Row = vec![taxon.as_str().into()];
            row.extend(groups.iter().map(|g| self.value_cell(g.sum_of(taxon))));
            rows.push(row);
        }

        Report {
            kind: source.into(),
            ecotope: Some(ecotope.to_string()),
            property: self.run.config.property,
            rows,
        }
    }

    /// Representative normalized group of every ecotope, one column each
    pub fn representative_table(&self) -> Report {
        let ecotopes = self.run.store.ecotopes();
        let representatives: Vec<Option<&Group>> = ecotopes
            .iter()
            .map(|ecotope| self.run.representative(ecotope))
            .collect();

        let mut rows = vec![self.property_row()];

        let mut row: Row = vec!["Ecotope:".into()];
        row.extend(ecotopes.iter().map(|e| Cell::from(e.as_str())));
        rows.push(row);

        let mut row: Row = vec!["Group surface:".into()];
        row.extend(
            representatives
                .iter()
                .map(|g| self.value_cell(g.map(|g| g.surface))),
        );
        rows.push(row);

        rows.push(vec![Cell::Empty]);

        for taxon in self.run.store.taxa() {
            let mut row: Row = vec![taxon.as_str().into()];
            row.extend(
                representatives
                    .iter()
                    .map(|g| self.value_cell(g.and_then(|g| g.sum_of(taxon)))),
            );
            rows.push(row);
        }

        Report {
            kind: ReportKind::Representatives,
            ecotope: None,
            property: self.run.config.property,
            rows,
        }
    }
}
