//! Spreadsheet adapter
//!
//! Reads the first worksheet of an `.xlsx`, `.xls` or `.ods` workbook. The
//! first used row is the header, matched the same way as CSV headers. Numeric
//! cells are taken as they are, text cells may still use a decimal comma.

use crate::error::ProcessError;
use crate::types::{InputRecord, Property};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::io::Cursor;
use tracing::debug;

use super::table::{is_blank, Columns};
use super::RecordAdapter;

/// Workbook adapter, first worksheet only
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxAdapter;

impl RecordAdapter for XlsxAdapter {
    fn parse(&self, raw: &str, property: Property) -> Result<Vec<InputRecord>, ProcessError> {
        self.parse_bytes(raw.as_bytes(), property)
    }

    fn parse_bytes(&self, raw: &[u8], property: Property) -> Result<Vec<InputRecord>, ProcessError> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(raw))
            .map_err(|e| ProcessError::Spreadsheet(e.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| ProcessError::Spreadsheet("workbook has no worksheets".to_string()))?
            .map_err(|e| ProcessError::Spreadsheet(e.to_string()))?;

        // rows are numbered from the top of the sheet, not the used range
        let first_row = range.start().map_or(0, |(row, _)| row as usize);
        let mut rows = range.rows().map(|row| row.iter().map(cell_text).collect::<Vec<_>>());

        let headers = rows.next().unwrap_or_default();
        let columns = Columns::resolve(&headers, property)?;

        let mut records = Vec::new();
        for (index, row) in rows.enumerate() {
            if is_blank(&row) {
                continue;
            }
            records.push(columns.record(&row, first_row + index + 2)?);
        }

        debug!(records = records.len(), "parsed worksheet");
        Ok(records)
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        other => other.to_string(),
    }
}
