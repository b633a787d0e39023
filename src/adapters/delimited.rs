//! Delimited text (CSV) adapter
//!
//! Columns are located by a case-insensitive substring match on the header, so
//! "Sample code", "SAMPLE CODE (id)" and "sample code" all resolve to the same
//! field. Decimal numbers may use a comma or a dot.

use crate::error::ProcessError;
use crate::types::{InputRecord, Property};
use csv::ReaderBuilder;

use super::table::{is_blank, Columns};
use super::RecordAdapter;

/// CSV adapter with a configurable dialect
#[derive(Debug, Clone, Copy)]
pub struct CsvAdapter {
    pub delimiter: u8,
    pub quote: u8,
}

impl Default for CsvAdapter {
    fn default() -> Self {
        Self {
            delimiter: b';',
            quote: b'"',
        }
    }
}

impl CsvAdapter {
    pub fn new(delimiter: u8, quote: u8) -> Self {
        Self { delimiter, quote }
    }
}

impl RecordAdapter for CsvAdapter {
    fn parse(&self, raw: &str, property: Property) -> Result<Vec<InputRecord>, ProcessError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .quote(self.quote)
            .has_headers(true)
            .flexible(true)
            .from_reader(raw.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let columns = Columns::resolve(&headers, property)?;

        let mut records = Vec::new();
        for (index, row) in reader.records().enumerate() {
            let row = row?;
            let fields: Vec<&str> = row.iter().collect();
            if is_blank(&fields) {
                continue;
            }
            // header is line 1
            records.push(columns.record(&fields, index + 2)?);
        }

        Ok(records)
    }
}
