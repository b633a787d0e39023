//! Ingestion adapters
//!
//! This module provides adapters that parse survey tables into the
//! already-typed [`InputRecord`]s the pipeline consumes.

mod delimited;
mod json;
mod spreadsheet;
mod table;

pub use delimited::CsvAdapter;
pub use json::{JsonAdapter, NdjsonAdapter};
pub use spreadsheet::XlsxAdapter;
pub use table::parse_decimal;

use crate::error::ProcessError;
use crate::types::{InputRecord, Property};
use std::path::Path;

/// Trait for input table adapters
pub trait RecordAdapter {
    /// Parse raw input and pick the value of `property` for every record
    fn parse(&self, raw: &str, property: Property) -> Result<Vec<InputRecord>, ProcessError>;

    /// Parse raw bytes; text adapters expect UTF-8
    fn parse_bytes(&self, raw: &[u8], property: Property) -> Result<Vec<InputRecord>, ProcessError> {
        let raw = std::str::from_utf8(raw).map_err(|e| ProcessError::ParseError(e.to_string()))?;
        self.parse(raw, property)
    }

    /// Read and parse a file
    fn parse_file(&self, path: &Path, property: Property) -> Result<Vec<InputRecord>, ProcessError> {
        let raw = std::fs::read(path)?;
        self.parse_bytes(&raw, property)
    }
}
