//! JSON record adapters
//!
//! Records follow the core input contract directly: `value` already holds the
//! selected property.

use crate::error::ProcessError;
use crate::types::{InputRecord, Property};

use super::RecordAdapter;

/// JSON array of records
pub struct JsonAdapter;

impl RecordAdapter for JsonAdapter {
    fn parse(&self, raw: &str, _property: Property) -> Result<Vec<InputRecord>, ProcessError> {
        let records: Vec<InputRecord> = serde_json::from_str(raw)?;
        Ok(records)
    }
}

/// Newline-delimited JSON, one record per line
pub struct NdjsonAdapter;

impl RecordAdapter for NdjsonAdapter {
    fn parse(&self, raw: &str, _property: Property) -> Result<Vec<InputRecord>, ProcessError> {
        let mut records = Vec::new();
        for (line_num, line) in raw.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let record = serde_json::from_str::<InputRecord>(trimmed).map_err(|e| {
                ProcessError::ParseError(format!("line {}: {}", line_num + 1, e))
            })?;
            records.push(record);
        }
        Ok(records)
    }
}
