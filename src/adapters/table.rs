//! Header-addressed tables
//!
//! Shared by the delimited and spreadsheet adapters: both hand over a header
//! row and then data rows of text cells.

use crate::error::ProcessError;
use crate::types::{InputRecord, Property, SampleCode};

pub(crate) const SAMPLE_CODE: &str = "sample code";
pub(crate) const ECOTOPE: &str = "compiled ecotope";
pub(crate) const TAXON: &str = "standardised taxon";
pub(crate) const SAMPLE_SURFACE: &str = "sample surface";

/// Resolved column indexes
pub(crate) struct Columns {
    sample_code: usize,
    ecotope: usize,
    taxon: usize,
    value: usize,
    sample_surface: usize,
    property: Property,
}

impl Columns {
    /// Locate every required column by a case-insensitive substring match
    pub(crate) fn resolve<S: AsRef<str>>(
        headers: &[S],
        property: Property,
    ) -> Result<Self, ProcessError> {
        Ok(Self {
            sample_code: find_column(headers, SAMPLE_CODE)?,
            ecotope: find_column(headers, ECOTOPE)?,
            taxon: find_column(headers, TAXON)?,
            value: find_column(headers, property.as_str())?,
            sample_surface: find_column(headers, SAMPLE_SURFACE)?,
            property,
        })
    }

    /// Build a record from one data row; `line` is 1-based, header included
    pub(crate) fn record<S: AsRef<str>>(
        &self,
        row: &[S],
        line: usize,
    ) -> Result<InputRecord, ProcessError> {
        let field = |column: usize, name: &str| {
            row.get(column)
                .map(AsRef::<str>::as_ref)
                .ok_or_else(|| ProcessError::MissingField(format!("{} (line {})", name, line)))
        };

        let sample_surface = match field(self.sample_surface, SAMPLE_SURFACE)?.trim() {
            "" => None,
            surface => Some(parse_decimal(SAMPLE_SURFACE, surface)?),
        };
        let property = self.property.as_str();

        Ok(InputRecord {
            sample_code: parse_sample_code(field(self.sample_code, SAMPLE_CODE)?)?,
            ecotope: field(self.ecotope, ECOTOPE)?.to_string(),
            taxon: field(self.taxon, TAXON)?.to_string(),
            value: parse_decimal(property, field(self.value, property)?)?,
            sample_surface,
        })
    }
}

fn find_column<S: AsRef<str>>(headers: &[S], name: &str) -> Result<usize, ProcessError> {
    headers
        .iter()
        .position(|header| header.as_ref().to_lowercase().contains(name))
        .ok_or_else(|| ProcessError::MissingColumn(name.to_string()))
}

/// Whether every cell of a row is blank
pub(crate) fn is_blank<S: AsRef<str>>(row: &[S]) -> bool {
    row.iter().all(|cell| cell.as_ref().trim().is_empty())
}

/// Parse a number that uses either a comma or a dot as decimal separator.
/// `NaN` and infinities are rejected.
pub fn parse_decimal(field: &str, value: &str) -> Result<f64, ProcessError> {
    value
        .trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| ProcessError::InvalidNumber {
            field: field.to_string(),
            value: value.to_string(),
        })
}

pub(crate) fn parse_sample_code(value: &str) -> Result<SampleCode, ProcessError> {
    value
        .trim()
        .parse::<SampleCode>()
        .map_err(|_| ProcessError::InvalidNumber {
            field: SAMPLE_CODE.to_string(),
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_match_by_substring() {
        let headers = ["SumOfBiomass", "Sample code (id)", "Compiled Ecotope", "Standardised taxon", "Sample surface m2"];
        let columns = Columns::resolve(&headers, Property::Biomass).unwrap();
        let record = columns
            .record(&["2,5", "7", "Mud", "wormA", "0,1"], 2)
            .unwrap();
        assert_eq!(record, InputRecord::new(7, "Mud", "wormA", 2.5, 0.1));
    }

    #[test]
    fn test_short_row_names_the_line() {
        let headers = ["sample code", "compiled ecotope", "standardised taxon", "density", "sample surface"];
        let columns = Columns::resolve(&headers, Property::Density).unwrap();
        let err = columns.record(&["1", "mud"], 4).unwrap_err();
        assert!(err.to_string().contains("line 4"));
    }

    #[test]
    fn test_blank_rows() {
        assert!(is_blank(&["", "  "]));
        assert!(!is_blank(&["", "x"]));
    }
}
