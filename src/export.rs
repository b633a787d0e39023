//! Report export
//!
//! Serializes emitted reports to files, one file per report, named after the
//! report kind, property and ecotope.

use crate::error::{ConfigError, ProcessError};
use crate::report::{Cell, Report, ReportKind, Row};
use csv::WriterBuilder;
use rust_xlsxwriter::{Workbook, XlsxError};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

/// Supported output formats
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
    Xlsx,
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            "xlsx" => Ok(OutputFormat::Xlsx),
            _ => Err(ConfigError::UnknownOutputFormat(s.to_string())),
        }
    }
}

impl OutputFormat {
    pub fn writer(&self) -> Box<dyn RowWriter> {
        match self {
            OutputFormat::Csv => Box::new(CsvRowWriter::default()),
            OutputFormat::Json => Box::new(JsonRowWriter { pretty: true }),
            OutputFormat::Xlsx => Box::new(XlsxRowWriter),
        }
    }
}

/// Trait for row serializers
pub trait RowWriter {
    fn extension(&self) -> &'static str;

    fn write_rows(&self, out: &mut dyn Write, rows: &[Row]) -> Result<(), ProcessError>;
}

/// Comma separated output, empty cells as blank fields
#[derive(Debug, Clone, Copy)]
pub struct CsvRowWriter {
    pub delimiter: u8,
}

impl Default for CsvRowWriter {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl RowWriter for CsvRowWriter {
    fn extension(&self) -> &'static str {
        "csv"
    }

    fn write_rows(&self, out: &mut dyn Write, rows: &[Row]) -> Result<(), ProcessError> {
        let mut writer = WriterBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .from_writer(out);
        for row in rows {
            writer.write_record(row.iter().map(|cell| cell.to_string()))?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// JSON array of row arrays
#[derive(Debug, Clone, Copy)]
pub struct JsonRowWriter {
    pub pretty: bool,
}

impl RowWriter for JsonRowWriter {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn write_rows(&self, out: &mut dyn Write, rows: &[Row]) -> Result<(), ProcessError> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut *out, rows)?;
        } else {
            serde_json::to_writer(&mut *out, rows)?;
        }
        out.write_all(b"\n")?;
        Ok(())
    }
}

/// Columns available on one xlsx worksheet
pub const XLSX_MAX_COLUMNS: usize = 16_384;

/// Single-sheet xlsx workbook; rows wider than the sheet are truncated
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxRowWriter;

impl RowWriter for XlsxRowWriter {
    fn extension(&self) -> &'static str {
        "xlsx"
    }

    fn write_rows(&self, out: &mut dyn Write, rows: &[Row]) -> Result<(), ProcessError> {
        let widest = rows.iter().map(Vec::len).max().unwrap_or(0);
        if widest > XLSX_MAX_COLUMNS {
            warn!(
                columns = widest,
                limit = XLSX_MAX_COLUMNS,
                "rows are wider than an xlsx worksheet, extra columns are dropped"
            );
        }

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (row_index, row) in rows.iter().enumerate() {
            let row_num = u32::try_from(row_index).map_err(|_| {
                ProcessError::Spreadsheet(format!("row {} is beyond the worksheet", row_index + 1))
            })?;
            for (col, cell) in row.iter().take(XLSX_MAX_COLUMNS).enumerate() {
                // bounded by XLSX_MAX_COLUMNS
                let col = col as u16;
                match cell {
                    Cell::Text(text) => sheet.write_string(row_num, col, text).map(|_| ()),
                    Cell::Integer(i) => sheet.write_number(row_num, col, *i as f64).map(|_| ()),
                    Cell::Number(n) => sheet.write_number(row_num, col, *n).map(|_| ()),
                    Cell::Empty => Ok(()),
                }
                .map_err(spreadsheet_error)?;
            }
        }

        let buffer = workbook.save_to_buffer().map_err(spreadsheet_error)?;
        out.write_all(&buffer)?;
        Ok(())
    }
}

fn spreadsheet_error(err: XlsxError) -> ProcessError {
    ProcessError::Spreadsheet(err.to_string())
}

/// File name without extension, e.g. `ambi_biomass_salt_marsh`
pub fn file_stem(report: &Report) -> String {
    let prefix = match report.kind {
        ReportKind::RawSamples => "raw",
        ReportKind::RawGroups => "grouped",
        ReportKind::NormalizedGroups => "ambi",
        ReportKind::Representatives => "representatives",
    };
    match &report.ecotope {
        Some(ecotope) => format!(
            "{}_{}_{}",
            prefix,
            report.property,
            ecotope.replace([' ', '/', '\\'], "_")
        ),
        None => format!("{}_{}", prefix, report.property),
    }
}

/// Write every report into `folder`, returning the written paths in order
pub fn export_reports(
    reports: &[Report],
    folder: &Path,
    writer: &dyn RowWriter,
) -> Result<Vec<PathBuf>, ProcessError> {
    if !folder.is_dir() {
        return Err(ProcessError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("output folder {} does not exist", folder.display()),
        )));
    }

    let mut paths = Vec::with_capacity(reports.len());
    for report in reports {
        let path = folder.join(format!("{}.{}", file_stem(report), writer.extension()));
        let mut out = BufWriter::new(File::create(&path)?);
        writer.write_rows(&mut out, &report.rows)?;
        out.flush()?;
        info!(path = %path.display(), "saved report");
        paths.push(path);
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Property;
    use calamine::{open_workbook, Data, Reader, Xlsx};
    use pretty_assertions::assert_eq;

    fn report(kind: ReportKind, ecotope: Option<&str>) -> Report {
        Report {
            kind,
            ecotope: ecotope.map(str::to_string),
            property: Property::Biomass,
            rows: vec![
                vec![Cell::from("Ecotope:"), Cell::from("salt marsh")],
                vec![Cell::Empty],
                vec![Cell::from("worm, red"), Cell::Number(9.6), Cell::Empty, Cell::Integer(3)],
            ],
        }
    }

    #[test]
    fn test_file_stems() {
        assert_eq!(
            file_stem(&report(ReportKind::RawSamples, Some("salt marsh"))),
            "raw_biomass_salt_marsh"
        );
        assert_eq!(file_stem(&report(ReportKind::RawGroups, Some("mud"))), "grouped_biomass_mud");
        assert_eq!(
            file_stem(&report(ReportKind::NormalizedGroups, Some("mud"))),
            "ambi_biomass_mud"
        );
        assert_eq!(
            file_stem(&report(ReportKind::Representatives, None)),
            "representatives_biomass"
        );
    }

    #[test]
    fn test_path_separators_in_ecotope_names() {
        assert_eq!(
            file_stem(&report(ReportKind::RawGroups, Some("sand/mud flat"))),
            "grouped_biomass_sand_mud_flat"
        );
        assert_eq!(
            file_stem(&report(ReportKind::RawSamples, Some("rock\\pool"))),
            "raw_biomass_rock_pool"
        );

        let dir = tempfile::tempdir().unwrap();
        let paths = export_reports(
            &[report(ReportKind::NormalizedGroups, Some("sand/mud"))],
            dir.path(),
            &CsvRowWriter::default(),
        )
        .unwrap();
        assert_eq!(paths, vec![dir.path().join("ambi_biomass_sand_mud.csv")]);
    }

    #[test]
    fn test_csv_rows() {
        let mut out = Vec::new();
        CsvRowWriter::default()
            .write_rows(&mut out, &report(ReportKind::RawGroups, Some("mud")).rows)
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Ecotope:,salt marsh\n\"\"\n\"worm, red\",9.6,,3\n"
        );
    }

    #[test]
    fn test_json_rows() {
        let mut out = Vec::new();
        JsonRowWriter { pretty: false }
            .write_rows(&mut out, &report(ReportKind::RawGroups, Some("mud")).rows)
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "[[\"Ecotope:\",\"salt marsh\"],[\"\"],[\"worm, red\",9.6,\"\",3]]\n"
        );
    }

    #[test]
    fn test_export_reports() {
        let dir = tempfile::tempdir().unwrap();
        let reports = vec![
            report(ReportKind::NormalizedGroups, Some("salt marsh")),
            report(ReportKind::Representatives, None),
        ];
        let paths = export_reports(&reports, dir.path(), OutputFormat::Csv.writer().as_ref()).unwrap();

        assert_eq!(
            paths,
            vec![
                dir.path().join("ambi_biomass_salt_marsh.csv"),
                dir.path().join("representatives_biomass.csv"),
            ]
        );
        assert!(paths.iter().all(|p| p.exists()));
    }

    #[test]
    fn test_export_requires_existing_folder() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let result = export_reports(&[], &missing, &CsvRowWriter::default());
        assert!(matches!(result, Err(ProcessError::Io(_))));
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("xlsx".parse::<OutputFormat>().unwrap(), OutputFormat::Xlsx);
        assert!("xls".parse::<OutputFormat>().is_err());
    }

    fn read_sheet(path: &Path) -> Vec<Vec<Data>> {
        let mut workbook: Xlsx<_> = open_workbook(path).unwrap();
        let range = workbook.worksheet_range_at(0).unwrap().unwrap();
        range.rows().map(<[Data]>::to_vec).collect()
    }

    #[test]
    fn test_xlsx_rows() {
        let dir = tempfile::tempdir().unwrap();
        let paths = export_reports(
            &[report(ReportKind::RawGroups, Some("mud"))],
            dir.path(),
            OutputFormat::Xlsx.writer().as_ref(),
        )
        .unwrap();
        assert_eq!(paths, vec![dir.path().join("grouped_biomass_mud.xlsx")]);

        let rows = read_sheet(&paths[0]);
        assert_eq!(
            rows,
            vec![
                vec![
                    Data::String("Ecotope:".to_string()),
                    Data::String("salt marsh".to_string()),
                    Data::Empty,
                    Data::Empty,
                ],
                vec![Data::Empty; 4],
                vec![
                    Data::String("worm, red".to_string()),
                    Data::Float(9.6),
                    Data::Empty,
                    Data::Float(3.0),
                ],
            ]
        );
    }

    #[test]
    fn test_xlsx_truncates_wide_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.xlsx");
        let wide: Row = (0..XLSX_MAX_COLUMNS + 10).map(|i| Cell::Integer(i as i64)).collect();

        let mut out = File::create(&path).unwrap();
        XlsxRowWriter.write_rows(&mut out, &[wide]).unwrap();
        drop(out);

        let rows = read_sheet(&path);
        assert_eq!(rows[0].len(), XLSX_MAX_COLUMNS);
        assert_eq!(rows[0][XLSX_MAX_COLUMNS - 1], Data::Float((XLSX_MAX_COLUMNS - 1) as f64));
    }
}
