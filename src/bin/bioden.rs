//! BioDen CLI - Command-line interface for BioDen
//!
//! Commands:
//! - process: Group, normalize and export a survey table
//! - validate: Ingest a survey table and print a summary
//! - schema: Print the expected input columns

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bioden::adapters::{CsvAdapter, JsonAdapter, NdjsonAdapter, RecordAdapter, XlsxAdapter};
use bioden::config::{ConfigFile, DEFAULT_TARGET_SURFACE};
use bioden::export::{export_reports, OutputFormat};
use bioden::manifest::RunManifest;
use bioden::store::RecordStore;
use bioden::types::{InputRecord, Property};
use bioden::{BiodenProcessor, ConfigError, ProcessError, BIODEN_VERSION};

/// BioDen - Ecological survey grouping and normalization
#[derive(Parser)]
#[command(name = "bioden")]
#[command(author = "GiMaRIS")]
#[command(version = BIODEN_VERSION)]
#[command(about = "Group, normalize and select representative benthic samples", long_about = None)]
struct Cli {
    /// Log debug output to stderr
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Group, normalize and export a survey table
    Process {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Folder to write the result files to
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        table: TableArgs,

        /// Round values to this many decimal places
        #[arg(short, long, allow_negative_numbers = true)]
        round: Option<i64>,

        /// Target surface of a sample group [default: 0.2]
        #[arg(long)]
        target_surface: Option<f64>,

        /// Abort when an ecotope has samples that never reach the target surface
        #[arg(long)]
        strict: bool,

        /// Output format: csv, json or xlsx [default: csv]
        #[arg(long)]
        output_format: Option<OutputFormat>,

        /// Load settings from a TOML file; flags take precedence
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Ingest a survey table and print a summary
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        #[command(flatten)]
        table: TableArgs,

        /// Output the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the expected input columns
    Schema {
        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },
}

#[derive(clap::Args)]
struct TableArgs {
    /// Input format
    #[arg(long, default_value = "csv")]
    input_format: InputFormat,

    /// Field delimiter of a CSV input file [default: ;]
    #[arg(short, long)]
    delimiter: Option<char>,

    /// Quote character of a CSV input file [default: "]
    #[arg(short, long)]
    quotechar: Option<char>,

    /// Property to process: biomass or density [default: biomass]
    #[arg(short, long)]
    property: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum InputFormat {
    /// Delimited text with a header row
    Csv,
    /// JSON array of records
    Json,
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// First worksheet of an xlsx, xls or ods workbook
    Xlsx,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), BiodenCliError> {
    match cli.command {
        Commands::Process {
            input,
            output,
            table,
            round,
            target_surface,
            strict,
            output_format,
            config,
        } => {
            let file = match config {
                Some(path) => ConfigFile::load(&path)?,
                None => ConfigFile::default(),
            };
            let settings = Settings::resolve(file, table, round, target_surface, strict, output_format)?;
            cmd_process(&input, &output, &settings)
        }

        Commands::Validate { input, table, json } => {
            let settings = Settings::resolve(ConfigFile::default(), table, None, None, false, None)?;
            cmd_validate(&input, &settings, json)
        }

        Commands::Schema { json_schema } => cmd_schema(json_schema),
    }
}

/// Command-line flags merged over the optional config file
struct Settings {
    file: ConfigFile,
    input_format: InputFormat,
    output_format: OutputFormat,
}

impl Settings {
    fn resolve(
        mut file: ConfigFile,
        table: TableArgs,
        round: Option<i64>,
        target_surface: Option<f64>,
        strict: bool,
        output_format: Option<OutputFormat>,
    ) -> Result<Self, ConfigError> {
        if table.property.is_some() {
            file.property = table.property;
        }
        if table.delimiter.is_some() {
            file.delimiter = table.delimiter;
        }
        if table.quotechar.is_some() {
            file.quotechar = table.quotechar;
        }
        if round.is_some() {
            file.round_to = round;
        }
        if target_surface.is_some() {
            file.target_surface = target_surface;
        }
        if strict {
            file.strict = Some(true);
        }

        let output_format = match (output_format, file.output_format.as_deref()) {
            (Some(format), _) => format,
            (None, Some(name)) => name.parse()?,
            (None, None) => OutputFormat::default(),
        };

        Ok(Self {
            file,
            input_format: table.input_format,
            output_format,
        })
    }

    fn property(&self) -> Result<Property, ConfigError> {
        self.file.property.as_deref().unwrap_or("biomass").parse()
    }

    fn adapter(&self) -> Result<Box<dyn RecordAdapter>, BiodenCliError> {
        Ok(match self.input_format {
            InputFormat::Csv => Box::new(CsvAdapter::new(
                dialect_byte("delimiter", self.file.delimiter.unwrap_or(';'))?,
                dialect_byte("quotechar", self.file.quotechar.unwrap_or('"'))?,
            )),
            InputFormat::Json => Box::new(JsonAdapter),
            InputFormat::Ndjson => Box::new(NdjsonAdapter),
            InputFormat::Xlsx => Box::new(XlsxAdapter),
        })
    }
}

fn dialect_byte(name: &str, c: char) -> Result<u8, BiodenCliError> {
    u8::try_from(c)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| BiodenCliError::Dialect(format!("{} must be a single ASCII character, got '{}'", name, c)))
}

fn read_input(input: &Path) -> Result<Vec<u8>, BiodenCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = Vec::new();
        io::stdin().read_to_end(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read(input)?)
    }
}

fn load_records(input: &Path, settings: &Settings) -> Result<Vec<InputRecord>, BiodenCliError> {
    let property = settings.property()?;
    let raw = read_input(input)?;
    let records = settings.adapter()?.parse_bytes(&raw, property)?;
    if records.is_empty() {
        return Err(BiodenCliError::NoRecords);
    }
    Ok(records)
}

fn cmd_process(input: &Path, output: &Path, settings: &Settings) -> Result<(), BiodenCliError> {
    // Validate the configuration before touching the input
    let config = settings.file.into_config()?;
    if !output.is_dir() {
        return Err(BiodenCliError::OutputFolder(output.to_path_buf()));
    }

    let records = load_records(input, settings)?;

    let processor = BiodenProcessor::new(config)?.with_observer(|step: usize, total: usize, message: &str| {
        info!(step, total, "{}", message);
    });
    let output_data = processor.run(records)?;

    let writer = settings.output_format.writer();
    let files = export_reports(&output_data.reports, output, writer.as_ref())?;
    let manifest_path = RunManifest::new(&output_data.run, &files).write_to(output)?;

    info!(
        files = files.len(),
        manifest = %manifest_path.display(),
        "finished"
    );
    Ok(())
}

fn cmd_validate(input: &Path, settings: &Settings, json: bool) -> Result<(), BiodenCliError> {
    let records = load_records(input, settings)?;
    let record_count = records.len();
    let store = RecordStore::ingest(records)?;

    let report = ValidationReport {
        records: record_count,
        samples: store.sample_count(),
        ecotopes: store.ecotopes().to_vec(),
        taxa: store.taxa().len(),
        samples_per_ecotope: store
            .ecotopes()
            .iter()
            .map(|e| store.sample_codes(e).len())
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Records:  {}", report.records);
        println!("Samples:  {}", report.samples);
        println!("Taxa:     {}", report.taxa);
        println!("Ecotopes: {}", report.ecotopes.len());
        for (ecotope, samples) in report.ecotopes.iter().zip(&report.samples_per_ecotope) {
            println!("  - {} ({} samples)", ecotope, samples);
        }
    }

    Ok(())
}

fn cmd_schema(json_schema: bool) -> Result<(), BiodenCliError> {
    if json_schema {
        println!("{}", serde_json::to_string_pretty(&input_json_schema())?);
        return Ok(());
    }

    println!("Input columns (CSV or first worksheet, matched case-insensitively by substring):");
    println!();
    println!("- sample code         integer sample identifier");
    println!("- compiled ecotope    habitat class of the sample");
    println!("- standardised taxon  taxon name");
    for property in [Property::Biomass, Property::Density] {
        println!("- {:<19} value of the {} property", property.as_str(), property);
    }
    println!("- sample surface      sampled area; may be blank on some rows of a sample");
    println!();
    println!("Decimals may use a comma or a dot. Default delimiter ';', quote '\"'.");
    println!("Default target surface: {}", DEFAULT_TARGET_SURFACE);
    println!();
    println!("JSON/NDJSON records: sample_code, ecotope, taxon, value, sample_surface");
    Ok(())
}

fn input_json_schema() -> serde_json::Value {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "bioden.input_record",
        "type": "object",
        "required": ["sample_code", "ecotope", "taxon", "value"],
        "properties": {
            "sample_code": { "type": "integer" },
            "ecotope": { "type": "string" },
            "taxon": { "type": "string" },
            "value": { "type": "number" },
            "sample_surface": { "type": ["number", "null"] }
        }
    })
}

// Errors

#[derive(Debug)]
enum BiodenCliError {
    Io(io::Error),
    Config(ConfigError),
    Process(ProcessError),
    Json(serde_json::Error),
    Dialect(String),
    OutputFolder(PathBuf),
    NoRecords,
}

impl From<io::Error> for BiodenCliError {
    fn from(e: io::Error) -> Self {
        BiodenCliError::Io(e)
    }
}

impl From<ConfigError> for BiodenCliError {
    fn from(e: ConfigError) -> Self {
        BiodenCliError::Config(e)
    }
}

impl From<ProcessError> for BiodenCliError {
    fn from(e: ProcessError) -> Self {
        match e {
            ProcessError::Config(e) => BiodenCliError::Config(e),
            e => BiodenCliError::Process(e),
        }
    }
}

impl From<serde_json::Error> for BiodenCliError {
    fn from(e: serde_json::Error) -> Self {
        BiodenCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<BiodenCliError> for CliError {
    fn from(e: BiodenCliError) -> Self {
        match e {
            BiodenCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            BiodenCliError::Config(e) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'bioden process --help' for valid options".to_string()),
            },
            BiodenCliError::Process(e) => {
                let hint = match &e {
                    ProcessError::MissingColumn(_)
                    | ProcessError::MissingField(_)
                    | ProcessError::InvalidNumber { .. } => {
                        "Run 'bioden schema' for the expected columns"
                    }
                    ProcessError::MissingSurface(_) => "Every sample needs a sample surface",
                    ProcessError::Spreadsheet(_) => "Pass --input-format csv for delimited text",
                    ProcessError::IncompleteGroup { .. } => {
                        "Drop --strict to discard trailing samples instead"
                    }
                    _ => "Run 'bioden validate' for details",
                };
                CliError {
                    code: "PROCESS_ERROR".to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            BiodenCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            BiodenCliError::Dialect(msg) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: msg,
                hint: Some("Use a single ASCII character, e.g. -d ';'".to_string()),
            },
            BiodenCliError::OutputFolder(path) => CliError {
                code: "IO_ERROR".to_string(),
                message: format!("Output folder {} does not exist", path.display()),
                hint: Some("Create the folder first".to_string()),
            },
            BiodenCliError::NoRecords => CliError {
                code: "NO_RECORDS".to_string(),
                message: "No records found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    records: usize,
    samples: usize,
    ecotopes: Vec<String>,
    taxa: usize,
    samples_per_ecotope: Vec<usize>,
}
