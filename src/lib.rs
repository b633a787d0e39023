//! BioDen - Grouping, normalization and representative selection for
//! benthic survey data
//!
//! BioDen turns per-sample survey records into comparable sample groups
//! through a deterministic pipeline: ingestion → grouping per ecotope →
//! normalization to a target surface → biodiversity → representative
//! selection → report emission.
//!
//! ## Modules
//!
//! - **Pipeline**: [`process_records`], [`run_pipeline`] and the reusable
//!   [`BiodenProcessor`] with progress reporting and cancellation
//! - **Adapters**: CSV, JSON, NDJSON and spreadsheet survey tables into
//!   [`InputRecord`]s
//! - **Export**: CSV, JSON or xlsx report files and the run manifest

pub mod adapters;
pub mod biodiversity;
pub mod config;
pub mod error;
pub mod export;
pub mod grouping;
pub mod manifest;
pub mod normalizer;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod selector;
pub mod store;
pub mod types;

pub use adapters::{CsvAdapter, JsonAdapter, NdjsonAdapter, RecordAdapter, XlsxAdapter};
pub use config::{ConfigFile, PipelineConfig, TrailingSamples};
pub use error::{ConfigError, ProcessError};
pub use export::{export_reports, OutputFormat};
pub use manifest::RunManifest;
pub use pipeline::{process_records, run_pipeline, BiodenProcessor, ProcessingRun, RunOutput};
pub use progress::{CancellationToken, NoProgress, ProgressObserver};
pub use report::{Cell, Report, ReportKind};
pub use types::{InputRecord, Property};

/// BioDen version recorded in every run manifest
pub const BIODEN_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for run manifests
pub const PRODUCER_NAME: &str = "bioden";
