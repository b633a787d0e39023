//! Error types for BioDen

use thiserror::Error;

/// Rejected configuration, raised before any data is touched
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Property can be either 'biomass' or 'density', not '{0}'")]
    UnknownProperty(String),

    #[error("Target sample surface must be a number > 0, got {0}")]
    InvalidTargetSurface(f64),

    #[error("Rounding must be an integer >= 0, got {0}")]
    NegativeRounding(i64),

    #[error("Unknown output format: {0}")]
    UnknownOutputFormat(String),

    #[error("Invalid configuration file: {0}")]
    InvalidConfigFile(String),
}

/// Errors that can occur while ingesting or processing a run
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("The data file is missing the '{0}' column")]
    MissingColumn(String),

    #[error("Invalid number '{value}' in field '{field}'")]
    InvalidNumber { field: String, value: String },

    #[error("Sample code {0} has observations but no sample surface")]
    MissingSurface(i64),

    #[error("Ecotope '{ecotope}' has {samples} trailing sample(s) that never reach the target surface")]
    IncompleteGroup { ecotope: String, samples: usize },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid spreadsheet: {0}")]
    Spreadsheet(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Processing was cancelled")]
    Cancelled,
}

impl ProcessError {
    /// Whether the error was raised by configuration validation
    pub fn is_config(&self) -> bool {
        matches!(self, ProcessError::Config(_))
    }
}
