//! Pipeline configuration
//!
//! Validated once, before any data is ingested. A configuration can be built
//! programmatically or loaded from a TOML file.

use crate::error::ConfigError;
use crate::types::Property;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default target surface for a sample group
pub const DEFAULT_TARGET_SURFACE: f64 = 0.2;

/// What to do with samples left after the last group of an ecotope closed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrailingSamples {
    /// Drop them silently (logged at warn level)
    #[default]
    Discard,
    /// Abort the run
    Reject,
}

impl TrailingSamples {
    pub fn is_strict(&self) -> bool {
        matches!(self, TrailingSamples::Reject)
    }
}

/// Validated configuration consumed by the pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineConfig {
    pub property: Property,
    pub target_surface: f64,
    /// Decimal places for emitted values; computation is never rounded
    pub round_to: Option<u32>,
    pub trailing: TrailingSamples,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            property: Property::Biomass,
            target_surface: DEFAULT_TARGET_SURFACE,
            round_to: None,
            trailing: TrailingSamples::Discard,
        }
    }
}

impl PipelineConfig {
    /// Build and validate a configuration
    pub fn new(
        property: &str,
        target_surface: f64,
        round_to: Option<i64>,
    ) -> Result<Self, ConfigError> {
        let property = property.parse::<Property>()?;
        let config = Self {
            property,
            target_surface,
            round_to: validate_round_to(round_to)?,
            trailing: TrailingSamples::Discard,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_trailing(mut self, trailing: TrailingSamples) -> Self {
        self.trailing = trailing;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.target_surface.is_finite() || self.target_surface <= 0.0 {
            return Err(ConfigError::InvalidTargetSurface(self.target_surface));
        }
        Ok(())
    }
}

fn validate_round_to(round_to: Option<i64>) -> Result<Option<u32>, ConfigError> {
    match round_to {
        None => Ok(None),
        Some(n) => u32::try_from(n)
            .map(Some)
            .map_err(|_| ConfigError::NegativeRounding(n)),
    }
}

/// On-disk configuration; every key is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub property: Option<String>,
    pub target_surface: Option<f64>,
    pub round_to: Option<i64>,
    pub strict: Option<bool>,
    pub delimiter: Option<char>,
    pub quotechar: Option<char>,
    pub output_format: Option<String>,
}

impl ConfigFile {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::InvalidConfigFile(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::InvalidConfigFile(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&content)
    }

    /// Resolve into a validated pipeline configuration
    pub fn into_config(&self) -> Result<PipelineConfig, ConfigError> {
        let trailing = if self.strict.unwrap_or(false) {
            TrailingSamples::Reject
        } else {
            TrailingSamples::Discard
        };
        PipelineConfig::new(
            self.property.as_deref().unwrap_or("biomass"),
            self.target_surface.unwrap_or(DEFAULT_TARGET_SURFACE),
            self.round_to,
        )
        .map(|config| config.with_trailing(trailing))
    }
}
