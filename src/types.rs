//! Core types for the BioDen pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: ingested records, sample groups, biodiversity records and the
//! per-ecotope processing results.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Sample codes are integers in the survey data
pub type SampleCode = i64;

/// Group ids are sequential and 1-based within one ecotope
pub type GroupId = u32;

/// Observation field that feeds the grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Property {
    Biomass,
    Density,
}

impl Property {
    pub fn as_str(&self) -> &'static str {
        match self {
            Property::Biomass => "biomass",
            Property::Density => "density",
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Property {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "biomass" => Ok(Property::Biomass),
            "density" => Ok(Property::Density),
            _ => Err(ConfigError::UnknownProperty(s.to_string())),
        }
    }
}

/// One already-parsed input row handed over by an ingestion adapter.
///
/// `value` holds the selected property. `sample_surface` may be absent on some
/// rows as long as another row of the same sample carries it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputRecord {
    pub sample_code: SampleCode,
    pub ecotope: String,
    pub taxon: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_surface: Option<f64>,
}

impl InputRecord {
    pub fn new(
        sample_code: SampleCode,
        ecotope: impl Into<String>,
        taxon: impl Into<String>,
        value: f64,
        sample_surface: f64,
    ) -> Self {
        Self {
            sample_code,
            ecotope: ecotope.into(),
            taxon: taxon.into(),
            value,
            sample_surface: Some(sample_surface),
        }
    }
}

/// Normalized observation as held by the record store
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub sample_code: SampleCode,
    pub ecotope: String,
    pub taxon: String,
    pub value: f64,
}

/// Pool of consecutive samples within one ecotope
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    /// Sequential id, starting at 1 per ecotope
    pub id: GroupId,
    /// Sum of the surfaces of the samples in this group
    pub surface: f64,
    /// Summed value per taxon
    pub sums: BTreeMap<String, f64>,
    /// Sample codes folded into this group, in encounter order
    pub sample_codes: Vec<SampleCode>,
}

impl Group {
    pub fn sum_of(&self, taxon: &str) -> Option<f64> {
        self.sums.get(taxon).copied()
    }
}

/// Samples left over after the last group closed
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrailingRemainder {
    pub sample_codes: Vec<SampleCode>,
    pub surface: f64,
}

impl TrailingRemainder {
    pub fn is_empty(&self) -> bool {
        self.sample_codes.is_empty()
    }
}

/// Diversity of one group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BiodiversityRecord {
    pub group_id: GroupId,
    pub diversity: usize,
}

/// Everything derived for one ecotope before representative selection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EcotopeResult {
    pub ecotope: String,
    /// Raw groups, ascending group id
    pub groups: Vec<Group>,
    /// Groups rescaled to the target surface, same ids as `groups`
    pub normalized: Vec<Group>,
    /// One record per raw group, same order as `groups`
    pub biodiversity: Vec<BiodiversityRecord>,
    pub discarded: TrailingRemainder,
    pub sample_count: usize,
}

impl EcotopeResult {
    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn normalized_group(&self, id: GroupId) -> Option<&Group> {
        self.normalized.iter().find(|g| g.id == id)
    }

    pub fn diversity(&self, id: GroupId) -> Option<usize> {
        self.biodiversity
            .iter()
            .find(|r| r.group_id == id)
            .map(|r| r.diversity)
    }
}
