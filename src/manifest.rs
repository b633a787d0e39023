//! Run manifest
//!
//! A JSON summary written next to the exported tables: which producer ran,
//! with which configuration, what every ecotope yielded and which files were
//! written.

use crate::config::PipelineConfig;
use crate::error::ProcessError;
use crate::pipeline::ProcessingRun;
use crate::types::{GroupId, SampleCode};
use crate::{BIODEN_VERSION, PRODUCER_NAME};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// File name of the manifest inside the output folder
pub const MANIFEST_FILE: &str = "bioden_manifest.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestProducer {
    pub name: String,
    pub version: String,
    pub run_id: String,
}

/// Per-ecotope outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcotopeSummary {
    pub ecotope: String,
    pub samples: usize,
    pub groups: usize,
    pub discarded_samples: Vec<SampleCode>,
    pub discarded_surface: f64,
    pub median_diversity: Option<f64>,
    pub representative_group: Option<GroupId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub producer: ManifestProducer,
    pub computed_at_utc: String,
    pub property: String,
    pub target_surface: f64,
    pub round_to: Option<u32>,
    pub strict: bool,
    pub ecotopes: Vec<EcotopeSummary>,
    pub files: Vec<String>,
}

impl RunManifest {
    /// Summarize a finished run and the files its reports were written to
    pub fn new(run: &ProcessingRun, files: &[PathBuf]) -> Self {
        let ecotopes = run
            .ecotopes
            .iter()
            .map(|result| EcotopeSummary {
                ecotope: result.ecotope.clone(),
                samples: result.sample_count,
                groups: result.groups.len(),
                discarded_samples: result.discarded.sample_codes.clone(),
                discarded_surface: result.discarded.surface,
                median_diversity: run.median_diversity(&result.ecotope),
                representative_group: run.representatives.get(&result.ecotope).copied(),
            })
            .collect();

        let files = files
            .iter()
            .filter_map(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect();

        Self::from_parts(&run.config, ecotopes, files)
    }

    fn from_parts(config: &PipelineConfig, ecotopes: Vec<EcotopeSummary>, files: Vec<String>) -> Self {
        Self {
            producer: ManifestProducer {
                name: PRODUCER_NAME.to_string(),
                version: BIODEN_VERSION.to_string(),
                run_id: Uuid::new_v4().to_string(),
            },
            computed_at_utc: Utc::now().to_rfc3339(),
            property: config.property.to_string(),
            target_surface: config.target_surface,
            round_to: config.round_to,
            strict: config.trailing.is_strict(),
            ecotopes,
            files,
        }
    }

    pub fn to_json(&self) -> Result<String, ProcessError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the manifest into `folder`
    pub fn write_to(&self, folder: &Path) -> Result<PathBuf, ProcessError> {
        let path = folder.join(MANIFEST_FILE);
        std::fs::write(&path, self.to_json()?)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::process_records;
    use crate::progress::NoProgress;
    use crate::types::InputRecord;
    use pretty_assertions::assert_eq;

    fn run() -> ProcessingRun {
        let config = PipelineConfig::new("density", 0.2, Some(2)).unwrap();
        let records = vec![
            InputRecord::new(1, "mud", "wormA", 5.0, 0.1),
            InputRecord::new(2, "mud", "wormA", 7.0, 0.15),
            InputRecord::new(3, "mud", "wormB", 1.0, 0.05),
            InputRecord::new(7, "salt marsh", "crab", 1.0, 0.1),
        ];
        process_records(records, &config, &NoProgress).unwrap()
    }

    #[test]
    fn test_summaries() {
        let manifest = RunManifest::new(&run(), &[PathBuf::from("/tmp/out/ambi_density_mud.csv")]);

        assert_eq!(manifest.producer.name, "bioden");
        assert_eq!(manifest.property, "density");
        assert_eq!(manifest.round_to, Some(2));
        assert!(!manifest.strict);
        assert_eq!(manifest.files, vec!["ambi_density_mud.csv".to_string()]);

        assert_eq!(
            manifest.ecotopes[0],
            EcotopeSummary {
                ecotope: "mud".to_string(),
                samples: 3,
                groups: 1,
                discarded_samples: vec![3],
                discarded_surface: 0.05,
                median_diversity: Some(1.0),
                representative_group: Some(1),
            }
        );
        assert_eq!(manifest.ecotopes[1].representative_group, None);
        assert_eq!(manifest.ecotopes[1].median_diversity, None);
    }

    #[test]
    fn test_run_ids_are_unique() {
        let run = run();
        let a = RunManifest::new(&run, &[]);
        let b = RunManifest::new(&run, &[]);
        assert_ne!(a.producer.run_id, b.producer.run_id);
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = RunManifest::new(&run(), &[]);
        let path = manifest.write_to(dir.path()).unwrap();

        assert_eq!(path, dir.path().join(MANIFEST_FILE));
        let parsed: RunManifest =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.producer, manifest.producer);
        assert_eq!(parsed.computed_at_utc, manifest.computed_at_utc);
        assert_eq!(parsed.ecotopes.len(), 2);
        assert_eq!(parsed.ecotopes[0].representative_group, Some(1));
    }
}
