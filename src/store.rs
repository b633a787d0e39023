//! Record store
//!
//! Holds the ingested observations and sample surfaces. Ecotope and taxon
//! names are lower-cased on the way in, and both lists keep first-seen order,
//! which is the order every report iterates them in.

use crate::error::ProcessError;
use crate::types::{InputRecord, Observation, SampleCode};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, warn};

/// One sample of an ecotope together with all of its observations.
///
/// A sample code recorded under several ecotopes carries the observations of
/// every one of them.
#[derive(Debug, Clone)]
pub struct SampleView<'a> {
    pub code: SampleCode,
    pub surface: f64,
    pub observations: Vec<&'a Observation>,
}

/// In-memory store of normalized input rows
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    surfaces: BTreeMap<SampleCode, f64>,
    observations: Vec<Observation>,
    ecotopes: Vec<String>,
    taxa: Vec<String>,
    /// ecotope -> sample code -> indexes into `observations`
    by_ecotope: HashMap<String, BTreeMap<SampleCode, Vec<usize>>>,
    /// sample code -> indexes into `observations`, across ecotopes
    by_sample: BTreeMap<SampleCode, Vec<usize>>,
}

impl RecordStore {
    /// Ingest a full set of records.
    ///
    /// Fails without returning a partial store when a record lacks an ecotope or
    /// taxon name, carries a non-finite number, or when a sample code never
    /// receives a surface.
    pub fn ingest<I>(records: I) -> Result<Self, ProcessError>
    where
        I: IntoIterator<Item = InputRecord>,
    {
        let mut store = RecordStore::default();
        let mut seen_ecotopes = HashSet::new();
        let mut seen_taxa = HashSet::new();

        for record in records {
            let ecotope = normalize_name(&record.ecotope, "ecotope")?;
            let taxon = normalize_name(&record.taxon, "taxon")?;
            check_finite("value", record.value)?;
            if let Some(surface) = record.sample_surface {
                check_finite("sample surface", surface)?;
            }

            if let Some(surface) = record.sample_surface {
                match store.surfaces.get(&record.sample_code) {
                    None => {
                        store.surfaces.insert(record.sample_code, surface);
                    }
                    Some(&known) if known != surface => {
                        warn!(
                            sample_code = record.sample_code,
                            known, surface, "inconsistent sample surface, keeping the first"
                        );
                    }
                    Some(_) => {}
                }
            }

            if seen_ecotopes.insert(ecotope.clone()) {
                store.ecotopes.push(ecotope.clone());
            }
            if seen_taxa.insert(taxon.clone()) {
                store.taxa.push(taxon.clone());
            }

            let index = store.observations.len();
            store
                .by_ecotope
                .entry(ecotope.clone())
                .or_default()
                .entry(record.sample_code)
                .or_default()
                .push(index);
            store
                .by_sample
                .entry(record.sample_code)
                .or_default()
                .push(index);
            store.observations.push(Observation {
                sample_code: record.sample_code,
                ecotope,
                taxon,
                value: record.value,
            });
        }

        if let Some(code) = store
            .observations
            .iter()
            .map(|o| o.sample_code)
            .filter(|code| !store.surfaces.contains_key(code))
            .min()
        {
            return Err(ProcessError::MissingSurface(code));
        }

        debug!(
            observations = store.observations.len(),
            samples = store.surfaces.len(),
            ecotopes = store.ecotopes.len(),
            taxa = store.taxa.len(),
            "records ingested"
        );

        Ok(store)
    }

    /// Ecotopes in first-seen order
    pub fn ecotopes(&self) -> &[String] {
        &self.ecotopes
    }

    /// Taxa in first-seen order, across all ecotopes
    pub fn taxa(&self) -> &[String] {
        &self.taxa
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn sample_count(&self) -> usize {
        self.surfaces.len()
    }

    pub fn sample_surface(&self, code: SampleCode) -> Option<f64> {
        self.surfaces.get(&code).copied()
    }

    /// Distinct sample codes of an ecotope, ascending
    pub fn sample_codes(&self, ecotope: &str) -> Vec<SampleCode> {
        self.by_ecotope
            .get(ecotope)
            .map(|samples| samples.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Samples of an ecotope in ascending sample code order, which is the
    /// order grouping consumes them in. Each sample brings all of its
    /// observations, including those recorded under other ecotopes.
    pub fn samples_for_ecotope(&self, ecotope: &str) -> Vec<SampleView<'_>> {
        let Some(samples) = self.by_ecotope.get(ecotope) else {
            return Vec::new();
        };

        samples
            .keys()
            .filter_map(|&code| {
                let surface = self.sample_surface(code)?;
                let indexes = self.by_sample.get(&code)?;
                Some(SampleView {
                    code,
                    surface,
                    observations: indexes.iter().map(|&i| &self.observations[i]).collect(),
                })
            })
            .collect()
    }

    /// Value of one taxon in one sample of an ecotope. Repeated observations
    /// of the same taxon in a sample are summed.
    pub fn sample_value(&self, ecotope: &str, code: SampleCode, taxon: &str) -> Option<f64> {
        let indexes = self.by_ecotope.get(ecotope)?.get(&code)?;
        indexes
            .iter()
            .map(|&i| &self.observations[i])
            .filter(|o| o.taxon == taxon)
            .map(|o| o.value)
            .reduce(|a, b| a + b)
    }
}

fn check_finite(field: &str, value: f64) -> Result<(), ProcessError> {
    if !value.is_finite() {
        return Err(ProcessError::InvalidNumber {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
    Ok(())
}

fn normalize_name(name: &str, field: &str) -> Result<String, ProcessError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ProcessError::MissingField(field.to_string()));
    }
    Ok(trimmed.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(code: SampleCode, ecotope: &str, taxon: &str, value: f64, surface: f64) -> InputRecord {
        InputRecord::new(code, ecotope, taxon, value, surface)
    }

    #[test]
    fn test_names_are_lower_cased_and_ordered_by_first_sight() {
        let store = RecordStore::ingest(vec![
            record(2, "Sand", "WormB", 1.0, 0.1),
            record(1, "mud", "wormA", 2.0, 0.1),
            record(3, "SAND", "wormb", 3.0, 0.1),
        ])
        .unwrap();

        assert_eq!(store.ecotopes(), &["sand".to_string(), "mud".to_string()]);
        assert_eq!(store.taxa(), &["wormb".to_string(), "worma".to_string()]);
        assert_eq!(store.sample_codes("sand"), vec![2, 3]);
    }

    #[test]
    fn test_samples_are_sorted_by_code() {
        let store = RecordStore::ingest(vec![
            record(9, "mud", "a", 1.0, 0.05),
            record(4, "mud", "a", 1.0, 0.07),
            record(4, "mud", "b", 2.0, 0.07),
        ])
        .unwrap();

        let samples = store.samples_for_ecotope("mud");
        let codes: Vec<_> = samples.iter().map(|s| s.code).collect();
        assert_eq!(codes, vec![4, 9]);
        assert_eq!(samples[0].observations.len(), 2);
        assert_eq!(samples[0].surface, 0.07);
        assert!(store.samples_for_ecotope("rock").is_empty());
    }

    #[test]
    fn test_first_surface_wins() {
        let store = RecordStore::ingest(vec![
            record(1, "mud", "a", 1.0, 0.1),
            record(1, "mud", "b", 1.0, 0.3),
        ])
        .unwrap();
        assert_eq!(store.sample_surface(1), Some(0.1));
    }

    #[test]
    fn test_surface_from_any_row_of_the_sample() {
        let mut first = record(1, "mud", "a", 1.0, 0.1);
        first.sample_surface = None;
        let store = RecordStore::ingest(vec![first, record(1, "mud", "b", 1.0, 0.15)]).unwrap();
        assert_eq!(store.sample_surface(1), Some(0.15));
    }

    #[test]
    fn test_missing_surface_fails_ingestion() {
        let mut orphan = record(7, "mud", "a", 1.0, 0.0);
        orphan.sample_surface = None;
        let result = RecordStore::ingest(vec![record(1, "mud", "a", 1.0, 0.1), orphan]);
        assert!(matches!(result, Err(ProcessError::MissingSurface(7))));
    }

    #[test]
    fn test_missing_name_fails_ingestion() {
        let result = RecordStore::ingest(vec![record(1, "  ", "a", 1.0, 0.1)]);
        assert!(matches!(result, Err(ProcessError::MissingField(f)) if f == "ecotope"));
    }

    #[test]
    fn test_non_finite_numbers_fail_ingestion() {
        let result = RecordStore::ingest(vec![record(1, "mud", "a", 1.0, f64::NAN)]);
        assert!(matches!(
            result,
            Err(ProcessError::InvalidNumber { ref field, .. }) if field == "sample surface"
        ));

        let result = RecordStore::ingest(vec![record(1, "mud", "a", f64::INFINITY, 0.1)]);
        assert!(matches!(
            result,
            Err(ProcessError::InvalidNumber { ref field, .. }) if field == "value"
        ));
    }

    #[test]
    fn test_sample_in_two_ecotopes_keeps_all_observations() {
        let store = RecordStore::ingest(vec![
            record(1, "mud", "a", 1.0, 0.2),
            record(1, "sand", "b", 5.0, 0.2),
        ])
        .unwrap();

        let mud = store.samples_for_ecotope("mud");
        assert_eq!(mud.len(), 1);
        let taxa: Vec<_> = mud[0].observations.iter().map(|o| o.taxon.as_str()).collect();
        assert_eq!(taxa, vec!["a", "b"]);

        // per-sample values stay scoped to the ecotope
        assert_eq!(store.sample_value("mud", 1, "b"), None);
        assert_eq!(store.sample_value("sand", 1, "b"), Some(5.0));
    }

    #[test]
    fn test_sample_value_sums_repeats() {
        let store = RecordStore::ingest(vec![
            record(1, "mud", "a", 1.5, 0.1),
            record(1, "mud", "A", 2.0, 0.1),
        ])
        .unwrap();
        assert_eq!(store.sample_value("mud", 1, "a"), Some(3.5));
        assert_eq!(store.sample_value("mud", 1, "b"), None);
    }
}
