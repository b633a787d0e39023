//! Pipeline orchestration
//!
//! This module provides the public API for BioDen. It runs the full pipeline
//! from ingested records to report rows:
//!
//! 1. RecordStore - ingest and normalize names
//! 2. GroupingEngine - pool samples per ecotope
//! 3. Normalizer - rescale groups to the target surface
//! 4. BiodiversityCalculator - taxon richness per raw group
//! 5. RepresentativeSelector - group closest to the ecotope median (after all ecotopes)
//! 6. ReportEmitter - row sequences for export

use crate::biodiversity::{median, BiodiversityCalculator};
use crate::config::PipelineConfig;
use crate::error::{ConfigError, ProcessError};
use crate::grouping::GroupingEngine;
use crate::normalizer::Normalizer;
use crate::progress::{CancellationToken, NoProgress, ProgressObserver};
use crate::report::{GroupSource, Report, ReportEmitter};
use crate::selector::RepresentativeSelector;
use crate::store::RecordStore;
use crate::types::{EcotopeResult, Group, GroupId, InputRecord};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Derived data of one completed processing run
#[derive(Debug, Clone)]
pub struct ProcessingRun {
    pub config: PipelineConfig,
    pub store: RecordStore,
    /// One result per ecotope, in store order
    pub ecotopes: Vec<EcotopeResult>,
    /// Ecotope -> representative group id; ecotopes without groups are absent
    pub representatives: BTreeMap<String, GroupId>,
}

impl ProcessingRun {
    pub fn ecotope(&self, ecotope: &str) -> Option<&EcotopeResult> {
        self.ecotopes.iter().find(|r| r.ecotope == ecotope)
    }

    /// Diversity of one raw group
    pub fn diversity(&self, ecotope: &str, group_id: GroupId) -> Option<usize> {
        self.ecotope(ecotope)?.diversity(group_id)
    }

    pub fn median_diversity(&self, ecotope: &str) -> Option<f64> {
        let result = self.ecotope(ecotope)?;
        let diversities: Vec<usize> = result.biodiversity.iter().map(|r| r.diversity).collect();
        median(&diversities)
    }

    /// The normalized representative group of an ecotope
    pub fn representative(&self, ecotope: &str) -> Option<&Group> {
        let group_id = *self.representatives.get(ecotope)?;
        self.ecotope(ecotope)?.normalized_group(group_id)
    }
}

/// A processing run together with its emitted reports
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub run: ProcessingRun,
    /// Raw tables, raw grouped tables, normalized grouped tables, representatives
    pub reports: Vec<Report>,
}

/// Process records up to representative selection (stateless, one-shot).
///
/// # Example
/// ```ignore
/// let config = PipelineConfig::new("biomass", 0.2, Some(2))?;
/// let run = process_records(records, &config, &NoProgress)?;
/// ```
pub fn process_records(
    records: Vec<InputRecord>,
    config: &PipelineConfig,
    observer: &dyn ProgressObserver,
) -> Result<ProcessingRun, ProcessError> {
    let (run, _) = execute(records, config, observer, &CancellationToken::new(), false)?;
    Ok(run)
}

/// Run the full pipeline including report emission (stateless, one-shot).
pub fn run_pipeline(
    records: Vec<InputRecord>,
    config: &PipelineConfig,
    observer: &dyn ProgressObserver,
) -> Result<RunOutput, ProcessError> {
    let (run, reports) = execute(records, config, observer, &CancellationToken::new(), true)?;
    Ok(RunOutput { run, reports })
}

/// Reusable processor carrying configuration, progress observer and
/// cancellation token.
///
/// Use this when the run is driven from another thread and may be cancelled.
pub struct BiodenProcessor {
    config: PipelineConfig,
    observer: Arc<dyn ProgressObserver>,
    cancel: CancellationToken,
}

impl BiodenProcessor {
    /// Create a processor, rejecting an invalid configuration
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            observer: Arc::new(NoProgress),
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_observer(mut self, observer: impl ProgressObserver + 'static) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Token that cancels this processor's runs
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Process records up to representative selection
    pub fn process(&self, records: Vec<InputRecord>) -> Result<ProcessingRun, ProcessError> {
        let (run, _) = execute(records, &self.config, self.observer.as_ref(), &self.cancel, false)?;
        Ok(run)
    }

    /// Process records and emit all reports
    pub fn run(&self, records: Vec<InputRecord>) -> Result<RunOutput, ProcessError> {
        let (run, reports) =
            execute(records, &self.config, self.observer.as_ref(), &self.cancel, true)?;
        Ok(RunOutput { run, reports })
    }
}

/// Counts steps across phases and forwards them to the observer
struct Tracker<'a> {
    observer: &'a dyn ProgressObserver,
    step: AtomicUsize,
    total: usize,
}

impl Tracker<'_> {
    fn advance(&self, message: &str) {
        let step = self.step.fetch_add(1, Ordering::SeqCst) + 1;
        self.observer.on_progress(step, self.total, message);
    }
}

fn check_cancelled(cancel: &CancellationToken) -> Result<(), ProcessError> {
    if cancel.is_cancelled() {
        info!("run cancelled");
        return Err(ProcessError::Cancelled);
    }
    Ok(())
}

fn execute(
    records: Vec<InputRecord>,
    config: &PipelineConfig,
    observer: &dyn ProgressObserver,
    cancel: &CancellationToken,
    emit: bool,
) -> Result<(ProcessingRun, Vec<Report>), ProcessError> {
    config.validate()?;
    check_cancelled(cancel)?;

    info!(records = records.len(), property = %config.property, "loading data");
    let store = RecordStore::ingest(records)?;

    let ecotope_count = store.ecotopes().len();
    let total = if emit {
        3 + ecotope_count * 4
    } else {
        2 + ecotope_count
    };
    let tracker = Tracker {
        observer,
        step: AtomicUsize::new(0),
        total,
    };
    tracker.advance("Loaded data");

    info!(
        ecotopes = ecotope_count,
        target_surface = config.target_surface,
        "making sample groups"
    );
    let ecotopes = process_ecotopes(&store, config, cancel, &tracker)?;

    // Every ecotope's biodiversity is complete at this point.
    check_cancelled(cancel)?;
    let representatives = RepresentativeSelector::select(&ecotopes);
    info!(
        representatives = representatives.len(),
        "determined representative sample groups"
    );
    tracker.advance("Determined representative sample group for each ecotope");

    let run = ProcessingRun {
        config: config.clone(),
        store,
        ecotopes,
        representatives,
    };

    let reports = if emit {
        emit_reports(&run, cancel, &tracker)?
    } else {
        Vec::new()
    };

    Ok((run, reports))
}

fn process_ecotope(
    store: &RecordStore,
    ecotope: &str,
    config: &PipelineConfig,
) -> Result<EcotopeResult, ProcessError> {
    let grouping =
        GroupingEngine::make_groups(store, ecotope, config.target_surface, config.trailing)?;
    let normalized = Normalizer::normalize(&grouping.groups, config.target_surface);
    let biodiversity = BiodiversityCalculator::records(&grouping.groups);

    Ok(EcotopeResult {
        ecotope: ecotope.to_string(),
        groups: grouping.groups,
        normalized,
        biodiversity,
        discarded: grouping.discarded,
        sample_count: store.sample_codes(ecotope).len(),
    })
}

#[cfg(not(feature = "parallel"))]
fn process_ecotopes(
    store: &RecordStore,
    config: &PipelineConfig,
    cancel: &CancellationToken,
    tracker: &Tracker<'_>,
) -> Result<Vec<EcotopeResult>, ProcessError> {
    let mut results = Vec::with_capacity(store.ecotopes().len());
    for ecotope in store.ecotopes() {
        check_cancelled(cancel)?;
        let result = process_ecotope(store, ecotope, config)?;
        tracker.advance(&format!("Processed ecotope '{}'", ecotope));
        results.push(result);
    }
    Ok(results)
}

#[cfg(feature = "parallel")]
fn process_ecotopes(
    store: &RecordStore,
    config: &PipelineConfig,
    cancel: &CancellationToken,
    tracker: &Tracker<'_>,
) -> Result<Vec<EcotopeResult>, ProcessError> {
    // Samples within an ecotope are still folded sequentially; only whole
    // ecotopes run side by side. `collect` keeps store order.
    store
        .ecotopes()
        .par_iter()
        .map(|ecotope| {
            check_cancelled(cancel)?;
            let result = process_ecotope(store, ecotope, config)?;
            tracker.advance(&format!("Processed ecotope '{}'", ecotope));
            Ok(result)
        })
        .collect()
}

fn emit_reports(
    run: &ProcessingRun,
    cancel: &CancellationToken,
    tracker: &Tracker<'_>,
) -> Result<Vec<Report>, ProcessError> {
    let emitter = ReportEmitter::new(run);
    let ecotopes = run.store.ecotopes();
    let mut reports = Vec::with_capacity(ecotopes.len() * 3 + 1);

    info!("emitting non-grouped ecotope data");
    for ecotope in ecotopes {
        check_cancelled(cancel)?;
        reports.push(emitter.raw_table(ecotope));
        tracker.advance(&format!("Emitted raw data of ecotope '{}'", ecotope));
    }

    for source in [GroupSource::Raw, GroupSource::Normalized] {
        info!(?source, "emitting ecotope groups");
        for ecotope in ecotopes {
            check_cancelled(cancel)?;
            reports.push(emitter.grouped_table(ecotope, source));
            tracker.advance(&format!(
                "Emitted {:?} sample groups of ecotope '{}'",
                source, ecotope
            ));
        }
    }

    check_cancelled(cancel)?;
    reports.push(emitter.representative_table());
    tracker.advance("Emitted representative sample groups");
    debug!(reports = reports.len(), "export phase complete");

    Ok(reports)
}
