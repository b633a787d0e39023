//! Group normalization
//!
//! Rescales the taxon sums of each group to what they would be at exactly the
//! target surface. Groups already at the target surface are passed through
//! untouched so their values never pick up floating point drift.

use crate::types::Group;

/// Normalizer for converting raw groups to target-surface groups
pub struct Normalizer;

impl Normalizer {
    /// Return normalized copies of `groups`, same ids and order
    pub fn normalize(groups: &[Group], target_surface: f64) -> Vec<Group> {
        groups
            .iter()
            .map(|group| Self::normalize_group(group, target_surface))
            .collect()
    }

    /// Normalize a single group
    pub fn normalize_group(group: &Group, target_surface: f64) -> Group {
        if group.surface == target_surface {
            return group.clone();
        }

        let factor = target_surface / group.surface;
        Group {
            id: group.id,
            surface: target_surface,
            sums: group
                .sums
                .iter()
                .map(|(taxon, sum)| (taxon.clone(), sum * factor))
                .collect(),
            sample_codes: group.sample_codes.clone(),
        }
    }
}
