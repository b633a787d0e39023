//! Biodiversity
//!
//! Diversity here is taxon richness: the number of taxa whose summed value in
//! a raw group is strictly positive.

use crate::types::{BiodiversityRecord, Group};

pub struct BiodiversityCalculator;

impl BiodiversityCalculator {
    pub fn diversity(group: &Group) -> usize {
        group.sums.values().filter(|&&sum| sum > 0.0).count()
    }

    /// One record per group, in group order
    pub fn records(groups: &[Group]) -> Vec<BiodiversityRecord> {
        groups
            .iter()
            .map(|group| BiodiversityRecord {
                group_id: group.id,
                diversity: Self::diversity(group),
            })
            .collect()
    }
}

/// Median of a set of diversities, `None` for an empty set.
///
/// Odd counts take the middle sorted element, even counts the mean of the two
/// middle elements.
pub fn median(values: &[usize]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let count = sorted.len();

    if count % 2 == 1 {
        Some(sorted[(count + 1) / 2 - 1] as f64)
    } else {
        let lower = sorted[count / 2 - 1] as f64;
        let upper = sorted[count / 2] as f64;
        Some((lower + upper) / 2.0)
    }
}
