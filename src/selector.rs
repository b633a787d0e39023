//! Representative group selection
//!
//! For every ecotope with at least one group, the representative group is the
//! one whose diversity is closest to the ecotope's diversity median. On equal
//! distance the group encountered first keeps the selection.

use crate::biodiversity::median;
use crate::types::{BiodiversityRecord, EcotopeResult, GroupId};
use std::collections::BTreeMap;
use tracing::debug;

pub struct RepresentativeSelector;

impl RepresentativeSelector {
    /// Map ecotope -> representative group id. Ecotopes without groups have no entry.
    pub fn select(ecotopes: &[EcotopeResult]) -> BTreeMap<String, GroupId> {
        let mut selection = BTreeMap::new();
        for result in ecotopes {
            match Self::select_group(&result.biodiversity) {
                Some(group_id) => {
                    debug!(ecotope = %result.ecotope, group_id, "representative selected");
                    selection.insert(result.ecotope.clone(), group_id);
                }
                None => debug!(ecotope = %result.ecotope, "no groups, no representative"),
            }
        }
        selection
    }

    /// Pick from one ecotope's records, in their iteration order
    pub fn select_group(records: &[BiodiversityRecord]) -> Option<GroupId> {
        let diversities: Vec<usize> = records.iter().map(|r| r.diversity).collect();
        let median = median(&diversities)?;

        let mut best: Option<(f64, GroupId)> = None;
        for record in records {
            let difference = (median - record.diversity as f64).abs();
            match best {
                Some((smallest, _)) if difference >= smallest => {}
                _ => best = Some((difference, record.group_id)),
            }
        }
        best.map(|(_, group_id)| group_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TrailingRemainder;

    fn records(diversities: &[usize]) -> Vec<BiodiversityRecord> {
        diversities
            .iter()
            .enumerate()
            .map(|(i, &diversity)| BiodiversityRecord {
                group_id: i as GroupId + 1,
                diversity,
            })
            .collect()
    }

    fn ecotope(name: &str, diversities: &[usize]) -> EcotopeResult {
        EcotopeResult {
            ecotope: name.to_string(),
            groups: Vec::new(),
            normalized: Vec::new(),
            biodiversity: records(diversities),
            discarded: TrailingRemainder::default(),
            sample_count: diversities.len(),
        }
    }

    #[test]
    fn test_closest_to_median() {
        // median 4
        assert_eq!(RepresentativeSelector::select_group(&records(&[6, 2, 4])), Some(3));
    }

    #[test]
    fn test_first_group_wins_a_tie() {
        // median 5.0, groups 1 and 2 are both 1 away
        assert_eq!(RepresentativeSelector::select_group(&records(&[4, 6])), Some(1));
        // median 5.0: 2->3, 4->1, 6->1, 8->3
        assert_eq!(
            RepresentativeSelector::select_group(&records(&[2, 4, 6, 8])),
            Some(2)
        );
    }

    #[test]
    fn test_single_group_is_representative() {
        assert_eq!(RepresentativeSelector::select_group(&records(&[1])), Some(1));
    }

    #[test]
    fn test_empty_ecotope_is_skipped() {
        let selection =
            RepresentativeSelector::select(&[ecotope("mud", &[3, 1, 2]), ecotope("rock", &[])]);
        assert_eq!(selection.get("mud"), Some(&3));
        assert!(!selection.contains_key("rock"));
        assert_eq!(selection.len(), 1);
    }
}
