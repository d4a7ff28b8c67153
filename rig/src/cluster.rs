//! Marker pulse clustering.
//!
//! A homing sweep logs every sampled step index at which the marker sensor
//! read active. One physical marker therefore shows up as a short run of
//! nearby indices (plus the occasional bounce). Clustering collapses the raw
//! log into one representative location per marker.

use std::collections::BTreeMap;

/// Partition pulses into maximal runs where consecutive values differ by at
/// most `tolerance`, returning each run's `(min, max)` endpoints in
/// ascending order.
///
/// Duplicates are dropped before partitioning. A gap strictly greater than
/// `tolerance` starts a new run.
pub fn cluster_runs(pulses: &[u32], tolerance: u32) -> Vec<(u32, u32)> {
    let mut sorted: Vec<u32> = pulses.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut runs = Vec::new();
    let mut iter = sorted.into_iter();
    let Some(first) = iter.next() else {
        return runs;
    };

    let mut start = first;
    let mut end = first;
    for pulse in iter {
        if pulse - end > tolerance {
            runs.push((start, end));
            start = pulse;
        }
        end = pulse;
    }
    runs.push((start, end));
    runs
}

/// Collapse a raw pulse log into an index → location mapping.
///
/// Each run's representative location is the floor of the average of its
/// endpoints. This is deliberately independent of pulse density within the
/// run: a marker that happened to be sampled more often on one side must not
/// have its location dragged toward that side. Keys are contiguous integers
/// from 0 in ascending location order.
///
/// Empty input yields an empty mapping; callers decide whether "no positions
/// found" is reportable.
pub fn cluster(pulses: &[u32], tolerance: u32) -> BTreeMap<u32, u32> {
    cluster_runs(pulses, tolerance)
        .into_iter()
        .enumerate()
        .map(|(index, (min, max))| (index as u32, (min + max) / 2))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_markers_with_bounce() {
        // (10+12)/2 = 11, (50+51)/2 = 50 (floor)
        let mapping = cluster(&[10, 11, 12, 50, 51], 2);
        let expected: BTreeMap<u32, u32> = [(0, 11), (1, 50)].into_iter().collect();
        assert_eq!(mapping, expected);
    }

    #[test]
    fn empty_input_is_empty_mapping() {
        assert!(cluster(&[], 5).is_empty());
        assert!(cluster_runs(&[], 5).is_empty());
    }

    #[test]
    fn single_pulse_single_cluster() {
        let mapping = cluster(&[42], 5);
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping[&0], 42);
    }

    #[test]
    fn gap_equal_to_tolerance_merges() {
        // 10 -> 15 is exactly tolerance 5 apart: same run
        let runs = cluster_runs(&[10, 15], 5);
        assert_eq!(runs, vec![(10, 15)]);
    }

    #[test]
    fn gap_above_tolerance_splits() {
        let runs = cluster_runs(&[10, 16], 5);
        assert_eq!(runs, vec![(10, 10), (16, 16)]);
    }

    #[test]
    fn duplicates_and_order_are_irrelevant() {
        let mapping = cluster(&[51, 10, 50, 12, 11, 10, 51], 2);
        let expected: BTreeMap<u32, u32> = [(0, 11), (1, 50)].into_iter().collect();
        assert_eq!(mapping, expected);
    }

    #[test]
    fn representative_ignores_pulse_density() {
        // Heavily sampled near 10, once at 20; midpoint of endpoints is 15.
        let mapping = cluster(&[10, 10, 11, 11, 12, 12, 13, 20], 10);
        assert_eq!(mapping[&0], 15);
    }

    #[test]
    fn runs_are_disjoint_sorted_and_cover_all_pulses() {
        let cases: &[(&[u32], u32)] = &[
            (&[1, 2, 3, 10, 11, 30], 2),
            (&[5, 5, 5, 5], 1),
            (&[0, 100, 200, 300], 0),
            (&[7, 8, 9, 10, 11, 12], 1),
            (&[3, 1, 4, 1, 5, 9, 2, 6, 5, 35], 2),
        ];

        for &(pulses, tolerance) in cases {
            let runs = cluster_runs(pulses, tolerance);

            for pair in runs.windows(2) {
                // sorted ascending and disjoint, with a real gap between runs
                assert!(pair[0].1 < pair[1].0, "overlapping runs: {pair:?}");
                assert!(pair[1].0 - pair[0].1 > tolerance);
            }
            for &(min, max) in &runs {
                assert!(min <= max);
            }
            for &pulse in pulses {
                let covering = runs
                    .iter()
                    .filter(|&&(min, max)| pulse >= min && pulse <= max)
                    .count();
                assert_eq!(covering, 1, "pulse {pulse} covered {covering} times");
            }
        }
    }

    #[test]
    fn keys_are_contiguous_from_zero() {
        let mapping = cluster(&[100, 1, 50, 200], 0);
        let keys: Vec<u32> = mapping.keys().copied().collect();
        assert_eq!(keys, vec![0, 1, 2, 3]);
        let locations: Vec<u32> = mapping.values().copied().collect();
        assert_eq!(locations, vec![1, 50, 100, 200]);
    }
}
