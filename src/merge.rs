//! Merge of interchange samples into a ring buffer's physical slots.
//!
//! The merge never changes the ring's geometry, only its contents: the
//! output keeps the ring's existing value in every slot unless an
//! interchange sample with exactly the slot's reconstructed timestamp
//! exists, in which case that sample wins. Only timestamps inside the span
//! the ring can physically represent are eligible; interchange history
//! older than the oldest slot has nowhere to go and is ignored.

use crate::ring::{importable_window, rotated_search};
use crate::sample::Sample;

/// Combine ring values with interchange samples into a new physical-order
/// value sequence.
///
/// `ring_times` must be the reconstructed slot times for the same subset the
/// values were read from, and `feed_times`/`feed_values` the parallel
/// sequences produced by the interchange reader. Samples are matched by
/// equal timestamp, never by position; the feed retains its circular-export
/// provenance, so lookups go through the rotation-aware search.
pub fn merge_series<T: Sample>(
    ring_values: &[T],
    ring_times: &[i64],
    offset: usize,
    feed_times: &[i64],
    feed_values: &[T],
) -> Vec<T> {
    debug_assert_eq!(ring_values.len(), ring_times.len());
    debug_assert_eq!(feed_times.len(), feed_values.len());

    let mut merged = ring_values.to_vec();
    if feed_times.is_empty() {
        return merged;
    }
    let Some((t_min, t_max)) = importable_window(ring_times, offset) else {
        return merged;
    };

    for (slot, &t) in ring_times.iter().enumerate() {
        if t < t_min || t > t_max {
            continue;
        }
        if let Some(found) = rotated_search(feed_times, t) {
            merged[slot] = feed_values[found];
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    // Geometry from the reference scenario: capacity 5, offset 2,
    // t_prev 100, t_last 110 => slot times [90, 100, 110, 70, 80] and
    // importable window [70, 110].
    const RING_TIMES: [i64; 5] = [90, 100, 110, 70, 80];
    const OFFSET: usize = 2;

    #[test]
    fn reference_scenario_overwrites_matched_slots_only() {
        let ring = [5i32, 7, 9, i32::MAX, i32::MAX];
        let feed_times = [110i64, 100];
        let feed_values = [99i32, 7];

        let merged = merge_series(&ring, &RING_TIMES, OFFSET, &feed_times, &feed_values);
        assert_eq!(merged, vec![5, 7, 99, i32::MAX, i32::MAX]);
    }

    #[test]
    fn equal_value_match_is_a_no_op() {
        let ring = [5i32, 7, 9, 11, 13];
        let feed_times = [100i64];
        let feed_values = [7i32];

        let merged = merge_series(&ring, &RING_TIMES, OFFSET, &feed_times, &feed_values);
        assert_eq!(merged, ring.to_vec());
    }

    #[test]
    fn unmatched_slots_keep_ring_values() {
        let ring = [5i32, 7, 9, 11, 13];
        let merged = merge_series(&ring, &RING_TIMES, OFFSET, &[], &[]);
        assert_eq!(merged, ring.to_vec());
    }

    #[test]
    fn feed_outside_ring_window_is_ineligible() {
        // 60 predates the oldest slot (70); 120 postdates the newest (110).
        // Neither matches any slot time, so nothing changes.
        let ring = [5i32, 7, 9, 11, 13];
        let feed_times = [60i64, 120];
        let feed_values = [1000i32, 2000];

        let merged = merge_series(&ring, &RING_TIMES, OFFSET, &feed_times, &feed_values);
        assert_eq!(merged, ring.to_vec());
    }

    #[test]
    fn sentinel_slots_may_be_legitimately_overwritten() {
        let ring = [i32::MAX; 5];
        let feed_times = [70i64, 80, 90];
        let feed_values = [1i32, 2, 3];

        let merged = merge_series(&ring, &RING_TIMES, OFFSET, &feed_times, &feed_values);
        assert_eq!(merged, vec![3, i32::MAX, i32::MAX, 1, 2]);
    }

    #[test]
    fn float_merge_carries_nan_through_copy() {
        let ring = [1.0f64, f64::NAN, 3.0, 4.0, 5.0];
        let feed_times = [110i64];
        let feed_values = [9.5f64];

        let merged = merge_series(&ring, &RING_TIMES, OFFSET, &feed_times, &feed_values);
        assert_eq!(merged[0], 1.0);
        assert!(merged[1].is_nan());
        assert_eq!(merged[2], 9.5);
        assert_eq!(merged[3], 4.0);
        assert_eq!(merged[4], 5.0);
    }

    #[test]
    fn empty_ring_merges_to_empty() {
        let merged = merge_series::<i32>(&[], &[], 0, &[100], &[5]);
        assert!(merged.is_empty());
    }
}
