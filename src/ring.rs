//! Slot-time reconstruction and search over circular sample buffers.
//!
//! A ring buffer file stores no timestamps. Each slot's absolute time is
//! implied by the subset's geometry: the slot at `offset` holds the newest
//! sample (`t_last`), and every step against physical order subtracts one
//! sampling interval, wrapping from slot 0 to the last physical slot. The
//! resulting physical array is a rotated view of a strictly ascending time
//! sequence with its rotation point at `offset + 1`, which is why lookups use
//! a pivot-aware binary search instead of assuming linear sortedness.

use crate::schema::SubsetRecord;

/// Reconstruct the absolute timestamp of every physical slot.
///
/// Returns one timestamp per slot, in physical slot order. Rotating the
/// result so it starts at slot `(offset + 1) % capacity` yields a strictly
/// ascending sequence stepping by the sampling interval.
pub fn slot_times(subset: &SubsetRecord) -> Vec<i64> {
    let n = subset.capacity;
    if n == 0 {
        return Vec::new();
    }

    let interval = subset.sample_interval();
    let offset = subset.offset;
    let mut times = vec![0i64; n];

    times[offset] = subset.t_last;
    for i in (0..offset).rev() {
        times[i] = times[i + 1] - interval;
    }

    // Wrap: the physically last slot sits just before slot 0 in time.
    if offset + 1 < n {
        times[n - 1] = times[0] - interval;
        for i in (offset + 1..n - 1).rev() {
            times[i] = times[i + 1] - interval;
        }
    }

    times
}

/// Bounds of the time span the ring can physically represent.
///
/// `t_min` is the oldest slot's time (just past the wrap), `t_max` the
/// newest. `None` for an empty ring.
pub fn importable_window(times: &[i64], offset: usize) -> Option<(i64, i64)> {
    if times.is_empty() {
        return None;
    }
    let t_min = times[(offset + 1) % times.len()];
    let t_max = times[offset];
    Some((t_min, t_max))
}

/// Locate `key` in an array sorted ascending except for one rotation point.
///
/// Works on plain sorted input as well (rotation point zero). Returns the
/// physical index of an exact match, or `None`.
pub fn rotated_search(arr: &[i64], key: i64) -> Option<usize> {
    if arr.is_empty() {
        return None;
    }

    let mut lo = 0usize;
    let mut hi = arr.len() - 1;

    loop {
        let mid = lo + (hi - lo) / 2;
        if arr[mid] == key {
            return Some(mid);
        }

        if arr[lo] <= arr[mid] {
            // Left half is sorted.
            if key >= arr[lo] && key < arr[mid] {
                if mid == lo {
                    return None;
                }
                hi = mid - 1;
            } else {
                if mid == hi {
                    return None;
                }
                lo = mid + 1;
            }
        } else {
            // Left half holds the rotation, so the right half is sorted.
            if key > arr[mid] && key <= arr[hi] {
                if mid == hi {
                    return None;
                }
                lo = mid + 1;
            } else {
                if mid == lo {
                    return None;
                }
                hi = mid - 1;
            }
        }
    }
}
