//! Size-bounded rotation
//!
//! A destination is a compact JSON array, so its encoded size is
//! `2 + sum(entry sizes) + (n - 1)` separators. Dropping the oldest entry
//! shrinks it by that entry's size plus one comma, which lets rotation decide
//! how many entries to evict without re-encoding the whole array each time.

/// Maximum size of a destination file in bytes (10 MiB)
pub const ROTATION_THRESHOLD_BYTES: u64 = 10 * 1024 * 1024;

/// Encoded size of a compact JSON array whose elements have these sizes
pub fn array_size(entry_sizes: &[u64]) -> u64 {
    let separators = entry_sizes.len().saturating_sub(1) as u64;
    2 + entry_sizes.iter().sum::<u64>() + separators
}

/// Number of oldest entries to evict so the array fits under `threshold`
///
/// Entries are dropped from the front one at a time. The last entry is never
/// evicted, even if it alone exceeds the threshold.
pub fn evictions_needed(entry_sizes: &[u64], threshold: u64) -> usize {
    let mut size = array_size(entry_sizes);
    let mut evicted = 0;

    while size > threshold && entry_sizes.len() - evicted > 1 {
        // Removing a non-last element removes the element and one comma
        size -= entry_sizes[evicted] + 1;
        evicted += 1;
    }

    evicted
}
