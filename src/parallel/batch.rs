//! Batch boundaries for parallel estimation. Each batch owns its own random stream, so the
//! split (not the thread count) determines which samples are drawn.

use std::ops::Range;

/// Split `total` sample indices into up to `num_batches` contiguous ranges.
/// Batches are as equal in size as possible; earlier batches take the remainder.
///
/// # Example
/// ```
/// # use blastmc::parallel::batch_ranges;
/// let ranges = batch_ranges(100, 4);
/// assert_eq!(ranges, vec![0..25, 25..50, 50..75, 75..100]);
/// ```
pub fn batch_ranges(total: usize, num_batches: usize) -> Vec<Range<usize>> {
    if total == 0 || num_batches == 0 {
        return Vec::new();
    }
    let num_batches = num_batches.min(total);
    let base = total / num_batches;
    let remainder = total % num_batches;
    let mut start = 0;
    (0..num_batches)
        .map(|i| {
            let end = start + base + usize::from(i < remainder);
            let range = start..end;
            start = end;
            range
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remainder_goes_to_leading_batches() {
        assert_eq!(batch_ranges(10, 3), vec![0..4, 4..7, 7..10]);
    }

    #[test]
    fn never_more_batches_than_samples() {
        let ranges = batch_ranges(3, 16);
        assert_eq!(ranges, vec![0..1, 1..2, 2..3]);
    }

    #[test]
    fn ranges_cover_every_sample_once() {
        let ranges = batch_ranges(1001, 16);
        assert_eq!(ranges.first().map(|r| r.start), Some(0));
        assert_eq!(ranges.last().map(|r| r.end), Some(1001));
        assert!(ranges.windows(2).all(|w| w[0].end == w[1].start));
    }

    #[test]
    fn nothing_to_split() {
        assert!(batch_ranges(0, 5).is_empty());
        assert!(batch_ranges(10, 0).is_empty());
    }
}
