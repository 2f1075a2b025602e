// First-fit placement of table regions
//
// There is no free list. Free space is whatever lies between the live
// tables, recomputed from their pointers on every call.

use std::ops::Range;

/// Gaps between live regions inside `[region_start, total)`
///
/// @live holds `(pointer, size)` of every allocated table. Regions are
/// walked in pointer order; parts lying outside the table region (a stray
/// pointer in a damaged image) only ever shrink the free space. Only
/// non-empty gaps are returned, in address order.
pub fn free_ranges(region_start: usize, total: usize, live: &[(usize, usize)]) -> Vec<Range<usize>> {
    let mut tables: Vec<(usize, usize)> = live.iter().copied().filter(|&(_, size)| size != 0).collect();
    tables.sort_unstable();

    let mut ranges = Vec::with_capacity(tables.len() + 1);
    let mut cursor = region_start;
    for (ptr, size) in tables {
        let end = ptr.min(total);
        if cursor < end {
            ranges.push(cursor..end);
        }
        cursor = cursor.max(ptr + size);
    }
    if cursor < total {
        ranges.push(cursor..total);
    }

    tracing::trace!("Free table ranges {:?} around {:?}", ranges, live);
    ranges
}

/// Start of the first range holding at least @size bytes
pub fn first_fit(ranges: &[Range<usize>], size: usize) -> Option<usize> {
    ranges.iter().find(|r| r.len() >= size).map(|r| r.start)
}

/// Length of the largest range, 0 when there is none
pub fn largest_free(ranges: &[Range<usize>]) -> usize {
    ranges.iter().map(|r| r.len()).max().unwrap_or(0)
}

/// Sum of all range lengths
pub fn total_free(ranges: &[Range<usize>]) -> usize {
    ranges.iter().map(|r| r.len()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg64;

    #[test]
    fn test_free_ranges() {
        let ranges = free_ranges(0, 100, &[(50, 10), (10, 10)]);
        assert_eq!(ranges, vec![0..10, 20..50, 60..100]);
        assert_eq!(first_fit(&ranges, 15), Some(20));
        assert_eq!(first_fit(&ranges, 10), Some(0));
        assert_eq!(first_fit(&ranges, 41), None);
        assert_eq!(largest_free(&ranges), 40);
        assert_eq!(total_free(&ranges), 80);
    }

    #[test]
    fn test_empty_and_full() {
        assert_eq!(free_ranges(16, 64, &[]), vec![16..64]);
        // Adjacent tables and tables touching the bounds leave no gaps
        assert!(free_ranges(16, 64, &[(16, 20), (36, 28)]).is_empty());
        assert_eq!(largest_free(&[]), 0);
        assert_eq!(first_fit(&[], 1), None);
    }

    #[test]
    fn test_zero_sized_entries_ignored() {
        let ranges = free_ranges(0, 50, &[(0, 0), (20, 10)]);
        assert_eq!(ranges, vec![0..20, 30..50]);
    }

    #[test]
    fn test_regions_outside_table_area() {
        // A pointer below the table region must not open a gap there
        let ranges = free_ranges(32, 64, &[(2, 14)]);
        assert_eq!(ranges, vec![32..64]);

        // Straddling the start only trims the first gap
        let ranges = free_ranges(32, 64, &[(24, 16)]);
        assert_eq!(ranges, vec![40..64]);

        // Overlapping regions and one running past the end
        let ranges = free_ranges(0, 100, &[(10, 20), (15, 5), (40, 10), (90, 30)]);
        assert_eq!(ranges, vec![0..10, 30..40, 50..90]);
        assert_eq!(free_ranges(0, 100, &[(120, 4)]), vec![0..100]);
    }

    #[test]
    fn test_random_placements_never_overlap() {
        let mut rng = Pcg64::seed_from_u64(0x7a6e);
        let (start, total) = (32usize, 2048usize);

        for _ in 0..50 {
            let mut live: Vec<(usize, usize)> = Vec::new();
            for _ in 0..40 {
                // Drop a table now and then so gaps open up in the middle
                if !live.is_empty() && rng.random_range(0..4) == 0 {
                    let victim = rng.random_range(0..live.len());
                    live.swap_remove(victim);
                }

                let size = rng.random_range(1..200);
                let ranges = free_ranges(start, total, &live);
                match first_fit(&ranges, size) {
                    Some(at) => {
                        assert!(at >= start && at + size <= total);
                        for &(p, s) in &live {
                            assert!(at + size <= p || p + s <= at, "{}+{} overlaps {}+{}", at, size, p, s);
                        }
                        // First fit: no earlier gap was big enough
                        assert!(ranges.iter().take_while(|r| r.start < at).all(|r| r.len() < size));
                        live.push((at, size));
                    }
                    None => assert!(largest_free(&ranges) < size),
                }
            }
        }
    }
}
