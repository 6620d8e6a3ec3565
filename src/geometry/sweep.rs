//! Sort-and-sweep broad phase for adjacency discovery.
//!
//! Boxes are sorted by their lower bound along the axis with the largest
//! spread; a sweep keeps only boxes whose upper bound has not been passed, so
//! only boxes that overlap along the sweep axis are ever compared. For a
//! decomposition of `D` boxes with `K` touching pairs the cost is
//! `O(D log D + K)` in practice.

use crate::boundary::perf::FastSet;
use crate::topology::extents::IndexExtents;
use itertools::Itertools;

/// A box tagged with the domain it (or its periodic image) belongs to.
#[derive(Copy, Clone, Debug)]
pub struct SweepEntry {
    pub owner: usize,
    pub bounds: IndexExtents,
}

fn closed_overlap(a: &IndexExtents, b: &IndexExtents) -> bool {
    (0..3).all(|ax| a.lo[ax] <= b.hi[ax] && b.lo[ax] <= a.hi[ax])
}

fn sweep_axis(entries: &[SweepEntry]) -> usize {
    (0..3)
        .max_by_key(|&ax| {
            let lo = entries.iter().map(|e| e.bounds.lo[ax]).min().unwrap_or(0);
            let hi = entries.iter().map(|e| e.bounds.hi[ax]).max().unwrap_or(0);
            i64::from(hi) - i64::from(lo)
        })
        .unwrap_or(0)
}

/// Unordered owner pairs `(i, j)` with `i <= j` whose boxes touch or overlap.
///
/// `i == j` is only reported when two *different* entries of the same owner
/// touch (a periodic image touching the original).
pub fn candidate_pairs(entries: &[SweepEntry]) -> Vec<(usize, usize)> {
    if entries.is_empty() {
        return Vec::new();
    }
    let axis = sweep_axis(entries);
    let order: Vec<usize> = (0..entries.len())
        .sorted_by_key(|&i| (entries[i].bounds.lo[axis], i))
        .collect();

    let mut active: Vec<usize> = Vec::new();
    let mut pairs: FastSet<(usize, usize)> = FastSet::default();
    for &e in &order {
        let cur = &entries[e];
        active.retain(|&f| entries[f].bounds.hi[axis] >= cur.bounds.lo[axis]);
        for &f in &active {
            let other = &entries[f];
            if closed_overlap(&cur.bounds, &other.bounds) {
                let (i, j) = (cur.owner.min(other.owner), cur.owner.max(other.owner));
                pairs.insert((i, j));
            }
        }
        active.push(e);
    }
    pairs.into_iter().sorted_unstable().collect()
}
