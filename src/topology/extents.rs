//! `IndexExtents`: inclusive integer boxes in a structured index space.
//!
//! Domains are declared by their *point* extents. Cell extents are derived:
//! along an axis with at least two points the cells run `lo..=hi-1`; along a
//! flat axis (`lo == hi`, the third axis of a 2-D mesh) the single layer of
//! points also acts as the single layer of cells, so the same code handles
//! 1-D, 2-D and 3-D meshes.

use itertools::iproduct;
use std::fmt;

/// Whether data lives on points (nodes) or cells (zones).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Centering {
    Point,
    Cell,
}

/// One of the six faces of a logically rectangular box.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub enum Face {
    IMin,
    IMax,
    JMin,
    JMax,
    KMin,
    KMax,
}

impl Face {
    /// All faces in `IMIN..KMAX` order.
    pub const ALL: [Face; 6] = [
        Face::IMin,
        Face::IMax,
        Face::JMin,
        Face::JMax,
        Face::KMin,
        Face::KMax,
    ];

    /// Face on `axis`, upper side if `upper`.
    pub fn new(axis: usize, upper: bool) -> Self {
        Self::ALL[2 * axis + usize::from(upper)]
    }

    #[inline]
    pub fn axis(self) -> usize {
        self as usize / 2
    }

    #[inline]
    pub fn is_upper(self) -> bool {
        self as usize % 2 == 1
    }

    /// Position in `IMIN..KMAX` order.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn opposite(self) -> Self {
        Self::new(self.axis(), !self.is_upper())
    }
}

/// Inclusive box `lo[a]..=hi[a]` on each of three axes.
#[derive(Copy, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct IndexExtents {
    pub lo: [i32; 3],
    pub hi: [i32; 3],
}

impl IndexExtents {
    pub const fn new(lo: [i32; 3], hi: [i32; 3]) -> Self {
        Self { lo, hi }
    }

    /// Build from the `[imin, imax, jmin, jmax, kmin, kmax]` layout.
    pub const fn from_array(e: [i32; 6]) -> Self {
        Self {
            lo: [e[0], e[2], e[4]],
            hi: [e[1], e[3], e[5]],
        }
    }

    pub const fn to_array(self) -> [i32; 6] {
        [
            self.lo[0], self.hi[0], self.lo[1], self.hi[1], self.lo[2], self.hi[2],
        ]
    }

    /// `true` if `hi >= lo` on every axis.
    pub fn is_valid(&self) -> bool {
        (0..3).all(|a| self.hi[a] >= self.lo[a])
    }

    #[inline]
    pub fn is_flat(&self, axis: usize) -> bool {
        self.lo[axis] == self.hi[axis]
    }

    /// Number of indices along each axis.
    pub fn dims(&self) -> [usize; 3] {
        std::array::from_fn(|a| (self.hi[a] - self.lo[a] + 1).max(0) as usize)
    }

    pub fn count(&self) -> usize {
        self.dims().iter().product()
    }

    pub fn contains(&self, idx: [i32; 3]) -> bool {
        (0..3).all(|a| idx[a] >= self.lo[a] && idx[a] <= self.hi[a])
    }

    pub fn contains_box(&self, other: &IndexExtents) -> bool {
        self.contains(other.lo) && self.contains(other.hi)
    }

    /// Intersection, or `None` when empty.
    pub fn intersect(&self, other: &IndexExtents) -> Option<IndexExtents> {
        let out = IndexExtents {
            lo: std::array::from_fn(|a| self.lo[a].max(other.lo[a])),
            hi: std::array::from_fn(|a| self.hi[a].min(other.hi[a])),
        };
        out.is_valid().then_some(out)
    }

    /// Grow by `lower[a]` below and `upper[a]` above on each axis.
    pub fn expand(&self, lower: [i32; 3], upper: [i32; 3]) -> IndexExtents {
        IndexExtents {
            lo: std::array::from_fn(|a| self.lo[a] - lower[a]),
            hi: std::array::from_fn(|a| self.hi[a] + upper[a]),
        }
    }

    pub fn translate(&self, by: [i32; 3]) -> IndexExtents {
        IndexExtents {
            lo: std::array::from_fn(|a| self.lo[a] + by[a]),
            hi: std::array::from_fn(|a| self.hi[a] + by[a]),
        }
    }

    /// Cells spanned by these point extents.
    pub fn cells_from_points(&self) -> IndexExtents {
        IndexExtents {
            lo: self.lo,
            hi: std::array::from_fn(|a| {
                if self.is_flat(a) {
                    self.hi[a]
                } else {
                    self.hi[a] - 1
                }
            }),
        }
    }

    /// Point extents of a point box refined by `ratio`.
    pub fn refine_points(&self, ratio: [i32; 3]) -> IndexExtents {
        IndexExtents {
            lo: std::array::from_fn(|a| self.lo[a] * ratio[a]),
            hi: std::array::from_fn(|a| self.hi[a] * ratio[a]),
        }
    }

    /// Cell extents of a cell box refined by `ratio`; flat axes stay single.
    pub fn refine_cells(&self, ratio: [i32; 3], flat: [bool; 3]) -> IndexExtents {
        IndexExtents {
            lo: std::array::from_fn(|a| {
                if flat[a] {
                    self.lo[a]
                } else {
                    self.lo[a] * ratio[a]
                }
            }),
            hi: std::array::from_fn(|a| {
                if flat[a] {
                    self.hi[a]
                } else {
                    (self.hi[a] + 1) * ratio[a] - 1
                }
            }),
        }
    }

    /// Exact coarsening of a point box, or `None` if a bound is not a multiple of `ratio`.
    pub fn coarsen_points_exact(&self, ratio: [i32; 3]) -> Option<IndexExtents> {
        let aligned =
            (0..3).all(|a| self.lo[a].rem_euclid(ratio[a]) == 0 && self.hi[a].rem_euclid(ratio[a]) == 0);
        aligned.then(|| IndexExtents {
            lo: std::array::from_fn(|a| self.lo[a].div_euclid(ratio[a])),
            hi: std::array::from_fn(|a| self.hi[a].div_euclid(ratio[a])),
        })
    }

    /// Coarse cells containing a fine cell box (Euclidean division).
    pub fn coarsen_cells(&self, ratio: [i32; 3], flat: [bool; 3]) -> IndexExtents {
        IndexExtents {
            lo: std::array::from_fn(|a| {
                if flat[a] {
                    self.lo[a]
                } else {
                    self.lo[a].div_euclid(ratio[a])
                }
            }),
            hi: std::array::from_fn(|a| {
                if flat[a] {
                    self.hi[a]
                } else {
                    self.hi[a].div_euclid(ratio[a])
                }
            }),
        }
    }

    /// Iterate all indices with axis 0 fastest.
    pub fn iter(&self) -> impl Iterator<Item = [i32; 3]> + use<> {
        let (lo, hi) = (self.lo, self.hi);
        iproduct!(lo[2]..=hi[2], lo[1]..=hi[1], lo[0]..=hi[0]).map(|(k, j, i)| [i, j, k])
    }

    /// Flat offset of `idx` in this box, axis 0 fastest.
    pub fn flat_index(&self, idx: [i32; 3]) -> Option<usize> {
        if !self.contains(idx) {
            return None;
        }
        let d = self.dims();
        let rel: [usize; 3] = std::array::from_fn(|a| (idx[a] - self.lo[a]) as usize);
        Some(rel[0] + d[0] * (rel[1] + d[1] * rel[2]))
    }
}

impl fmt::Debug for IndexExtents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IndexExtents{:?}", self.to_array())
    }
}

impl fmt::Display for IndexExtents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}:{}, {}:{}, {}:{}]",
            self.lo[0], self.hi[0], self.lo[1], self.hi[1], self.lo[2], self.hi[2]
        )
    }
}

/// Flat offset into a dense `dims` box addressed from zero, axis 0 fastest.
#[inline]
pub fn flat_offset(dims: [usize; 3], idx: [usize; 3]) -> usize {
    idx[0] + dims[0] * (idx[1] + dims[1] * idx[2])
}
