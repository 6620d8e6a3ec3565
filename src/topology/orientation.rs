//! Orientation groups for structured index spaces.
//!
//! An [`AxisTransform`] is an element of the signed permutation group on three
//! axes (permutation `S_3` combined with per-axis reversal, i.e. the
//! hyperoctahedral group). An [`IndexTransform`] adds an integer offset and so
//! maps one domain's global index space onto another's.
//!
//! Composition follows the usual convention: `compose(p, q)` applies `q`
//! first, then `p`.

use super::extents::{Centering, IndexExtents};
use std::fmt::{Debug, Formatter};

/// Group operations shared by all orientation types.
pub trait Orientation: Copy + Default + Eq + Debug {
    /// `a ∘ b`: apply `b`, then `a`.
    fn compose(a: Self, b: Self) -> Self;
    fn inverse(a: Self) -> Self;
}

/// Signed permutation of three axes.
///
/// Axis `a` of the source maps to axis `perm[a]` of the target, reversed when
/// `flip[a]` is set.
#[derive(Copy, Clone, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub struct AxisTransform {
    pub perm: [u8; 3],
    pub flip: [bool; 3],
}

impl Default for AxisTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Debug for AxisTransform {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AxisTransform").field(&self.to_signed()).finish()
    }
}

impl AxisTransform {
    pub const IDENTITY: Self = Self {
        perm: [0, 1, 2],
        flip: [false; 3],
    };

    /// Identity with the given axes reversed.
    pub fn reversing(flip: [bool; 3]) -> Self {
        Self {
            perm: [0, 1, 2],
            flip,
        }
    }

    /// Decode the signed, 1-based form: entry `a` is `±(target_axis + 1)`.
    ///
    /// Returns `None` unless the magnitudes form a permutation of `1..=3`.
    pub fn from_signed(o: [i8; 3]) -> Option<Self> {
        let mut seen = [false; 3];
        let mut perm = [0u8; 3];
        let mut flip = [false; 3];
        for a in 0..3 {
            let m = o[a].unsigned_abs();
            if !(1..=3).contains(&m) || seen[(m - 1) as usize] {
                return None;
            }
            seen[(m - 1) as usize] = true;
            perm[a] = m - 1;
            flip[a] = o[a] < 0;
        }
        Some(Self { perm, flip })
    }

    pub fn to_signed(self) -> [i8; 3] {
        std::array::from_fn(|a| {
            let m = self.perm[a] as i8 + 1;
            if self.flip[a] { -m } else { m }
        })
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Rotate/reflect a relative vector.
    #[inline]
    pub fn apply(&self, v: [i32; 3]) -> [i32; 3] {
        let mut out = [0; 3];
        for a in 0..3 {
            out[self.perm[a] as usize] = if self.flip[a] { -v[a] } else { v[a] };
        }
        out
    }

    /// Reorder a per-axis quantity (dims, ratios) without signs.
    #[inline]
    pub fn permute<T: Copy + Default>(&self, v: [T; 3]) -> [T; 3] {
        let mut out = [T::default(); 3];
        for a in 0..3 {
            out[self.perm[a] as usize] = v[a];
        }
        out
    }

    /// Inverse of [`permute`](Self::permute): read a target-axis quantity back
    /// in source-axis order.
    #[inline]
    pub fn gather<T: Copy>(&self, v: [T; 3]) -> [T; 3] {
        std::array::from_fn(|a| v[self.perm[a] as usize])
    }

    /// 1 on target axes that receive a reversed source axis.
    #[inline]
    fn reversed_targets(&self) -> [i32; 3] {
        let mut out = [0; 3];
        for a in 0..3 {
            out[self.perm[a] as usize] = i32::from(self.flip[a]);
        }
        out
    }
}

impl Orientation for AxisTransform {
    #[inline]
    fn compose(a: Self, b: Self) -> Self {
        let mut perm = [0u8; 3];
        let mut flip = [false; 3];
        for i in 0..3 {
            let mid = b.perm[i] as usize;
            perm[i] = a.perm[mid];
            flip[i] = a.flip[mid] ^ b.flip[i];
        }
        Self { perm, flip }
    }

    #[inline]
    fn inverse(a: Self) -> Self {
        let mut perm = [0u8; 3];
        let mut flip = [false; 3];
        for i in 0..3 {
            let t = a.perm[i] as usize;
            perm[t] = i as u8;
            flip[t] = a.flip[i];
        }
        Self { perm, flip }
    }
}

/// `x ↦ orientation(x) + offset` on point indices.
///
/// Cells are addressed by their lower point, so along a reversed axis cell `c`
/// (spanning points `c` and `c+1`) lands on cell `offset - c - 1`.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub struct IndexTransform {
    pub orientation: AxisTransform,
    pub offset: [i32; 3],
}

impl IndexTransform {
    pub const IDENTITY: Self = Self {
        orientation: AxisTransform::IDENTITY,
        offset: [0; 3],
    };

    pub fn new(orientation: AxisTransform, offset: [i32; 3]) -> Self {
        Self {
            orientation,
            offset,
        }
    }

    pub fn translation(offset: [i32; 3]) -> Self {
        Self {
            orientation: AxisTransform::IDENTITY,
            offset,
        }
    }

    #[inline]
    pub fn apply_point(&self, p: [i32; 3]) -> [i32; 3] {
        let r = self.orientation.apply(p);
        std::array::from_fn(|a| r[a] + self.offset[a])
    }

    #[inline]
    pub fn apply_cell(&self, c: [i32; 3], flat: [bool; 3]) -> [i32; 3] {
        let r = self.apply_point(c);
        let rev = self.orientation.reversed_targets();
        // flat axes have no upper point, so a reversed cell stays put
        let flat_t = self.orientation.permute(flat);
        std::array::from_fn(|a| if flat_t[a] { r[a] } else { r[a] - rev[a] })
    }

    #[inline]
    pub fn apply(&self, idx: [i32; 3], centering: Centering, flat: [bool; 3]) -> [i32; 3] {
        match centering {
            Centering::Point => self.apply_point(idx),
            Centering::Cell => self.apply_cell(idx, flat),
        }
    }

    /// Image of a box (point or cell), reordered so that `lo <= hi`.
    pub fn apply_box(
        &self,
        b: &IndexExtents,
        centering: Centering,
        flat: [bool; 3],
    ) -> IndexExtents {
        let x = self.apply(b.lo, centering, flat);
        let y = self.apply(b.hi, centering, flat);
        IndexExtents {
            lo: std::array::from_fn(|a| x[a].min(y[a])),
            hi: std::array::from_fn(|a| x[a].max(y[a])),
        }
    }

    /// `a ∘ b`.
    pub fn compose(a: &Self, b: &Self) -> Self {
        let rotated = a.orientation.apply(b.offset);
        Self {
            orientation: AxisTransform::compose(a.orientation, b.orientation),
            offset: std::array::from_fn(|i| rotated[i] + a.offset[i]),
        }
    }

    pub fn inverse(&self) -> Self {
        let inv = AxisTransform::inverse(self.orientation);
        let back = inv.apply(self.offset);
        Self {
            orientation: inv,
            offset: back.map(|v| -v),
        }
    }
}
