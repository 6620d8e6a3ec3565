//! `DomainId` and `Domain`: one logically rectangular subgrid of a decomposed mesh.
//!
//! A domain is declared by its point extents in the global index space of its
//! refinement level. Its *local* index space starts at zero and may be
//! permuted or reversed with respect to the global one; the mapping is held in
//! the domain's frame.

use crate::topology::extents::{Centering, IndexExtents};
use crate::topology::orientation::{AxisTransform, IndexTransform};
use std::fmt;

/// Strong handle for a domain; ids are dense in `0..num_domains`.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct DomainId(usize);

impl DomainId {
    #[inline]
    pub const fn new(raw: usize) -> Self {
        DomainId(raw)
    }

    #[inline]
    pub const fn get(self) -> usize {
        self.0
    }
}

impl fmt::Debug for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DomainId").field(&self.0).finish()
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for DomainId {
    fn from(v: usize) -> Self {
        DomainId(v)
    }
}

/// A declared domain.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Domain {
    pub id: DomainId,
    /// Point extents in the global index space of `level`.
    pub extents: IndexExtents,
    pub level: u32,
    /// Worker that holds this domain's field data.
    pub owner: usize,
    /// Local axis `a` runs along global axis `frame.perm[a]`, reversed if flipped.
    pub frame: AxisTransform,
}

impl Domain {
    pub fn new(id: DomainId, extents: IndexExtents) -> Self {
        Self {
            id,
            extents,
            level: 0,
            owner: 0,
            frame: AxisTransform::IDENTITY,
        }
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    pub fn with_frame(mut self, frame: AxisTransform) -> Self {
        self.frame = frame;
        self
    }

    #[inline]
    pub fn point_extents(&self) -> IndexExtents {
        self.extents
    }

    #[inline]
    pub fn cell_extents(&self) -> IndexExtents {
        self.extents.cells_from_points()
    }

    pub fn real_extents(&self, centering: Centering) -> IndexExtents {
        match centering {
            Centering::Point => self.point_extents(),
            Centering::Cell => self.cell_extents(),
        }
    }

    /// Flat axes in the global frame.
    pub fn flat(&self) -> [bool; 3] {
        std::array::from_fn(|a| self.extents.is_flat(a))
    }

    /// Flat axes in the local frame.
    pub fn local_flat(&self) -> [bool; 3] {
        let g = self.flat();
        std::array::from_fn(|a| g[self.frame.perm[a] as usize])
    }

    /// Local → global transform (the same for points and cells).
    pub fn frame_transform(&self) -> IndexTransform {
        let offset_src: [i32; 3] = std::array::from_fn(|a| {
            let g = self.frame.perm[a] as usize;
            if self.frame.flip[a] {
                self.extents.hi[g]
            } else {
                self.extents.lo[g]
            }
        });
        IndexTransform::new(self.frame, self.frame.permute(offset_src))
    }

    /// Real dims in the local frame.
    pub fn local_dims(&self, centering: Centering) -> [usize; 3] {
        let g = self.real_extents(centering).dims();
        std::array::from_fn(|a| g[self.frame.perm[a] as usize])
    }

    pub fn to_global(&self, local: [i32; 3], centering: Centering) -> [i32; 3] {
        self.frame_transform().apply(local, centering, self.local_flat())
    }

    pub fn to_local(&self, global: [i32; 3], centering: Centering) -> [i32; 3] {
        self.frame_transform()
            .inverse()
            .apply(global, centering, self.flat())
    }
}
