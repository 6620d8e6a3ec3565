//! Ghost envelopes: how far a domain is expanded on each side.

use crate::topology::domain::{Domain, DomainId};
use crate::topology::extents::{Centering, Face, IndexExtents, flat_offset};

/// Ghost depth per side in the domain's global frame, at its own level.
///
/// Depths count layers, so the same envelope serves points and cells: the
/// expanded point box is one point wider than the expanded cell box.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GhostEnvelope {
    pub domain: DomainId,
    pub lower: [u32; 3],
    pub upper: [u32; 3],
    pub real_points: IndexExtents,
    pub real_cells: IndexExtents,
}

impl GhostEnvelope {
    pub fn empty(domain: &Domain) -> Self {
        Self {
            domain: domain.id,
            lower: [0; 3],
            upper: [0; 3],
            real_points: domain.point_extents(),
            real_cells: domain.cell_extents(),
        }
    }

    pub fn depth(&self, face: Face) -> u32 {
        if face.is_upper() {
            self.upper[face.axis()]
        } else {
            self.lower[face.axis()]
        }
    }

    pub(crate) fn widen(&mut self, face: Face, layers: i32) {
        let slot = if face.is_upper() {
            &mut self.upper[face.axis()]
        } else {
            &mut self.lower[face.axis()]
        };
        *slot = (*slot).max(layers.max(0) as u32);
    }

    pub fn has_ghosts(&self) -> bool {
        self.lower.iter().chain(&self.upper).any(|&d| d > 0)
    }

    pub fn real(&self, centering: Centering) -> IndexExtents {
        match centering {
            Centering::Point => self.real_points,
            Centering::Cell => self.real_cells,
        }
    }

    pub fn expanded(&self, centering: Centering) -> IndexExtents {
        let lo = self.lower.map(|d| d as i32);
        let hi = self.upper.map(|d| d as i32);
        self.real(centering).expand(lo, hi)
    }

    pub fn expanded_dims(&self, centering: Centering) -> [usize; 3] {
        self.expanded(centering).dims()
    }
}

/// A ghost envelope seen from the domain's local frame.
///
/// Real local indices run `0..real_dims`; ghost indices lie below zero or at
/// and above `real_dims`. Slots are numbered over the expanded box with axis 0
/// fastest.
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GhostLayout {
    pub centering: Centering,
    pub real_dims: [usize; 3],
    pub lower: [usize; 3],
    pub upper: [usize; 3],
}

impl GhostLayout {
    pub fn from_envelope(env: &GhostEnvelope, domain: &Domain, centering: Centering) -> Self {
        let frame = domain.frame;
        let lower = std::array::from_fn(|a| {
            let g = frame.perm[a] as usize;
            let d = if frame.flip[a] { env.upper[g] } else { env.lower[g] };
            d as usize
        });
        let upper = std::array::from_fn(|a| {
            let g = frame.perm[a] as usize;
            let d = if frame.flip[a] { env.lower[g] } else { env.upper[g] };
            d as usize
        });
        Self {
            centering,
            real_dims: domain.local_dims(centering),
            lower,
            upper,
        }
    }

    /// Layout without ghost layers.
    pub fn real_only(domain: &Domain, centering: Centering) -> Self {
        Self {
            centering,
            real_dims: domain.local_dims(centering),
            lower: [0; 3],
            upper: [0; 3],
        }
    }

    pub fn expanded_dims(&self) -> [usize; 3] {
        std::array::from_fn(|a| self.real_dims[a] + self.lower[a] + self.upper[a])
    }

    pub fn len(&self) -> usize {
        self.expanded_dims().iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_real(&self, local: [i32; 3]) -> bool {
        (0..3).all(|a| local[a] >= 0 && (local[a] as usize) < self.real_dims[a])
    }

    /// Slot of a local index, or `None` outside the expanded box.
    pub fn slot(&self, local: [i32; 3]) -> Option<usize> {
        let dims = self.expanded_dims();
        let mut shifted = [0usize; 3];
        for a in 0..3 {
            let s = local[a] + self.lower[a] as i32;
            if s < 0 || s as usize >= dims[a] {
                return None;
            }
            shifted[a] = s as usize;
        }
        Some(flat_offset(dims, shifted))
    }

    /// Local index of a slot.
    pub fn local_of(&self, slot: usize) -> [i32; 3] {
        let dims = self.expanded_dims();
        let i = slot % dims[0];
        let j = (slot / dims[0]) % dims[1];
        let k = slot / (dims[0] * dims[1]);
        [
            i as i32 - self.lower[0] as i32,
            j as i32 - self.lower[1] as i32,
            k as i32 - self.lower[2] as i32,
        ]
    }

    /// Offset of a real local index in the un-expanded field.
    pub fn real_offset(&self, local: [i32; 3]) -> Option<usize> {
        self.is_real(local)
            .then(|| flat_offset(self.real_dims, local.map(|v| v as usize)))
    }
}
