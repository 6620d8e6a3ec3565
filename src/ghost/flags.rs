//! Per-slot ghost classification.

use crate::ghost::envelope::GhostLayout;

/// Tag attached to every point or zone of a ghost-augmented domain.
///
/// Consumers skip anything but `Real` to avoid double-counting geometry at
/// domain seams.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[repr(u8)]
pub enum GhostKind {
    #[default]
    Real = 0,
    /// Synthesized slot whose value is copied from a neighbor.
    GhostFromNeighbor = 1,
    /// Real node also owned by another domain (or another image of this one).
    GhostDuplicateWithinDomain = 2,
    /// Real zone covered by a finer nested patch.
    GhostEnclosedByFinerPatch = 3,
}

impl GhostKind {
    #[inline]
    pub fn is_ghost(self) -> bool {
        self != GhostKind::Real
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// What kind of ghost data a caller is about to request.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum GhostDataType {
    /// Flag nodes shared with neighbors; no extra slots, no field data moves.
    DuplicateNodes,
    /// Extra point layers filled from neighbor nodes at any level.
    GhostNodes,
    /// Extra zone layers filled from neighbors at any level.
    GhostZones,
}

/// Flags for one domain, laid out over its ghost-augmented index space.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GhostFlags {
    pub layout: GhostLayout,
    pub flags: Vec<GhostKind>,
}

impl GhostFlags {
    /// Flag at a local index (real range `0..dims`, ghosts outside it).
    pub fn get(&self, local: [i32; 3]) -> Option<GhostKind> {
        self.layout.slot(local).map(|s| self.flags[s])
    }

    pub fn count(&self, kind: GhostKind) -> usize {
        self.flags.iter().filter(|&&k| k == kind).count()
    }

    /// Raw `u8` codes, for consumers that store flags as a byte array.
    pub fn to_codes(&self) -> Vec<u8> {
        self.flags.iter().map(|k| k.as_u8()).collect()
    }
}
