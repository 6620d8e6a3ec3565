//! Adjacency between two structured domains.
//!
//! Both domains' point boxes are lifted to the finer of their two levels and
//! intersected. A zero-width intersection on exactly one (non-flat) axis is a
//! shared face, on two axes an edge, on three a vertex. A positive-volume
//! intersection is AMR nesting when the levels differ and a corrupt
//! decomposition otherwise.

use crate::config::BoundaryConfig;
use crate::mesh_error::MeshHaloError;
use crate::topology::domain::Domain;
use crate::topology::extents::{Face, IndexExtents};
use crate::topology::refinement::RefinementLevels;
use itertools::iproduct;

/// How two domains touch, seen from one of them.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Contact {
    /// Shared face (codimension 1); the face is on *this* domain.
    Face(Face),
    /// Shared edge strip (codimension 2).
    Edge,
    /// Shared corner point (codimension 3).
    Vertex,
    /// Positive-volume overlap between different refinement levels.
    Nested,
}

impl Contact {
    pub fn is_face(&self) -> bool {
        matches!(self, Contact::Face(_))
    }

    /// Number of degenerate axes of the contact region; 0 for nesting.
    pub fn codimension(&self) -> usize {
        match self {
            Contact::Face(_) => 1,
            Contact::Edge => 2,
            Contact::Vertex => 3,
            Contact::Nested => 0,
        }
    }
}

/// One touch between domains `a` and `b`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Adjacency {
    /// Level at which `overlap` and `shift` are expressed (finer of the two).
    pub common_level: u32,
    /// Contact seen from `a`.
    pub contact_a: Contact,
    /// Contact seen from `b`.
    pub contact_b: Contact,
    /// Shared point region at `common_level`, in `a`'s global frame.
    pub overlap: IndexExtents,
    /// Translation applied to `b` at `common_level` (periodic image).
    pub shift: [i32; 3],
}

/// Ratio with flat axes forced to 1.
pub fn masked_ratio(ratio: [i32; 3], flat: [bool; 3]) -> [i32; 3] {
    std::array::from_fn(|a| if flat[a] { 1 } else { ratio[a] })
}

/// Decide whether `a` and the image of `b` shifted by `shift` touch.
pub fn compute_adjacency(
    a: &Domain,
    b: &Domain,
    levels: &RefinementLevels,
    shift: [i32; 3],
    config: &BoundaryConfig,
) -> Result<Option<Adjacency>, MeshHaloError> {
    let common = a.level.max(b.level);
    let ra = masked_ratio(levels.cumulative(a.level, common)?, a.flat());
    let rb = masked_ratio(levels.cumulative(b.level, common)?, b.flat());
    let pa = a.extents.refine_points(ra);
    let pb = b.extents.refine_points(rb).translate(shift);

    let Some(overlap) = pa.intersect(&pb) else {
        return Ok(None);
    };

    let mut degenerate = Vec::with_capacity(3);
    for axis in 0..3 {
        if pa.is_flat(axis) && pb.is_flat(axis) {
            continue;
        }
        if overlap.is_flat(axis) {
            degenerate.push(axis);
        }
    }

    let (contact_a, contact_b) = match degenerate.len() {
        0 if a.level != b.level => (Contact::Nested, Contact::Nested),
        0 => {
            if config.allow_duplicated_zones {
                log::debug!(
                    "domains {} and {} share duplicated zones {overlap}; skipping",
                    a.id,
                    b.id
                );
                return Ok(None);
            }
            return Err(MeshHaloError::InterpenetratingDomains {
                a: a.id,
                b: b.id,
                overlap,
            });
        }
        1 => {
            let axis = degenerate[0];
            let upper = overlap.lo[axis] == pa.hi[axis] && pa.hi[axis] != pa.lo[axis];
            let face = Face::new(axis, upper);
            (Contact::Face(face), Contact::Face(face.opposite()))
        }
        2 => (Contact::Edge, Contact::Edge),
        _ => (Contact::Vertex, Contact::Vertex),
    };

    if !contact_a.is_face() && contact_a != Contact::Nested && !config.include_edge_and_corner_neighbors {
        return Ok(None);
    }

    if a.level != b.level {
        let (fine, ratio) = if a.level > b.level {
            (a, masked_ratio(levels.between(a.level, b.level)?, a.flat()))
        } else {
            (b, masked_ratio(levels.between(a.level, b.level)?, b.flat()))
        };
        if fine.extents.coarsen_points_exact(ratio).is_none() {
            return Err(MeshHaloError::MisalignedPatch {
                domain: fine.id,
                level: fine.level,
                extents: fine.extents,
                ratio,
            });
        }
    }

    Ok(Some(Adjacency {
        common_level: common,
        contact_a,
        contact_b,
        overlap,
        shift,
    }))
}

/// All touches between `a` and `b`, including periodic images.
///
/// For `a == b` only images shifted in the positive lexicographic direction
/// are reported, so each self-touch appears once.
pub fn compute_periodic_adjacencies(
    a: &Domain,
    b: &Domain,
    levels: &RefinementLevels,
    config: &BoundaryConfig,
) -> Result<Vec<Adjacency>, MeshHaloError> {
    let common = a.level.max(b.level);
    let scale = levels.scale(common)?;
    let steps: [Vec<i32>; 3] = std::array::from_fn(|axis| match config.periodic[axis] {
        Some(period) => vec![-period * scale[axis], 0, period * scale[axis]],
        None => vec![0],
    });

    let mut out = Vec::new();
    for (&sk, &sj, &si) in iproduct!(&steps[2], &steps[1], &steps[0]) {
        let shift = [si, sj, sk];
        if a.id == b.id && !is_positive(shift) {
            continue;
        }
        if let Some(adj) = compute_adjacency(a, b, levels, shift, config)? {
            out.push(adj);
        }
    }
    Ok(out)
}

fn is_positive(shift: [i32; 3]) -> bool {
    shift.iter().find(|&&s| s != 0).is_some_and(|&s| s > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::domain::DomainId;

    fn dom(id: usize, e: [i32; 6]) -> Domain {
        Domain::new(DomainId::new(id), IndexExtents::from_array(e))
    }

    #[test]
    fn shared_face_is_detected_on_both_sides() {
        let a = dom(0, [0, 5, 0, 4, 0, 4]);
        let b = dom(1, [5, 10, 0, 4, 0, 4]);
        let adj = compute_adjacency(&a, &b, &RefinementLevels::default(), [0; 3], &Default::default())
            .unwrap()
            .unwrap();
        assert_eq!(adj.contact_a, Contact::Face(Face::IMax));
        assert_eq!(adj.contact_b, Contact::Face(Face::IMin));
        assert_eq!(adj.overlap.to_array(), [5, 5, 0, 4, 0, 4]);
    }

    #[test]
    fn separated_domains_do_not_touch() {
        let a = dom(0, [0, 4, 0, 4, 0, 0]);
        let b = dom(1, [6, 9, 0, 4, 0, 0]);
        let got =
            compute_adjacency(&a, &b, &RefinementLevels::default(), [0; 3], &Default::default()).unwrap();
        assert!(got.is_none());
    }

    #[test]
    fn flat_axis_is_ignored_in_2d() {
        let a = dom(0, [0, 4, 0, 4, 0, 0]);
        let b = dom(1, [4, 8, 4, 8, 0, 0]);
        let adj = compute_adjacency(&a, &b, &RefinementLevels::default(), [0; 3], &Default::default())
            .unwrap()
            .unwrap();
        assert_eq!(adj.contact_a, Contact::Edge);
    }

    #[test]
    fn corner_contacts_can_be_suppressed() {
        let a = dom(0, [0, 4, 0, 4, 0, 4]);
        let b = dom(1, [4, 8, 4, 8, 4, 8]);
        let cfg = BoundaryConfig {
            include_edge_and_corner_neighbors: false,
            ..Default::default()
        };
        let lv = RefinementLevels::default();
        assert!(compute_adjacency(&a, &b, &lv, [0; 3], &cfg).unwrap().is_none());
        let adj = compute_adjacency(&a, &b, &lv, [0; 3], &Default::default()).unwrap().unwrap();
        assert_eq!(adj.contact_a, Contact::Vertex);
    }

    #[test]
    fn misaligned_fine_patch_is_rejected() {
        let lv = RefinementLevels::uniform(2, 2).unwrap();
        let coarse = dom(0, [0, 5, 0, 5, 0, 0]);
        let fine = dom(1, [10, 15, 0, 4, 0, 0]).with_level(1);
        let err = compute_adjacency(&coarse, &fine, &lv, [0; 3], &Default::default()).unwrap_err();
        assert!(matches!(err, MeshHaloError::MisalignedPatch { .. }));
    }

    #[test]
    fn self_periodic_touch_reported_once() {
        let a = dom(0, [0, 8, 0, 4, 0, 0]);
        let cfg = BoundaryConfig {
            periodic: [Some(8), None, None],
            ..Default::default()
        };
        let adjs = compute_periodic_adjacencies(&a, &a, &RefinementLevels::default(), &cfg).unwrap();
        assert_eq!(adjs.len(), 1);
        assert_eq!(adjs[0].shift, [8, 0, 0]);
        assert_eq!(adjs[0].contact_a, Contact::Face(Face::IMax));
    }
}
