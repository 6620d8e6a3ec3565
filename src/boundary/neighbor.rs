//! `NeighborLink`: the directed fact "domain A touches domain B".
//!
//! Every geometric quantity on a link is expressed in A's *global* index
//! space at A's own refinement level, so a link can be consumed without
//! looking at the partner's level. The partner side is reached through
//! `transform` (A-global to B-global at A's resolution) followed by the
//! per-axis `ratio`.

use crate::config::BoundaryConfig;
use crate::geometry::adjacency::{Adjacency, Contact, masked_ratio};
use crate::mesh_error::MeshHaloError;
use crate::topology::domain::{Domain, DomainId};
use crate::topology::extents::{Centering, Face, IndexExtents};
use crate::topology::orientation::{AxisTransform, IndexTransform, Orientation};
use crate::topology::refinement::{RefinementLevels, RefinementRelationship};

/// Direction in which ghost data flows across a link.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum NeighborRelationship {
    /// Both sides fill ghosts from each other.
    Symmetric,
    /// A donates to B only (A is the coarse parent of a nested patch).
    Donor,
    /// A receives from B only.
    Recipient,
}

impl NeighborRelationship {
    pub fn reverse(self) -> Self {
        match self {
            Self::Symmetric => Self::Symmetric,
            Self::Donor => Self::Recipient,
            Self::Recipient => Self::Donor,
        }
    }

    /// Whether the owning domain takes ghost data across this link.
    #[inline]
    pub fn receives(self) -> bool {
        !matches!(self, Self::Donor)
    }
}

/// Caller-declared neighbor for [`BoundaryRegistry::add_neighbor`](super::BoundaryRegistry::add_neighbor).
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NeighborSpec {
    pub partner: DomainId,
    pub match_index: u32,
    /// A-global to B-global at A's resolution.
    pub transform: IndexTransform,
    /// Shared point region in A's global index space.
    pub overlap_points: IndexExtents,
    /// A relative to B.
    pub refinement: RefinementRelationship,
    /// Per-axis ratio between the two levels, in A's axes.
    pub ratio: [i32; 3],
    pub relationship: NeighborRelationship,
}

impl NeighborSpec {
    /// Same-level symmetric neighbor in a shared global frame.
    pub fn same_level(partner: DomainId, overlap_points: IndexExtents) -> Self {
        Self {
            partner,
            match_index: 0,
            transform: IndexTransform::IDENTITY,
            overlap_points,
            refinement: RefinementRelationship::SameLevel,
            ratio: [1; 3],
            relationship: NeighborRelationship::Symmetric,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NeighborLink {
    pub partner: DomainId,
    /// Ordinal of this touch among all touches of the pair; shared by both directions.
    pub match_index: u32,
    pub contact: Contact,
    /// A-local axes onto B-local axes.
    pub orientation: AxisTransform,
    /// A-global onto B-global, at A's resolution.
    pub transform: IndexTransform,
    /// Shape of `overlap_cells` in A's local axes.
    pub local_dims: [usize; 3],
    pub overlap_points: IndexExtents,
    /// Partner cells within ghost reach of A (or, for a coarse donor, the
    /// cells the finer partner covers). `None` when the reach is empty.
    pub overlap_cells: Option<IndexExtents>,
    /// Partner's real points in A's index space.
    pub partner_points: IndexExtents,
    /// Partner's real cells in A's index space.
    pub partner_cells: IndexExtents,
    /// Partner's declared point extents when this link was built.
    pub partner_extents: IndexExtents,
    pub partner_level: u32,
    pub refinement: RefinementRelationship,
    /// Per-axis ratio between the levels (flat axes are 1), in A's axes.
    pub ratio: [i32; 3],
    pub relationship: NeighborRelationship,
    /// The shared face leaves part of the face of A or of B uncovered.
    pub t_intersection: bool,
}

impl NeighborLink {
    /// Build the link `a -> b` from a declared spec.
    pub fn build(
        a: &Domain,
        b: &Domain,
        spec: NeighborSpec,
        config: &BoundaryConfig,
    ) -> Result<Self, MeshHaloError> {
        let a_flat = a.flat();
        let b_flat = b.flat();
        let ratio = masked_ratio(spec.ratio, a_flat);
        if ratio.iter().any(|&r| r < 1) {
            return Err(MeshHaloError::InvalidRefinementRatio {
                level: a.level as usize,
                ratio: spec.ratio,
            });
        }
        let ratio_b = spec.transform.orientation.permute(ratio);

        let (points_b, cells_b) = match spec.refinement {
            RefinementRelationship::SameLevel => (b.point_extents(), b.cell_extents()),
            RefinementRelationship::Finer => (
                b.extents.refine_points(ratio_b),
                b.cell_extents().refine_cells(ratio_b, b_flat),
            ),
            RefinementRelationship::Coarser => (
                b.extents
                    .coarsen_points_exact(ratio_b)
                    .ok_or(MeshHaloError::MisalignedPatch {
                        domain: b.id,
                        level: b.level,
                        extents: b.extents,
                        ratio: ratio_b,
                    })?,
                b.cell_extents().coarsen_cells(ratio_b, b_flat),
            ),
        };
        let back = spec.transform.inverse();
        let partner_points = back.apply_box(&points_b, Centering::Point, b_flat);
        let partner_cells = back.apply_box(&cells_b, Centering::Cell, b_flat);

        let overlap = spec.overlap_points;
        let degenerate: Vec<usize> = (0..3)
            .filter(|&ax| !a_flat[ax] && overlap.is_flat(ax))
            .collect();
        let contact = match degenerate.as_slice() {
            [] => Contact::Nested,
            [axis] => Contact::Face(Face::new(*axis, overlap.lo[*axis] == a.extents.hi[*axis])),
            [_, _] => Contact::Edge,
            _ => Contact::Vertex,
        };

        let layers = config.ghost_layers as i32;
        let depth: [i32; 3] = std::array::from_fn(|ax| {
            if a_flat[ax] {
                0
            } else if spec.refinement == RefinementRelationship::Finer {
                layers * ratio[ax]
            } else {
                layers
            }
        });
        let real = a.cell_extents();
        let overlap_cells = match (contact, spec.refinement) {
            (Contact::Nested, RefinementRelationship::Coarser) => partner_cells.intersect(&real),
            _ => real.expand(depth, depth).intersect(&partner_cells),
        };

        let t_intersection = match contact {
            Contact::Face(face) => {
                let normal = face.axis();
                let covers = |full: &IndexExtents| {
                    (0..3)
                        .filter(|&t| t != normal && !a_flat[t])
                        .all(|t| overlap.lo[t] == full.lo[t] && overlap.hi[t] == full.hi[t])
                };
                !(covers(&a.extents) && covers(&partner_points))
            }
            _ => false,
        };

        let local_dims = a
            .frame
            .gather(overlap_cells.map_or([0; 3], |c| c.dims()));
        let orientation = AxisTransform::compose(
            AxisTransform::inverse(b.frame),
            AxisTransform::compose(spec.transform.orientation, a.frame),
        );

        Ok(Self {
            partner: spec.partner,
            match_index: spec.match_index,
            contact,
            orientation,
            transform: spec.transform,
            local_dims,
            overlap_points: overlap,
            overlap_cells,
            partner_points,
            partner_cells,
            partner_extents: b.extents,
            partner_level: b.level,
            refinement: spec.refinement,
            ratio,
            relationship: spec.relationship,
            t_intersection,
        })
    }

    /// Map a global index of the owning domain onto the partner's global
    /// index space at the partner's level.
    ///
    /// Points must land exactly on partner points. A coarse cell maps to the
    /// lowest fine cell it covers; a fine cell maps to the coarse cell that
    /// contains it.
    pub fn translate(
        &self,
        owner: DomainId,
        global: [i32; 3],
        centering: Centering,
        flat: [bool; 3],
    ) -> Result<[i32; 3], MeshHaloError> {
        let r = self.transform.orientation.permute(self.ratio);
        let t = self.transform.apply(global, centering, flat);
        match (self.refinement, centering) {
            (RefinementRelationship::SameLevel, _) => Ok(t),
            (RefinementRelationship::Coarser, _) => Ok(std::array::from_fn(|ax| t[ax] * r[ax])),
            (RefinementRelationship::Finer, Centering::Cell) => {
                Ok(std::array::from_fn(|ax| t[ax].div_euclid(r[ax])))
            }
            (RefinementRelationship::Finer, Centering::Point) => {
                if (0..3).any(|ax| t[ax].rem_euclid(r[ax]) != 0) {
                    return Err(MeshHaloError::NonIntegerTranslation {
                        domain: owner,
                        partner: self.partner,
                        index: global,
                        ratio: self.ratio,
                    });
                }
                Ok(std::array::from_fn(|ax| t[ax] / r[ax]))
            }
        }
    }

    /// Whether this link may fill ghosts of the owning domain.
    pub fn donates_to_owner(&self, config: &BoundaryConfig) -> bool {
        self.relationship.receives()
            && !(self.t_intersection && !config.create_ghosts_for_t_intersections)
    }
}

fn negate(v: [i32; 3]) -> [i32; 3] {
    v.map(|x| -x)
}

/// Both directions of one touch found by adjacency discovery.
pub(crate) fn link_pair(
    a: &Domain,
    b: &Domain,
    adj: &Adjacency,
    match_index: u32,
    levels: &RefinementLevels,
    config: &BoundaryConfig,
) -> Result<(NeighborLink, NeighborLink), MeshHaloError> {
    let common = adj.common_level;
    let ra = levels.cumulative(a.level, common)?;
    let rb = levels.cumulative(b.level, common)?;
    // periodic shifts are whole multiples of the level-0 period, so this divides exactly
    let shift_a: [i32; 3] = std::array::from_fn(|ax| adj.shift[ax] / ra[ax]);
    let shift_b: [i32; 3] = std::array::from_fn(|ax| adj.shift[ax] / rb[ax]);

    let misaligned = |d: &Domain, ratio: [i32; 3]| MeshHaloError::MisalignedPatch {
        domain: d.id,
        level: d.level,
        extents: d.extents,
        ratio,
    };
    let ma = masked_ratio(ra, a.flat());
    let mb = masked_ratio(rb, b.flat());
    let overlap_a = adj
        .overlap
        .coarsen_points_exact(ma)
        .ok_or_else(|| misaligned(b, ma))?;
    let overlap_b = adj
        .overlap
        .translate(negate(adj.shift))
        .coarsen_points_exact(mb)
        .ok_or_else(|| misaligned(a, mb))?;

    let ratio = levels.between(a.level, b.level)?;
    let rel_a = match adj.contact_a {
        Contact::Nested if a.level < b.level => NeighborRelationship::Donor,
        Contact::Nested => NeighborRelationship::Recipient,
        _ => NeighborRelationship::Symmetric,
    };

    let forward = NeighborSpec {
        partner: b.id,
        match_index,
        transform: IndexTransform::translation(negate(shift_a)),
        overlap_points: overlap_a,
        refinement: RefinementRelationship::between(a.level, b.level),
        ratio,
        relationship: rel_a,
    };
    let backward = NeighborSpec {
        partner: a.id,
        match_index,
        transform: IndexTransform::translation(shift_b),
        overlap_points: overlap_b,
        refinement: RefinementRelationship::between(b.level, a.level),
        ratio,
        relationship: rel_a.reverse(),
    };
    Ok((
        NeighborLink::build(a, b, forward, config)?,
        NeighborLink::build(b, a, backward, config)?,
    ))
}
