//! Memoized per-face lookup built by `finish`.
//!
//! AMR patches can carry dozens of neighbors on a single face. Face links are
//! bucketed by face and sorted by the lower corner of their overlap on the
//! face's first tangential axis, so the neighbor covering a face index is found
//! by a binary search followed by a short backward scan.

use crate::boundary::neighbor::NeighborLink;
use crate::geometry::adjacency::Contact;
use crate::topology::extents::Face;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FaceIndex {
    faces: [Vec<usize>; 6],
}

/// The two axes spanning `face`, in ascending order.
pub fn tangential_axes(face: Face) -> [usize; 2] {
    match face.axis() {
        0 => [1, 2],
        1 => [0, 2],
        _ => [0, 1],
    }
}

impl FaceIndex {
    pub fn build(links: &[NeighborLink]) -> Self {
        let mut faces: [Vec<usize>; 6] = Default::default();
        for (i, link) in links.iter().enumerate() {
            if let Contact::Face(face) = link.contact {
                faces[face.index()].push(i);
            }
        }
        for face in Face::ALL {
            let [t0, t1] = tangential_axes(face);
            faces[face.index()].sort_by_key(|&i| {
                let lo = links[i].overlap_points.lo;
                (lo[t0], lo[t1], i)
            });
        }
        Self { faces }
    }

    /// Link indices touching `face`, in sorted order.
    pub fn links_on(&self, face: Face) -> &[usize] {
        &self.faces[face.index()]
    }

    pub fn has_neighbor(&self, face: Face) -> bool {
        !self.faces[face.index()].is_empty()
    }

    /// Index of the face link whose overlap contains the global point `idx`.
    pub fn find(&self, links: &[NeighborLink], face: Face, idx: [i32; 3]) -> Option<usize> {
        let list = &self.faces[face.index()];
        let [t0, _] = tangential_axes(face);
        let end = list.partition_point(|&i| links[i].overlap_points.lo[t0] <= idx[t0]);
        list[..end]
            .iter()
            .rev()
            .copied()
            .find(|&i| links[i].overlap_points.contains(idx))
    }
}
