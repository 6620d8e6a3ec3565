//! Mesh coordinates in the two structured flavours.

use crate::data::element::FieldElement;
use crate::data::section::{FieldAccess, Section};
use crate::mesh_error::MeshHaloError;

/// Node coordinates of one structured domain, in its local frame.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum MeshCoords<T> {
    /// One coordinate array per local axis.
    Rectilinear {
        /// Coordinates along local axis 0.
        x: Vec<T>,
        /// Coordinates along local axis 1.
        y: Vec<T>,
        /// Coordinates along local axis 2.
        z: Vec<T>,
    },
    /// A full `(x, y, z)` triple per node.
    Curvilinear(Section<T>),
}

impl<T: FieldElement> MeshCoords<T> {
    /// Node counts per local axis.
    pub fn dims(&self) -> [usize; 3] {
        match self {
            MeshCoords::Rectilinear { x, y, z } => [x.len(), y.len(), z.len()],
            MeshCoords::Curvilinear(s) => s.dims(),
        }
    }

    /// Expand to a point field with three components per node.
    ///
    /// Rectilinear axes are broadcast so that both flavours travel through
    /// the same exchange path.
    pub fn to_points(&self) -> Section<T> {
        match self {
            MeshCoords::Curvilinear(s) => s.clone(),
            MeshCoords::Rectilinear { x, y, z } => {
                let axes = [x, y, z];
                Section::from_fn(self.dims(), 3, |idx, c| axes[c][idx[c]])
            }
        }
    }

    /// Rebuild coordinates of the same flavour from an exchanged point field.
    ///
    /// For rectilinear meshes each axis value is taken from the first node
    /// along that axis that carries a real coordinate, so sentinel-filled
    /// corner ghosts do not poison an axis.
    pub fn from_points(like: &Self, points: Section<T>) -> Result<Self, MeshHaloError> {
        match like {
            MeshCoords::Curvilinear(_) => Ok(MeshCoords::Curvilinear(points)),
            MeshCoords::Rectilinear { .. } => {
                let dims = points.dims();
                let mut axes: [Vec<T>; 3] = std::array::from_fn(|a| vec![T::nonexistent(); dims[a]]);
                for k in 0..dims[2] {
                    for j in 0..dims[1] {
                        for i in 0..dims[0] {
                            let idx = [i, j, k];
                            let entry = points.at(idx)?;
                            for (a, axis) in axes.iter_mut().enumerate() {
                                let v = entry[a];
                                if axis[idx[a]].is_nonexistent() && !v.is_nonexistent() {
                                    axis[idx[a]] = v;
                                }
                            }
                        }
                    }
                }
                let [x, y, z] = axes;
                Ok(MeshCoords::Rectilinear { x, y, z })
            }
        }
    }
}
