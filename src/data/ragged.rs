//! Variable-length per-zone records: material fractions and mixed-material
//! variables.
//!
//! Storage is compressed-row: `offsets[i]..offsets[i + 1]` delimits the
//! chain of zone `i` in `values`. Chain order is significant and preserved by
//! every operation here.

use crate::mesh_error::MeshHaloError;
use bytemuck::{Pod, Zeroable};

/// One entry of a zone's material chain.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable, serde::Serialize, serde::Deserialize)]
pub struct MaterialFraction {
    /// Material number.
    pub material: i32,
    /// Explicit padding so the record has no uninitialized bytes.
    pub _pad: u32,
    /// Volume fraction of the zone occupied by `material`.
    pub fraction: f64,
}

static_assertions::const_assert_eq!(std::mem::size_of::<MaterialFraction>(), 16);

impl MaterialFraction {
    /// New fraction record.
    pub fn new(material: i32, fraction: f64) -> Self {
        Self {
            material,
            _pad: 0,
            fraction,
        }
    }
}

/// Ragged per-zone storage.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RaggedSection<R> {
    dims: [usize; 3],
    offsets: Vec<usize>,
    values: Vec<R>,
}

impl<R: Pod> RaggedSection<R> {
    /// Every zone with an empty chain.
    pub fn empty(dims: [usize; 3]) -> Self {
        let n: usize = dims.iter().product();
        Self {
            dims,
            offsets: vec![0; n + 1],
            values: Vec::new(),
        }
    }

    /// Build from one chain per zone, in flat zone order.
    ///
    /// # Errors
    /// `SliceOutOfRange` if the number of chains differs from the zone count.
    pub fn from_chains<I, C>(dims: [usize; 3], chains: I) -> Result<Self, MeshHaloError>
    where
        I: IntoIterator<Item = C>,
        C: AsRef<[R]>,
    {
        let n: usize = dims.iter().product();
        let mut offsets = Vec::with_capacity(n + 1);
        let mut values = Vec::new();
        offsets.push(0);
        for chain in chains {
            values.extend_from_slice(chain.as_ref());
            offsets.push(values.len());
        }
        if offsets.len() != n + 1 {
            return Err(MeshHaloError::SliceOutOfRange {
                index: offsets.len() - 1,
                len: n,
            });
        }
        Ok(Self {
            dims,
            offsets,
            values,
        })
    }

    /// Zones per axis.
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Number of zones.
    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    /// True if there are no zones.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of records over all chains.
    pub fn total(&self) -> usize {
        self.values.len()
    }

    /// Chain of zone `i`.
    ///
    /// # Errors
    /// `SliceOutOfRange` if `i >= len()`.
    pub fn chain(&self, i: usize) -> Result<&[R], MeshHaloError> {
        match (self.offsets.get(i), self.offsets.get(i + 1)) {
            (Some(&a), Some(&b)) => Ok(&self.values[a..b]),
            _ => Err(MeshHaloError::SliceOutOfRange {
                index: i,
                len: self.len(),
            }),
        }
    }

    /// Iterate chains in flat zone order.
    pub fn chains(&self) -> impl Iterator<Item = &[R]> {
        self.offsets
            .windows(2)
            .map(move |w| &self.values[w[0]..w[1]])
    }
}
