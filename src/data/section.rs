//! Section: dense field storage over a logically rectangular domain.
//!
//! A `Section<T>` holds `components` values per point (or zone) of a
//! `dims[0] × dims[1] × dims[2]` block, axis 0 fastest. Component values of
//! one entry are contiguous, so `restrict(i)` is a `components`-long slice.

use crate::data::element::FieldElement;
use crate::mesh_error::MeshHaloError;
use crate::topology::extents::flat_offset;

/// Read/write access to a structured field buffer.
///
/// This is the only view the exchanger needs of mesh storage: dimensions,
/// component count and typed get/set at a flat index.
pub trait FieldAccess<T> {
    /// Entries per axis in the domain's local frame.
    fn dims(&self) -> [usize; 3];
    /// Values per entry (1 for scalars, 3 for vectors).
    fn components(&self) -> usize;
    /// Component `c` of the entry at flat index `i`.
    fn get(&self, i: usize, c: usize) -> Result<T, MeshHaloError>;
    /// Overwrite component `c` of the entry at flat index `i`.
    fn set(&mut self, i: usize, c: usize, v: T) -> Result<(), MeshHaloError>;
}

/// Storage for structured per-entry field data.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Section<T> {
    dims: [usize; 3],
    components: usize,
    data: Vec<T>,
}

impl<T: FieldElement> Section<T> {
    /// Zero-initialized section.
    pub fn new(dims: [usize; 3], components: usize) -> Self {
        Self::filled(dims, components, T::default())
    }

    /// Section with every value set to `v`.
    pub fn filled(dims: [usize; 3], components: usize, v: T) -> Self {
        let n = dims.iter().product::<usize>() * components;
        Section {
            dims,
            components,
            data: vec![v; n],
        }
    }

    /// Wrap an existing buffer.
    ///
    /// # Errors
    /// `SliceOutOfRange` when `data` does not hold exactly
    /// `dims.product() * components` values.
    pub fn from_vec(
        dims: [usize; 3],
        components: usize,
        data: Vec<T>,
    ) -> Result<Self, MeshHaloError> {
        let n = dims.iter().product::<usize>() * components;
        if data.len() != n {
            return Err(MeshHaloError::SliceOutOfRange {
                index: data.len(),
                len: n,
            });
        }
        Ok(Section {
            dims,
            components,
            data,
        })
    }

    /// Build from a per-entry closure over local indices.
    pub fn from_fn(
        dims: [usize; 3],
        components: usize,
        mut f: impl FnMut([usize; 3], usize) -> T,
    ) -> Self {
        let mut data = Vec::with_capacity(dims.iter().product::<usize>() * components);
        for k in 0..dims[2] {
            for j in 0..dims[1] {
                for i in 0..dims[0] {
                    for c in 0..components {
                        data.push(f([i, j, k], c));
                    }
                }
            }
        }
        Section {
            dims,
            components,
            data,
        }
    }

    /// Number of entries (not values).
    pub fn len(&self) -> usize {
        self.dims.iter().product()
    }

    /// True if the section holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flat entry index of a local index.
    pub fn offset(&self, idx: [usize; 3]) -> usize {
        flat_offset(self.dims, idx)
    }

    /// Read-only view of entry `i`.
    ///
    /// # Errors
    /// `SliceOutOfRange` if `i >= len()`.
    #[inline]
    pub fn try_restrict(&self, i: usize) -> Result<&[T], MeshHaloError> {
        let w = self.components;
        self.data
            .get(i * w..(i + 1) * w)
            .ok_or(MeshHaloError::SliceOutOfRange {
                index: i,
                len: self.len(),
            })
    }

    /// Mutable view of entry `i`.
    #[inline]
    pub fn try_restrict_mut(&mut self, i: usize) -> Result<&mut [T], MeshHaloError> {
        let w = self.components;
        let len = self.len();
        self.data
            .get_mut(i * w..(i + 1) * w)
            .ok_or(MeshHaloError::SliceOutOfRange { index: i, len })
    }

    /// Entry at a local index.
    pub fn at(&self, idx: [usize; 3]) -> Result<&[T], MeshHaloError> {
        self.try_restrict(self.offset(idx))
    }

    /// All values, entry-major.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Consume and return the raw buffer.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Iterate entries in flat order.
    pub fn iter(&self) -> impl Iterator<Item = &[T]> {
        self.data.chunks_exact(self.components.max(1))
    }
}

impl<T: FieldElement> FieldAccess<T> for Section<T> {
    fn dims(&self) -> [usize; 3] {
        self.dims
    }

    fn components(&self) -> usize {
        self.components
    }

    fn get(&self, i: usize, c: usize) -> Result<T, MeshHaloError> {
        let entry = self.try_restrict(i)?;
        entry
            .get(c)
            .copied()
            .ok_or(MeshHaloError::SliceOutOfRange {
                index: c,
                len: self.components,
            })
    }

    fn set(&mut self, i: usize, c: usize, v: T) -> Result<(), MeshHaloError> {
        let w = self.components;
        let slot = self
            .try_restrict_mut(i)?
            .get_mut(c)
            .ok_or(MeshHaloError::SliceOutOfRange { index: c, len: w })?;
        *slot = v;
        Ok(())
    }
}
